use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub iat: Option<u64>,
}

/// The identity the auth collaborator resolved for the current request.
/// The scheduling core trusts this value verbatim for ownership checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_doctor(&self) -> bool {
        self.role.as_deref() == Some("doctor")
    }

    pub fn is_patient(&self) -> bool {
        self.role.as_deref() == Some("patient")
    }
}
