use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub postgrest_url: String,
    pub postgrest_api_key: String,
    pub jwt_secret: String,
    pub bind_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            postgrest_url: env::var("POSTGREST_URL")
                .unwrap_or_else(|_| {
                    warn!("POSTGREST_URL not set, falling back to in-memory store");
                    String::new()
                }),
            postgrest_api_key: env::var("POSTGREST_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("POSTGREST_API_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            bind_port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }

    pub fn is_postgrest_configured(&self) -> bool {
        !self.postgrest_url.is_empty() && !self.postgrest_api_key.is_empty()
    }
}
