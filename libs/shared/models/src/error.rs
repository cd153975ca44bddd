use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Slot full: {0}")]
    SlotFull(String),

    #[error("Already booked: {0}")]
    AlreadyBooked(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    /// Stable machine-readable kind, so callers can distinguish
    /// every expected error condition without parsing messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "auth",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "invalid_argument",
            AppError::Conflict(_) => "conflict",
            AppError::SlotFull(_) => "slot_full",
            AppError::AlreadyBooked(_) => "already_booked",
            AppError::InvalidState(_) => "invalid_state",
            AppError::Unavailable(_) => "unavailable",
            AppError::Internal(_) => "internal",
            AppError::Database(_) => "database",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::SlotFull(msg) => (StatusCode::CONFLICT, msg),
            AppError::AlreadyBooked(msg) => (StatusCode::CONFLICT, msg),
            AppError::InvalidState(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        tracing::error!("Error: {}: {}", status, message);

        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
