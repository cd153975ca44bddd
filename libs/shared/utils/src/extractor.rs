use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::jwt::validate_token;

/// Authentication middleware: validates the bearer token and inserts the
/// resolved [`User`] into request extensions, so handlers receive the caller
/// identity as an explicit value rather than reading ambient session state.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    let token = &auth_value[7..];

    let user = validate_token(token, &config.jwt_secret).map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
