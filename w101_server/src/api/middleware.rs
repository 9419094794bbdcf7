//! Authentication middleware for protected endpoints.
//!
//! Extracts the bearer token from the `Authorization` header, validates it,
//! and injects the authenticated user id into request extensions. Handlers
//! read it back with `Extension<UserId>`.
//!
//! ```rust,no_run
//! use axum::extract::Extension;
//! use w101::auth::UserId;
//!
//! async fn protected_handler(Extension(user_id): Extension<UserId>) -> String {
//!     format!("Authenticated as user {}", user_id)
//! }
//! # let _ = protected_handler;
//! ```

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use super::{AppState, error::ApiError};

/// Reject the request with 401 unless it carries a valid access token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let claims = state.auth.verify_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected bearer token");
        ApiError::Unauthorized
    })?;

    request.extensions_mut().insert(claims.sub);
    Ok(next.run(request).await)
}
