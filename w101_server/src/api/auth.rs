//! Registration and login.
//!
//! Both endpoints are public and answer with the same token payload:
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"username": "wizard", "email": "wizard@example.com", "password": "secret1"}'
//!
//! curl -X POST http://localhost:8080/api/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"login": "wizard", "password": "secret1"}'
//! ```

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use w101::auth::{AuthResponse, LoginRequest, RegisterRequest};

use super::{
    AppState,
    error::{ApiResult, ok},
};
use crate::{logging, metrics};

/// Create an account and return a token for it.
///
/// # Errors
///
/// - `400 Bad Request`: Username, email or password fails validation
/// - `409 Conflict`: Username or email already registered
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<AuthResponse> {
    let Json(request) = payload?;
    let response = state.auth.register(request).await?;
    Ok(ok(response))
}

/// Exchange a username (or email) and password for a token.
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown login or wrong password
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<AuthResponse> {
    let Json(request) = payload?;
    let login = request.login.clone();

    match state.auth.login(request).await {
        Ok(response) => {
            metrics::login_attempts_total(true);
            Ok(ok(response))
        }
        Err(err) => {
            metrics::login_attempts_total(false);
            if err.is_unauthorized() {
                logging::log_security_event(
                    "failed_login",
                    None,
                    &format!("Rejected login for '{login}'"),
                );
            }
            Err(err.into())
        }
    }
}
