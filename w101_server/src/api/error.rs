//! Response envelope and error-to-status mapping.
//!
//! Every handler answers with
//! `{"success": true, "data": ...}` or
//! `{"success": false, "error": {"kind": ..., "message": ...}}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use w101::{ErrorKind, GameError, auth::AuthError};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

/// Wrap `data` in a success envelope with status 200
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Missing or rejected bearer token
    #[error("Authentication required")]
    Unauthorized,

    /// Request body or query string could not be decoded
    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Game(err) => kind_status(err.kind()),
            ApiError::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::JwtError(_) => StatusCode::UNAUTHORIZED,
                AuthError::UsernameTaken | AuthError::EmailTaken => StatusCode::CONFLICT,
                AuthError::InvalidUsername(_)
                | AuthError::WeakPassword(_)
                | AuthError::InvalidEmail => StatusCode::BAD_REQUEST,
                AuthError::Database(_) | AuthError::HashingFailed => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Machine-readable code; game errors reuse the library taxonomy
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Game(err) => err.kind().code(),
            ApiError::Auth(_) => match self.status() {
                StatusCode::UNAUTHORIZED => "unauthorized",
                StatusCode::CONFLICT => ErrorKind::Conflict.code(),
                StatusCode::BAD_REQUEST => ErrorKind::InvalidInput.code(),
                _ => ErrorKind::StoreError.code(),
            },
            ApiError::Unauthorized => "unauthorized",
            ApiError::BadRequest(_) => ErrorKind::InvalidInput.code(),
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Game(err) => err.client_message(),
            ApiError::Auth(err) => err.client_message(),
            other => other.to_string(),
        }
    }
}

fn kind_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput | ErrorKind::InvalidState | ErrorKind::InsufficientFunds => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::StoreError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                kind: self.code(),
                message: self.client_message(),
            },
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_error_statuses() {
        let cases = [
            (GameError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (GameError::InvalidState("x".into()), StatusCode::BAD_REQUEST),
            (
                GameError::InsufficientFunds { available: 1, required: 5 },
                StatusCode::BAD_REQUEST,
            ),
            (GameError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (GameError::TableNotFound(1), StatusCode::NOT_FOUND),
            (GameError::TableFull, StatusCode::CONFLICT),
            (
                GameError::Database(sqlx::Error::RowNotFound),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_auth_error_statuses() {
        let invalid = ApiError::from(AuthError::InvalidCredentials);
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(invalid.code(), "unauthorized");

        let taken = ApiError::from(AuthError::UsernameTaken);
        assert_eq!(taken.status(), StatusCode::CONFLICT);
        assert_eq!(taken.code(), "conflict");

        let weak = ApiError::from(AuthError::WeakPassword("short".into()));
        assert_eq!(weak.status(), StatusCode::BAD_REQUEST);
        assert_eq!(weak.code(), "invalid_input");

        let db = ApiError::from(AuthError::HashingFailed);
        assert_eq!(db.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(db.code(), "store_error");
    }

    #[test]
    fn test_store_errors_are_sanitized() {
        let err = ApiError::from(GameError::Database(sqlx::Error::RowNotFound));
        assert_eq!(err.client_message(), "Internal server error");
        assert_eq!(err.code(), "store_error");
    }
}
