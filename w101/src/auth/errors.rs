//! Authentication error types.

use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Unknown login or wrong password; deliberately indistinguishable
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Username already exists
    #[error("Username already exists")]
    UsernameTaken,

    /// Email already exists
    #[error("Email already exists")]
    EmailTaken,

    /// Invalid username format
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    /// Password too weak
    #[error("Password too weak: {0}")]
    WeakPassword(String),

    #[error("Invalid email address")]
    InvalidEmail,

    /// Bearer token missing, malformed, expired or issued for someone else
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Database and JWT errors are sanitized so token structure and SQL
    /// details never reach the caller.
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Database(_) | AuthError::HashingFailed => {
                "Internal server error".to_string()
            }
            AuthError::JwtError(_) => "Authentication failed".to_string(),
            _ => self.to_string(),
        }
    }

    /// True for failures caused by the caller's identity rather than input
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AuthError::InvalidCredentials | AuthError::JwtError(_))
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
