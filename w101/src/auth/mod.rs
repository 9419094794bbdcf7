//! Authentication module providing registration, login, and bearer tokens.
//!
//! This module implements:
//! - Argon2id password hashing with server-side pepper
//! - HS256 JWT access tokens validated for issuer, audience and expiry
//! - Login by username or email
//!
//! ## Example
//!
//! ```no_run
//! use w101::auth::{AuthManager, RegisterRequest, TokenService};
//! use w101::db::{Database, PgUserRepository};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let auth = AuthManager::new(
//!         Arc::new(PgUserRepository::new(db.pool().clone())),
//!         TokenService::new("a-secret-of-at-least-thirty-two-chars", "w101", "w101-clients", 24),
//!         "secret_pepper".to_string(),
//!         100,
//!     );
//!
//!     let request = RegisterRequest {
//!         username: "player1".to_string(),
//!         email: Some("player@example.com".to_string()),
//!         password: "SecurePass123".to_string(),
//!     };
//!
//!     let response = auth.register(request).await?;
//!     println!("Registered user: {}", response.username);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;
pub mod tokens;

pub use errors::{AuthError, AuthResult};
pub use manager::AuthManager;
pub use models::{
    AccessTokenClaims, AuthResponse, Credentials, LoginRequest, NewUser, RegisterRequest, User,
    UserId,
};
pub use tokens::TokenService;
