//! Authentication manager implementation.

use super::{
    errors::{AuthError, AuthResult},
    models::{AccessTokenClaims, AuthResponse, LoginRequest, NewUser, RegisterRequest},
    tokens::TokenService,
};
use crate::db::UserRepository;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use std::sync::Arc;

/// Authentication manager
#[derive(Clone)]
pub struct AuthManager {
    users: Arc<dyn UserRepository>,
    tokens: TokenService,
    pepper: String,
    starting_diamonds: i64,
}

impl AuthManager {
    /// Create a new authentication manager
    ///
    /// # Arguments
    ///
    /// * `users` - Account storage
    /// * `tokens` - Bearer token signer/verifier
    /// * `pepper` - Server-side pepper for password hashing
    /// * `starting_diamonds` - Balance granted to newly registered accounts
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: TokenService,
        pepper: String,
        starting_diamonds: i64,
    ) -> Self {
        Self {
            users,
            tokens,
            pepper,
            starting_diamonds,
        }
    }

    /// Register a new user and sign them in
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<AuthResponse> {
        let username = request.username.trim().to_string();
        validate_username(&username)?;
        validate_password(&request.password)?;

        let email = match request.email.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(email) => {
                validate_email(email)?;
                Some(email.to_string())
            }
        };

        // Checked up front for a precise error; the unique constraints still
        // catch a concurrent registration of the same name.
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        if let Some(email) = &email
            && self.users.find_by_email(email).await?.is_some()
        {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hash_password(&request.password)?;
        let user_id = self
            .users
            .create_user(&NewUser {
                username: username.clone(),
                email: email.clone(),
                password_hash,
                display_name: username.clone(),
                starting_diamonds: self.starting_diamonds,
            })
            .await?;

        log::info!("Registered user {} ({})", username, user_id);

        let (token, expires_at) = self.tokens.issue(user_id, &username, email.as_deref())?;
        Ok(AuthResponse {
            token,
            user_id,
            username,
            email,
            expires_at,
        })
    }

    /// Log in with username or email
    pub async fn login(&self, request: LoginRequest) -> AuthResult<AuthResponse> {
        let Some(credentials) = self.users.find_credentials(request.login.trim()).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        self.verify_password(&request.password, &credentials.password_hash)?;
        self.users.update_last_login(credentials.id).await?;

        let (token, expires_at) = self.tokens.issue(
            credentials.id,
            &credentials.username,
            credentials.email.as_deref(),
        )?;

        log::debug!("User {} logged in", credentials.id);

        Ok(AuthResponse {
            token,
            user_id: credentials.id,
            username: credentials.username,
            email: credentials.email,
            expires_at,
        })
    }

    /// Verify an access token and return its claims
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        self.tokens.verify(token)
    }

    /// Hash password with Argon2id + pepper
    fn hash_password(&self, password: &str) -> AuthResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);

        Ok(Argon2::default()
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| AuthError::HashingFailed)?
            .to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> AuthResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)
    }
}

fn validate_username(username: &str) -> AuthResult<()> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(AuthError::InvalidUsername(
            "Username must be 3-50 characters".to_string(),
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '-')
    {
        return Err(AuthError::InvalidUsername(
            "Username can only contain letters, numbers, '.', '-' and '_'".to_string(),
        ));
    }

    Ok(())
}

fn validate_password(password: &str) -> AuthResult<()> {
    if password.chars().count() < 6 {
        return Err(AuthError::WeakPassword(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> AuthResult<()> {
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') =>
        {
            Ok(())
        }
        _ => Err(AuthError::InvalidEmail),
    }
}
