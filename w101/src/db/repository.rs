//! Repository trait definitions for testability and dependency injection.
//!
//! Account reads and writes used by the auth and profile services go through
//! [`UserRepository`], so those services can be exercised against an
//! in-memory mock. Ledger, table and match operations need real row locks and
//! talk to the pool directly.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::{AuthError, AuthResult, Credentials, NewUser, User, UserId};

const USER_COLUMNS: &str = "id, username, email, COALESCE(display_name, username) AS display_name,
     level, diamonds, wins, losses, last_login, created_at";

/// Trait for user/account repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user, failing with `UsernameTaken` or `EmailTaken` on
    /// a uniqueness clash
    async fn create_user(&self, user: &NewUser) -> AuthResult<UserId>;

    /// Find user by username
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;

    /// Look up login credentials by username or email
    async fn find_credentials(&self, login: &str) -> Result<Option<Credentials>, sqlx::Error>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, sqlx::Error>;

    /// Update user's last login timestamp
    async fn update_last_login(&self, user_id: UserId) -> Result<(), sqlx::Error>;

    /// Returns false when no such user exists
    async fn update_display_name(
        &self,
        user_id: UserId,
        display_name: &str,
    ) -> Result<bool, sqlx::Error>;
}

/// Default PostgreSQL implementation of `UserRepository`
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate a unique-constraint violation on `users` into the matching
/// auth error.
fn map_unique_violation(err: sqlx::Error) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        return match db_err.constraint() {
            Some(c) if c.contains("email") => AuthError::EmailTaken,
            _ => AuthError::UsernameTaken,
        };
    }
    AuthError::Database(err)
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: &NewUser) -> AuthResult<UserId> {
        let id: UserId = sqlx::query_scalar(
            "INSERT INTO users (username, email, password_hash, display_name, diamonds,
                                opening_diamonds)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(user.starting_diamonds)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(id)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_credentials(&self, login: &str) -> Result<Option<Credentials>, sqlx::Error> {
        sqlx::query_as::<_, Credentials>(
            "SELECT id, username, email, password_hash
             FROM users
             WHERE username = $1 OR email = $1
             ORDER BY (username = $1) DESC
             LIMIT 1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_last_login(&self, user_id: UserId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_display_name(
        &self,
        user_id: UserId,
        display_name: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET display_name = $1, updated_at = NOW() WHERE id = $2")
                .bind(display_name)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }
}
