//! Game error types shared by the table, match, ledger and profile modules.

use crate::db::timeouts::TimeoutError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Stable, machine-readable classification of a [`GameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    InvalidInput,
    Forbidden,
    InsufficientFunds,
    Conflict,
    StoreError,
}

impl ErrorKind {
    /// Code sent to clients alongside the human-readable message.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::Conflict => "conflict",
            ErrorKind::StoreError => "store_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors raised by table, match, ledger, reward, store and profile operations.
#[derive(Debug, Error)]
pub enum GameError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store round-trip exceeded its deadline; the transaction was rolled back
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Lobby {0} not found")]
    LobbyNotFound(i64),

    #[error("Table {0} not found")]
    TableNotFound(i64),

    #[error("Match {0} not found")]
    MatchNotFound(i64),

    #[error("Shop item {0} not found")]
    ShopItemNotFound(i64),

    /// Table bet limits are not an increasing range
    #[error("Minimum bet {min} must be lower than maximum bet {max}")]
    InvalidRange { min: i64, max: i64 },

    /// Bet outside the table's limits
    #[error("Bet {bet} is outside the table limits {min}-{max}")]
    InvalidBet { bet: i64, min: i64, max: i64 },

    #[error("Insufficient diamonds: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },

    #[error("You are already seated at this table")]
    AlreadySeated,

    #[error("Table is full")]
    TableFull,

    /// Reward throttle has not elapsed yet
    #[error("Reward not available until {0}")]
    RewardNotAvailable(DateTime<Utc>),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Forbidden(String),
}

impl GameError {
    /// Classify this error into the stable taxonomy used by callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::Database(_) | GameError::Timeout(_) => ErrorKind::StoreError,
            GameError::UserNotFound(_)
            | GameError::LobbyNotFound(_)
            | GameError::TableNotFound(_)
            | GameError::MatchNotFound(_)
            | GameError::ShopItemNotFound(_) => ErrorKind::NotFound,
            GameError::InvalidRange { .. }
            | GameError::InvalidBet { .. }
            | GameError::InvalidInput(_) => ErrorKind::InvalidInput,
            GameError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            GameError::AlreadySeated | GameError::TableFull => ErrorKind::Conflict,
            GameError::RewardNotAvailable(_) | GameError::InvalidState(_) => {
                ErrorKind::InvalidState
            }
            GameError::Forbidden(_) => ErrorKind::Forbidden,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Store failures are collapsed into a generic message; everything else is
    /// already phrased for the player.
    pub fn client_message(&self) -> String {
        match self {
            GameError::Database(_) | GameError::Timeout(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<TimeoutError> for GameError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => GameError::Timeout(duration),
            TimeoutError::Database(e) => GameError::Database(e),
        }
    }
}

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;
