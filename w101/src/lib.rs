//! # w101
//!
//! Table, match and diamond-ledger engine for the w101 word/card game backend.
//!
//! Players sit down at a four-seat table with a stake inside the table's bet
//! limits. Once the table is full, any seated player can start a match; when
//! it ends, the finishing client reports each player's diamond change and the
//! whole settlement is applied in a single store transaction.
//!
//! ## Lifecycle
//!
//! - **Table `waiting`**: players join and leave
//! - **Match `active`**: the table is `in_game`; seats are frozen into match players
//! - **Match `finished`**: balances settled, ledger written, table back to `waiting`
//!
//! ## Core Modules
//!
//! - [`table`]: Table creation and seating rules
//! - [`matches`]: Start/finish state machine and settlement
//! - [`ledger`]: Diamond balances, transaction history, rewards and shop purchases
//! - [`auth`]: Registration, login and bearer tokens
//! - [`profile`]: Player stats
//! - [`db`]: Connection pool, migrations and repositories
//!
//! Every fallible game operation returns a [`GameError`], classified by
//! [`ErrorKind`] into the categories callers map to responses.

/// Registration, login and access tokens.
pub mod auth;

/// PostgreSQL pool, migrations, timeouts and repositories.
pub mod db;

pub mod errors;
pub use errors::{ErrorKind, GameError, GameResult};

/// Diamond balances and the append-only transaction ledger.
pub mod ledger;

/// Match lifecycle.
pub mod matches;

pub mod profile;

/// Tables and seats.
pub mod table;
