//! Table module: pre-match seating areas with bet limits.
//!
//! This module implements:
//! - Lobby listing, with each lobby admitting a band of diamond balances
//! - Table creation inside a lobby, seating the creator at the minimum bet
//! - Join/leave with bet-range, funds, duplicate-seat and capacity checks
//! - A fixed capacity of four seats, the exact player count of a match
//!
//! Diamonds only move when the match built from a table is settled (see
//! [`crate::matches`]). Until then a seat's bet is reserved: a user's bets
//! across all tables never exceed their balance, so every honest result can
//! be settled.
//!
//! ## Example
//!
//! ```no_run
//! use w101::db::Database;
//! use w101::table::{CreateTableRequest, TableManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let tables = TableManager::new(db.pool().clone());
//!
//!     let table_id = tables
//!         .create_table(
//!             1,
//!             CreateTableRequest {
//!                 lobby_id: 1,
//!                 name: "Evening four".to_string(),
//!                 min_bet: 10,
//!                 max_bet: 100,
//!             },
//!         )
//!         .await?;
//!     tables.join_table(2, table_id, 25).await?;
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod models;
pub mod rules;

pub use manager::TableManager;
pub use models::{
    CreateTableRequest, GameTable, JoinTableRequest, Lobby, LobbyId, Seat, TABLE_CAPACITY,
    TableId, TableStatus, TableView,
};
