//! Match lifecycle: start a match from a full table, then settle it.
//!
//! ## Example
//!
//! ```no_run
//! use w101::db::Database;
//! use w101::ledger::DiamondLedger;
//! use w101::matches::{MatchManager, PlayerResult};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let matches = MatchManager::new(db.pool().clone(), DiamondLedger::new(db.pool().clone()));
//!
//!     let started = matches.start_match(1, 10).await?;
//!     let results: Vec<PlayerResult> = started
//!         .players
//!         .iter()
//!         .map(|p| PlayerResult {
//!             user_id: p.user_id,
//!             diamond_change: if p.user_id == 1 { 15 } else { 0 },
//!             position: p.position,
//!         })
//!         .collect();
//!     matches.finish_match(1, started.match_id, 1, &results).await?;
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod models;
pub mod settlement;

pub use manager::MatchManager;
pub use models::{
    FinishMatchRequest, FinishedMatch, Match, MatchId, MatchPlayer, MatchStatus, MatchView,
    PlayerResult, Settlement, StartedMatch,
};
