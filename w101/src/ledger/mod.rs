//! Diamond ledger: the only sanctioned path for changing a user's balance.
//!
//! This module implements:
//! - Signed balance deltas paired with an append-only transaction row
//! - Overdraft protection (balances never go below zero)
//! - Daily and ad-view rewards, throttled under a row lock
//! - Diamond shop purchases
//! - Balance/ledger reconciliation
//!
//! ## Example
//!
//! ```no_run
//! use w101::db::Database;
//! use w101::ledger::{DiamondLedger, RewardConfig, RewardManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let ledger = DiamondLedger::new(db.pool().clone());
//!     let rewards = RewardManager::new(db.pool().clone(), ledger.clone(), RewardConfig::default());
//!
//!     let claim = rewards.claim_daily(1).await?;
//!     println!("Claimed {} diamonds, balance now {}", claim.amount, claim.balance);
//!
//!     let check = ledger.reconcile(1).await?;
//!     println!("Ledger discrepancy: {}", check.discrepancy);
//!     Ok(())
//! }
//! ```

pub mod manager;
pub mod models;
pub mod rewards;
pub mod store;

pub use manager::{DEFAULT_HISTORY_LIMIT, DiamondLedger};
pub use models::{
    DiamondTransaction, LedgerDelta, LedgerReceipt, PurchaseReceipt, Reconciliation, RewardClaim,
    RewardConfig, RewardStatus, ShopItem, TransactionType,
};
pub use rewards::RewardManager;
pub use store::StoreManager;
