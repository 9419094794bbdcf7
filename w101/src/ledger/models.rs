//! Diamond ledger data models.

use crate::auth::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ledger entry tag, stored in `diamond_transactions.transaction_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    MatchWin,
    MatchLoss,
    DailyReward,
    AdReward,
    Purchase,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::MatchWin => "match_win",
            TransactionType::MatchLoss => "match_loss",
            TransactionType::DailyReward => "daily_reward",
            TransactionType::AdReward => "ad_reward",
            TransactionType::Purchase => "purchase",
        }
    }

    /// Whether entries of this type add to the balance. Only match losses
    /// take diamonds away.
    pub fn is_credit(&self) -> bool {
        !matches!(self, TransactionType::MatchLoss)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TransactionType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "match_win" => Ok(TransactionType::MatchWin),
            "match_loss" => Ok(TransactionType::MatchLoss),
            "daily_reward" => Ok(TransactionType::DailyReward),
            "ad_reward" => Ok(TransactionType::AdReward),
            "purchase" => Ok(TransactionType::Purchase),
            other => Err(format!("unknown transaction type '{other}'")),
        }
    }
}

/// Immutable ledger entry. `amount` is always non-negative; the direction
/// comes from `transaction_type`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DiamondTransaction {
    pub id: i64,
    pub user_id: UserId,
    pub amount: i64,
    #[sqlx(try_from = "String")]
    pub transaction_type: TransactionType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl DiamondTransaction {
    /// Signed effect of this entry on the balance
    pub fn signed_amount(&self) -> i64 {
        if self.transaction_type.is_credit() {
            self.amount
        } else {
            -self.amount
        }
    }
}

/// A balance change to be applied inside a caller-owned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerDelta {
    pub user_id: UserId,
    /// Signed change to the balance
    pub amount: i64,
    pub transaction_type: TransactionType,
    pub description: String,
}

impl LedgerDelta {
    pub fn credit(
        user_id: UserId,
        amount: i64,
        transaction_type: TransactionType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            amount,
            transaction_type,
            description: description.into(),
        }
    }

    /// Delta for a match result, or `None` when the player broke even.
    pub fn for_match(user_id: UserId, diamond_change: i64, table_name: &str) -> Option<Self> {
        match diamond_change {
            0 => None,
            change if change > 0 => Some(Self {
                user_id,
                amount: change,
                transaction_type: TransactionType::MatchWin,
                description: format!("Match win - {table_name}"),
            }),
            change => Some(Self {
                user_id,
                amount: change,
                transaction_type: TransactionType::MatchLoss,
                description: format!("Match loss - {table_name}"),
            }),
        }
    }
}

/// Outcome of a single applied delta
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerReceipt {
    /// `None` when the delta was zero and no entry was written
    pub transaction_id: Option<i64>,
    pub balance_after: i64,
}

/// Balance versus ledger comparison for one user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub user_id: UserId,
    pub balance: i64,
    /// Diamonds granted at registration
    pub opening_balance: i64,
    /// Signed sum of all ledger entries
    pub ledger_net: i64,
    /// `balance - opening_balance - ledger_net`; non-zero only when diamonds
    /// moved outside the ledger
    pub discrepancy: i64,
}

/// Amounts and throttles for the free diamond rewards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardConfig {
    pub daily_amount: i64,
    pub ad_amount: i64,
    pub ad_cooldown: chrono::Duration,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            daily_amount: 50,
            ad_amount: 25,
            ad_cooldown: chrono::Duration::minutes(20),
        }
    }
}

/// Result of a successful reward claim
#[derive(Debug, Clone, Serialize)]
pub struct RewardClaim {
    pub amount: i64,
    pub balance: i64,
    pub next_at: DateTime<Utc>,
}

/// Which rewards a user can claim right now
#[derive(Debug, Clone, Serialize)]
pub struct RewardStatus {
    pub can_claim_daily: bool,
    pub next_daily_at: Option<DateTime<Utc>>,
    pub can_claim_ad: bool,
    pub next_ad_at: Option<DateTime<Utc>>,
    pub daily_amount: i64,
    pub ad_amount: i64,
}

/// Catalogue entry in the diamond shop
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShopItem {
    pub id: i64,
    pub name: String,
    pub diamond_amount: i64,
    pub price_local: f64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub purchase_id: i64,
    pub item_name: String,
    pub diamonds_received: i64,
    pub balance: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_round_trip() {
        for ty in [
            TransactionType::MatchWin,
            TransactionType::MatchLoss,
            TransactionType::DailyReward,
            TransactionType::AdReward,
            TransactionType::Purchase,
        ] {
            assert_eq!(TransactionType::try_from(ty.to_string()), Ok(ty));
        }
        assert!(TransactionType::try_from("refund".to_string()).is_err());
    }

    #[test]
    fn test_match_delta_direction() {
        let win = LedgerDelta::for_match(1, 15, "Table A").unwrap();
        assert_eq!(win.transaction_type, TransactionType::MatchWin);
        assert_eq!(win.description, "Match win - Table A");

        let loss = LedgerDelta::for_match(2, -15, "Table A").unwrap();
        assert_eq!(loss.transaction_type, TransactionType::MatchLoss);
        assert_eq!(loss.amount, -15);
        assert_eq!(loss.description, "Match loss - Table A");

        assert!(LedgerDelta::for_match(3, 0, "Table A").is_none());
    }

    #[test]
    fn test_signed_amount() {
        let mut entry = DiamondTransaction {
            id: 1,
            user_id: 1,
            amount: 40,
            transaction_type: TransactionType::MatchLoss,
            description: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(entry.signed_amount(), -40);
        entry.transaction_type = TransactionType::Purchase;
        assert_eq!(entry.signed_amount(), 40);
    }
}
