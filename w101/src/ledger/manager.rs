//! Diamond ledger implementation.
//!
//! Every balance change is paired with a `diamond_transactions` row written in
//! the same store transaction. Writers hand in their own transaction so the
//! ledger commits or rolls back together with whatever justified the change.

use super::models::{DiamondTransaction, LedgerDelta, LedgerReceipt, Reconciliation};
use crate::auth::UserId;
use crate::errors::{GameError, GameResult};
use sqlx::{PgPool, Postgres, Transaction};

/// Default page size for [`DiamondLedger::history`]
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Diamond ledger
#[derive(Clone)]
pub struct DiamondLedger {
    pool: PgPool,
}

impl DiamondLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply a signed balance change and append its ledger entry.
    ///
    /// The update refuses to take a balance below zero, failing with
    /// `InsufficientFunds`; the caller's transaction is then expected to
    /// roll back. A zero delta leaves the balance untouched and writes no
    /// entry.
    pub async fn apply_delta(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        delta: &LedgerDelta,
    ) -> GameResult<LedgerReceipt> {
        if delta.amount == 0 {
            let balance = current_balance(tx, delta.user_id).await?;
            return Ok(LedgerReceipt {
                transaction_id: None,
                balance_after: balance,
            });
        }

        let balance_after: Option<i64> = sqlx::query_scalar(
            "UPDATE users
             SET diamonds = diamonds + $1, updated_at = NOW()
             WHERE id = $2 AND diamonds + $1 >= 0
             RETURNING diamonds",
        )
        .bind(delta.amount)
        .bind(delta.user_id)
        .fetch_optional(&mut **tx)
        .await?;

        let Some(balance_after) = balance_after else {
            // Either the user is gone or the debit would overdraw them
            let available = current_balance(tx, delta.user_id).await?;
            return Err(GameError::InsufficientFunds {
                available,
                required: delta.amount.saturating_neg(),
            });
        };

        let transaction_id: i64 = sqlx::query_scalar(
            "INSERT INTO diamond_transactions (user_id, amount, transaction_type, description)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(delta.user_id)
        .bind(delta.amount.unsigned_abs() as i64)
        .bind(delta.transaction_type.as_str())
        .bind(&delta.description)
        .fetch_one(&mut **tx)
        .await?;

        log::debug!(
            "Ledger {} for user {}: {:+} -> {}",
            delta.transaction_type,
            delta.user_id,
            delta.amount,
            balance_after
        );

        Ok(LedgerReceipt {
            transaction_id: Some(transaction_id),
            balance_after,
        })
    }

    /// Current diamond balance
    pub async fn balance(&self, user_id: UserId) -> GameResult<i64> {
        sqlx::query_scalar("SELECT diamonds FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(GameError::UserNotFound(user_id))
    }

    /// Most recent ledger entries, newest first
    pub async fn history(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> GameResult<Vec<DiamondTransaction>> {
        let limit = limit.clamp(1, 500);
        let entries = sqlx::query_as::<_, DiamondTransaction>(
            "SELECT id, user_id, amount, transaction_type, description, created_at
             FROM diamond_transactions
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Compare the stored balance with the opening grant plus the signed sum
    /// of the user's ledger
    pub async fn reconcile(&self, user_id: UserId) -> GameResult<Reconciliation> {
        let (balance, opening_balance): (i64, i64) =
            sqlx::query_as("SELECT diamonds, opening_diamonds FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(GameError::UserNotFound(user_id))?;

        let ledger_net: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(CASE WHEN transaction_type = 'match_loss'
                                      THEN -amount ELSE amount END), 0)::BIGINT
             FROM diamond_transactions
             WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Reconciliation {
            user_id,
            balance,
            opening_balance,
            ledger_net,
            discrepancy: balance - opening_balance - ledger_net,
        })
    }
}

async fn current_balance(tx: &mut Transaction<'_, Postgres>, user_id: UserId) -> GameResult<i64> {
    sqlx::query_scalar("SELECT diamonds FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(GameError::UserNotFound(user_id))
}
