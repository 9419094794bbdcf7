//! Daily and ad-view diamond rewards.

use super::manager::DiamondLedger;
use super::models::{LedgerDelta, RewardClaim, RewardConfig, RewardStatus, TransactionType};
use crate::auth::UserId;
use crate::db::timeouts::with_transaction_timeout;
use crate::errors::{GameError, GameResult};
use chrono::{DateTime, Days, Duration, NaiveTime, Utc};
use sqlx::PgPool;

/// When the daily reward becomes claimable again, or `None` if it already is.
///
/// The daily reward resets at UTC midnight, not 24 hours after the last claim.
pub fn next_daily_at(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let last = last?;
    if last.date_naive() < now.date_naive() {
        return None;
    }
    let next_day = last.date_naive().checked_add_days(Days::new(1))?;
    Some(next_day.and_time(NaiveTime::MIN).and_utc())
}

/// When the ad reward becomes claimable again, or `None` if it already is.
pub fn next_ad_at(
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: Duration,
) -> Option<DateTime<Utc>> {
    let ready_at = last? + cooldown;
    (now < ready_at).then_some(ready_at)
}

#[derive(Debug, sqlx::FromRow)]
struct RewardTimestamps {
    last_daily_reward: Option<DateTime<Utc>>,
    last_ad_reward: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy)]
enum RewardKind {
    Daily,
    Ad,
}

/// Grants the free rewards through the ledger
#[derive(Clone)]
pub struct RewardManager {
    pool: PgPool,
    ledger: DiamondLedger,
    config: RewardConfig,
}

impl RewardManager {
    pub fn new(pool: PgPool, ledger: DiamondLedger, config: RewardConfig) -> Self {
        Self {
            pool,
            ledger,
            config,
        }
    }

    pub async fn claim_daily(&self, user_id: UserId) -> GameResult<RewardClaim> {
        with_transaction_timeout(self.claim(user_id, RewardKind::Daily)).await
    }

    pub async fn claim_ad(&self, user_id: UserId) -> GameResult<RewardClaim> {
        with_transaction_timeout(self.claim(user_id, RewardKind::Ad)).await
    }

    /// Report which rewards can be claimed now and when the others open up
    pub async fn status(&self, user_id: UserId) -> GameResult<RewardStatus> {
        let stamps = sqlx::query_as::<_, RewardTimestamps>(
            "SELECT last_daily_reward, last_ad_reward FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GameError::UserNotFound(user_id))?;

        let now = Utc::now();
        let next_daily = next_daily_at(stamps.last_daily_reward, now);
        let next_ad = next_ad_at(stamps.last_ad_reward, now, self.config.ad_cooldown);

        Ok(RewardStatus {
            can_claim_daily: next_daily.is_none(),
            next_daily_at: next_daily,
            can_claim_ad: next_ad.is_none(),
            next_ad_at: next_ad,
            daily_amount: self.config.daily_amount,
            ad_amount: self.config.ad_amount,
        })
    }

    async fn claim(&self, user_id: UserId, kind: RewardKind) -> GameResult<RewardClaim> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent claims by the same user
        let stamps = sqlx::query_as::<_, RewardTimestamps>(
            "SELECT last_daily_reward, last_ad_reward FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(GameError::UserNotFound(user_id))?;

        let now = Utc::now();
        let (blocked_until, delta, stamp_sql) = match kind {
            RewardKind::Daily => (
                next_daily_at(stamps.last_daily_reward, now),
                LedgerDelta::credit(
                    user_id,
                    self.config.daily_amount,
                    TransactionType::DailyReward,
                    "Daily login reward",
                ),
                "UPDATE users SET last_daily_reward = $1 WHERE id = $2",
            ),
            RewardKind::Ad => (
                next_ad_at(stamps.last_ad_reward, now, self.config.ad_cooldown),
                LedgerDelta::credit(
                    user_id,
                    self.config.ad_amount,
                    TransactionType::AdReward,
                    "Ad view reward",
                ),
                "UPDATE users SET last_ad_reward = $1 WHERE id = $2",
            ),
        };

        if let Some(next_at) = blocked_until {
            return Err(GameError::RewardNotAvailable(next_at));
        }

        sqlx::query(stamp_sql)
            .bind(now)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let receipt = self.ledger.apply_delta(&mut tx, &delta).await?;

        tx.commit().await?;

        let next_at = match kind {
            RewardKind::Daily => next_daily_at(Some(now), now),
            RewardKind::Ad => next_ad_at(Some(now), now, self.config.ad_cooldown),
        }
        .unwrap_or(now);

        log::info!(
            "User {} claimed {:?} reward of {} diamonds",
            user_id,
            kind,
            delta.amount
        );

        Ok(RewardClaim {
            amount: delta.amount,
            balance: receipt.balance_after,
            next_at,
        })
    }
}
