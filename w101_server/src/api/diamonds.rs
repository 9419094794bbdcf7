//! Diamond balance, ledger history, rewards and store purchases.

use axum::extract::{Extension, Path, Query, State, rejection::QueryRejection};
use serde::{Deserialize, Serialize};
use w101::auth::UserId;
use w101::ledger::{
    DEFAULT_HISTORY_LIMIT, DiamondTransaction, PurchaseReceipt, Reconciliation, RewardClaim,
    RewardStatus,
};

use super::{
    AppState,
    error::{ApiResult, ok},
};
use crate::metrics;

#[derive(Debug, Serialize)]
pub struct Balance {
    pub user_id: UserId,
    pub diamonds: i64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

pub async fn balance(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> ApiResult<Balance> {
    let diamonds = state.ledger.balance(user_id).await?;
    Ok(ok(Balance { user_id, diamonds }))
}

/// Newest entries first; `limit` defaults to 50 and is capped by the ledger.
pub async fn history(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Vec<DiamondTransaction>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(ok(state.ledger.history(user_id, limit).await?))
}

pub async fn reconcile(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> ApiResult<Reconciliation> {
    let report = state.ledger.reconcile(user_id).await?;
    if report.discrepancy != 0 {
        tracing::warn!(
            user_id = user_id,
            discrepancy = report.discrepancy,
            "Balance does not match ledger"
        );
    }
    Ok(ok(report))
}

/// Claim the once-per-UTC-day login reward.
///
/// # Errors
///
/// - `400 Bad Request`: Already claimed today (`invalid_state`)
pub async fn claim_daily(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> ApiResult<RewardClaim> {
    let claim = state.rewards.claim_daily(user_id).await?;
    metrics::rewards_claimed_total("daily");
    Ok(ok(claim))
}

/// Claim the ad-view reward, throttled by a rolling cooldown.
pub async fn claim_ad(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> ApiResult<RewardClaim> {
    let claim = state.rewards.claim_ad(user_id).await?;
    metrics::rewards_claimed_total("ad");
    Ok(ok(claim))
}

pub async fn reward_status(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
) -> ApiResult<RewardStatus> {
    Ok(ok(state.rewards.status(user_id).await?))
}

/// Buy a diamond pack from the shop.
///
/// # Errors
///
/// - `400 Bad Request`: Item is no longer on sale
/// - `404 Not Found`: No such item
pub async fn purchase(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path(item_id): Path<i64>,
) -> ApiResult<PurchaseReceipt> {
    Ok(ok(state.store.purchase(user_id, item_id).await?))
}
