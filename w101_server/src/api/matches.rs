//! Match start, settlement and lookup.

use axum::{
    Json,
    extract::{Extension, Path, State, rejection::JsonRejection},
};
use std::time::Instant;
use w101::auth::UserId;
use w101::matches::{
    FinishMatchRequest, FinishedMatch, MatchId, MatchView, Settlement, StartedMatch,
};
use w101::table::TableId;

use super::{
    AppState,
    error::{ApiResult, ok},
};
use crate::{logging, metrics};

/// Start a match from a full table the caller is seated at.
///
/// # Errors
///
/// - `400 Bad Request`: Table not waiting, fewer than four players seated, or a
///   player's balance no longer covers their stakes
/// - `403 Forbidden`: Caller is not seated at the table
/// - `404 Not Found`: Table doesn't exist
pub async fn start_match(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path(table_id): Path<TableId>,
) -> ApiResult<StartedMatch> {
    let started = state.matches.start_match(user_id, table_id).await?;
    metrics::matches_started_total();
    Ok(ok(started))
}

/// Settle a match with the reported results.
///
/// # Request Body
///
/// ```json
/// {
///   "winner_user_id": 1,
///   "results": [
///     {"user_id": 1, "diamond_change": 15, "position": 1},
///     {"user_id": 2, "diamond_change": -15, "position": 2}
///   ]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Match already finished, malformed results, or a balance would go negative
/// - `403 Forbidden`: Caller did not play in the match
/// - `404 Not Found`: Match doesn't exist
pub async fn finish_match(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path(match_id): Path<MatchId>,
    payload: Result<Json<FinishMatchRequest>, JsonRejection>,
) -> ApiResult<FinishedMatch> {
    let Json(request) = payload?;
    let started = Instant::now();

    let finished = state
        .matches
        .finish_match(user_id, match_id, request.winner_user_id, &request.results)
        .await?;

    logging::log_performance("finish_match", started.elapsed().as_millis() as u64);
    metrics::matches_finished_total(diamonds_won(&finished.settlements));

    Ok(ok(finished))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(match_id): Path<MatchId>,
) -> ApiResult<MatchView> {
    Ok(ok(state.matches.get_match(match_id).await?))
}

/// Diamonds paid out to winners, saturating on absurd totals
fn diamonds_won(settlements: &[Settlement]) -> u64 {
    settlements
        .iter()
        .filter(|s| s.diamond_change > 0)
        .map(|s| s.diamond_change.unsigned_abs())
        .fold(0u64, u64::saturating_add)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settlement(user_id: UserId, diamond_change: i64) -> Settlement {
        Settlement {
            user_id,
            diamond_change,
            final_position: 1,
            balance_after: 0,
        }
    }

    #[test]
    fn test_diamonds_won_counts_winnings_only() {
        let s = [settlement(1, 15), settlement(2, -15), settlement(3, 0), settlement(4, 5)];
        assert_eq!(diamonds_won(&s), 20);
        assert_eq!(diamonds_won(&[]), 0);
    }

    #[test]
    fn test_diamonds_won_saturates() {
        let s = [settlement(1, i64::MAX), settlement(2, i64::MAX), settlement(3, i64::MAX)];
        assert_eq!(diamonds_won(&s), u64::MAX);
    }
}
