//! Start and finish preconditions.
//!
//! Both functions run on rows already locked by the calling transaction and
//! perform no I/O, so every rejection happens before the first write.

use super::models::{Match, MatchPlayer, MatchStatus, PlayerResult};
use crate::auth::UserId;
use crate::errors::{GameError, GameResult};
use crate::table::{GameTable, Seat, TABLE_CAPACITY, TableStatus};
use std::collections::HashSet;

/// May `requester` start a match from this table right now?
pub fn check_start(table: &GameTable, seats: &[Seat], requester: UserId) -> GameResult<()> {
    if table.status != TableStatus::Waiting {
        return Err(GameError::InvalidState(
            "A match is already running at this table".to_string(),
        ));
    }

    if seats.len() != TABLE_CAPACITY {
        return Err(GameError::InvalidState(format!(
            "A match needs exactly {TABLE_CAPACITY} players, {} seated",
            seats.len()
        )));
    }

    if !seats.iter().any(|s| s.user_id == requester) {
        return Err(GameError::Forbidden(
            "Only seated players can start the match".to_string(),
        ));
    }

    Ok(())
}

/// Validate a finish request and return the entries to settle.
///
/// Entries naming users outside the match are dropped. The rest come back
/// sorted by user id, the order in which user rows get locked.
pub fn plan_settlement(
    header: &Match,
    players: &[MatchPlayer],
    requester: UserId,
    winner: UserId,
    results: &[PlayerResult],
) -> GameResult<Vec<PlayerResult>> {
    if header.status != MatchStatus::Active {
        return Err(GameError::InvalidState(format!(
            "Match {} is already {}",
            header.id, header.status
        )));
    }

    let player = |user_id: UserId| players.iter().find(|p| p.user_id == user_id);

    if player(requester).is_none() {
        return Err(GameError::Forbidden(
            "Only match participants can finish the match".to_string(),
        ));
    }

    if player(winner).is_none() {
        return Err(GameError::InvalidInput(
            "Winner is not a player in this match".to_string(),
        ));
    }

    if results.is_empty() || results.len() != players.len() {
        return Err(GameError::InvalidInput(format!(
            "Expected {} player results, got {}",
            players.len(),
            results.len()
        )));
    }

    let mut seen = HashSet::with_capacity(results.len());
    if let Some(dup) = results.iter().find(|r| !seen.insert(r.user_id)) {
        return Err(GameError::InvalidInput(format!(
            "User {} appears more than once in the results",
            dup.user_id
        )));
    }

    let mut planned = Vec::with_capacity(results.len());
    for result in results {
        let Some(p) = player(result.user_id) else {
            log::warn!(
                "Ignoring result for user {} who is not in match {}",
                result.user_id,
                header.id
            );
            continue;
        };

        let loss = if result.diamond_change < 0 {
            result.diamond_change.unsigned_abs()
        } else {
            0
        };
        if loss > p.diamond_bet.unsigned_abs() {
            return Err(GameError::InvalidInput(format!(
                "User {} cannot lose {} diamonds on a bet of {}",
                p.user_id, loss, p.diamond_bet
            )));
        }

        planned.push(*result);
    }

    planned.sort_by_key(|r| r.user_id);
    Ok(planned)
}

/// Every seated player must still hold enough diamonds for all of their
/// open seats. `holdings` is `(user, balance, total staked)` read under the
/// users' row locks.
pub fn check_stakes_covered(holdings: &[(UserId, i64, i64)]) -> GameResult<()> {
    if let Some(&(user_id, balance, staked)) =
        holdings.iter().find(|&&(_, balance, staked)| staked > balance)
    {
        log::warn!(
            "User {} holds {} diamonds against {} staked",
            user_id,
            balance,
            staked
        );
        return Err(GameError::InsufficientFunds {
            available: balance,
            required: staked,
        });
    }
    Ok(())
}

/// Check each planned change against the locked balances before anything is
/// written. A change the balance column cannot hold is bad input.
pub fn check_payouts(planned: &[PlayerResult], balances: &[(UserId, i64)]) -> GameResult<()> {
    for result in planned {
        let Some(&(_, balance)) = balances.iter().find(|(id, _)| *id == result.user_id) else {
            return Err(GameError::UserNotFound(result.user_id));
        };
        match balance.checked_add(result.diamond_change) {
            None => {
                return Err(GameError::InvalidInput(format!(
                    "Diamond change {} for user {} is out of range",
                    result.diamond_change, result.user_id
                )));
            }
            Some(after) if after < 0 => {
                return Err(GameError::InsufficientFunds {
                    available: balance,
                    required: result.diamond_change.saturating_neg(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use chrono::Utc;

    fn table(status: TableStatus) -> GameTable {
        GameTable {
            id: 7,
            lobby_id: 1,
            name: "Scenario".to_string(),
            min_bet: 10,
            max_bet: 100,
            status,
            created_at: Utc::now(),
        }
    }

    fn seats(bets: &[(UserId, i64)]) -> Vec<Seat> {
        bets.iter()
            .map(|&(user_id, diamond_bet)| Seat {
                user_id,
                username: format!("u{user_id}"),
                diamond_bet,
                joined_at: Utc::now(),
            })
            .collect()
    }

    fn active_match() -> Match {
        Match {
            id: 3,
            table_id: 7,
            status: MatchStatus::Active,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Four players with bets 10, 20, 30 and 40 in join order
    fn players() -> Vec<MatchPlayer> {
        [(1, 10), (2, 20), (3, 30), (4, 40)]
            .iter()
            .enumerate()
            .map(|(i, &(user_id, diamond_bet))| MatchPlayer {
                user_id,
                username: format!("u{user_id}"),
                diamond_bet,
                position: i as i32 + 1,
                final_position: None,
                diamond_change: None,
            })
            .collect()
    }

    fn result(user_id: UserId, diamond_change: i64, position: i32) -> PlayerResult {
        PlayerResult {
            user_id,
            diamond_change,
            position,
        }
    }

    fn scenario_results() -> Vec<PlayerResult> {
        vec![result(1, 15, 1), result(2, -15, 2), result(3, 0, 3), result(4, 0, 4)]
    }

    #[test]
    fn test_start_needs_exactly_four() {
        let t = table(TableStatus::Waiting);
        for n in [0, 1, 3, 5] {
            let s = seats(&(1..=n).map(|u| (u, 10)).collect::<Vec<_>>());
            let err = check_start(&t, &s, 1).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidState, "{n} seats");
        }
        let full = seats(&[(1, 10), (2, 20), (3, 30), (4, 40)]);
        assert!(check_start(&t, &full, 1).is_ok());
    }

    #[test]
    fn test_start_rejections() {
        let full = seats(&[(1, 10), (2, 20), (3, 30), (4, 40)]);
        assert!(matches!(
            check_start(&table(TableStatus::InGame), &full, 1),
            Err(GameError::InvalidState(_))
        ));
        assert!(matches!(
            check_start(&table(TableStatus::Waiting), &full, 99),
            Err(GameError::Forbidden(_))
        ));
    }

    #[test]
    fn test_scenario_plan() {
        let planned =
            plan_settlement(&active_match(), &players(), 2, 1, &scenario_results()).unwrap();
        assert_eq!(planned, scenario_results());
    }

    #[test]
    fn test_finished_match_is_rejected() {
        let mut m = active_match();
        m.status = MatchStatus::Finished;
        let err = plan_settlement(&m, &players(), 1, 1, &scenario_results()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_requester_and_winner_must_play() {
        assert!(matches!(
            plan_settlement(&active_match(), &players(), 42, 1, &scenario_results()),
            Err(GameError::Forbidden(_))
        ));
        assert!(matches!(
            plan_settlement(&active_match(), &players(), 1, 42, &scenario_results()),
            Err(GameError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_results_length_must_match() {
        let m = active_match();
        assert!(matches!(
            plan_settlement(&m, &players(), 1, 1, &[]),
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            plan_settlement(&m, &players(), 1, 1, &scenario_results()[..3]),
            Err(GameError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_duplicate_results_rejected() {
        let results = vec![result(1, 15, 1), result(1, 5, 2), result(3, 0, 3), result(4, 0, 4)];
        assert!(matches!(
            plan_settlement(&active_match(), &players(), 1, 1, &results),
            Err(GameError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_loss_capped_by_bet() {
        // u2 bet 20
        let mut results = scenario_results();
        results[1] = result(2, -20, 2);
        assert!(plan_settlement(&active_match(), &players(), 1, 1, &results).is_ok());

        results[1] = result(2, -21, 2);
        assert!(matches!(
            plan_settlement(&active_match(), &players(), 1, 1, &results),
            Err(GameError::InvalidInput(_))
        ));

        // Wins are not capped
        results[1] = result(2, 10_000, 2);
        assert!(plan_settlement(&active_match(), &players(), 1, 1, &results).is_ok());
    }

    #[test]
    fn test_unknown_users_are_skipped() {
        let results = vec![result(4, 0, 4), result(99, 500, 1), result(2, -15, 2), result(1, 15, 1)];
        let planned = plan_settlement(&active_match(), &players(), 1, 1, &results).unwrap();
        let ids: Vec<UserId> = planned.iter().map(|r| r.user_id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn test_stakes_covered() {
        assert!(check_stakes_covered(&[(1, 40, 40), (2, 500, 10)]).is_ok());
        assert!(matches!(
            check_stakes_covered(&[(1, 500, 10), (2, 40, 80)]),
            Err(GameError::InsufficientFunds { available: 40, required: 80 })
        ));
    }

    #[test]
    fn test_payout_overflow_is_bad_input() {
        let mut results = scenario_results();
        results[0] = result(1, i64::MAX, 1);
        let balances = [(1, 500), (2, 500), (3, 500), (4, 500)];

        let err = check_payouts(&results, &balances).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        assert!(check_payouts(&scenario_results(), &balances).is_ok());
        results[0] = result(1, i64::MAX - 500, 1);
        assert!(check_payouts(&results, &balances).is_ok());
    }

    #[test]
    fn test_payout_overdraft() {
        let balances = [(1, 500), (2, 10), (3, 500), (4, 500)];
        assert!(matches!(
            check_payouts(&scenario_results(), &balances),
            Err(GameError::InsufficientFunds { available: 10, required: 15 })
        ));
    }
}
