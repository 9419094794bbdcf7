//! Seating rules, evaluated against a snapshot read inside the writing
//! transaction.

use super::models::{GameTable, Lobby, TABLE_CAPACITY, TableStatus};
use crate::auth::UserId;
use crate::errors::{GameError, GameResult};

const MAX_TABLE_NAME_CHARS: usize = 100;

/// Bet limits must be positive and strictly increasing
pub fn validate_bet_range(min_bet: i64, max_bet: i64) -> GameResult<()> {
    if min_bet >= max_bet {
        return Err(GameError::InvalidRange {
            min: min_bet,
            max: max_bet,
        });
    }
    if min_bet < 1 {
        return Err(GameError::InvalidInput(
            "Minimum bet must be at least 1 diamond".to_string(),
        ));
    }
    Ok(())
}

/// Returns the trimmed name
pub fn validate_table_name(name: &str) -> GameResult<&str> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_TABLE_NAME_CHARS {
        return Err(GameError::InvalidInput(format!(
            "Table name must be 1-{MAX_TABLE_NAME_CHARS} characters"
        )));
    }
    Ok(trimmed)
}

/// Diamonds not yet staked on a seat at some other table.
///
/// Seats are only settled when their match finishes, so a bet is covered
/// only if it fits in what the other seats leave over.
pub fn unstaked(balance: i64, staked_elsewhere: i64) -> i64 {
    balance.saturating_sub(staked_elsewhere).max(0)
}

/// The creator is seated with the minimum bet, so they must be able to cover it
pub fn check_create_funds(available: i64, min_bet: i64) -> GameResult<()> {
    if available < min_bet {
        return Err(GameError::InsufficientFunds {
            available,
            required: min_bet,
        });
    }
    Ok(())
}

/// Lobbies admit players whose total balance sits inside their diamond band
pub fn check_lobby_entry(lobby: &Lobby, balance: i64) -> GameResult<()> {
    if balance < lobby.min_diamonds {
        return Err(GameError::InsufficientFunds {
            available: balance,
            required: lobby.min_diamonds,
        });
    }
    if let Some(max) = lobby.max_diamonds
        && balance > max
    {
        return Err(GameError::Forbidden(format!(
            "{} is for players holding at most {max} diamonds",
            lobby.name
        )));
    }
    Ok(())
}

/// Decide whether `user_id` may take a seat with `bet`.
///
/// `available` is the user's [`unstaked`] balance. Checks run in a fixed
/// order so clients always see the same error for the same situation:
/// status, bet limits, funds, duplicate seat, capacity.
pub fn check_join(
    table: &GameTable,
    seated: &[UserId],
    user_id: UserId,
    available: i64,
    bet: i64,
) -> GameResult<()> {
    if table.status != TableStatus::Waiting {
        return Err(GameError::InvalidState(
            "This table is not accepting players right now".to_string(),
        ));
    }

    if bet < table.min_bet || bet > table.max_bet {
        return Err(GameError::InvalidBet {
            bet,
            min: table.min_bet,
            max: table.max_bet,
        });
    }

    if available < bet {
        return Err(GameError::InsufficientFunds {
            available,
            required: bet,
        });
    }

    if seated.contains(&user_id) {
        return Err(GameError::AlreadySeated);
    }

    if seated.len() >= TABLE_CAPACITY {
        return Err(GameError::TableFull);
    }

    Ok(())
}

/// Seats can only be given up before the match starts
pub fn check_leave(table: &GameTable, seated: &[UserId], user_id: UserId) -> GameResult<()> {
    if table.status != TableStatus::Waiting {
        return Err(GameError::InvalidState(
            "Cannot leave a table while its match is running".to_string(),
        ));
    }
    if !seated.contains(&user_id) {
        return Err(GameError::InvalidInput(
            "You are not seated at this table".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use chrono::Utc;
    use proptest::prelude::*;

    fn table(status: TableStatus) -> GameTable {
        GameTable {
            id: 1,
            lobby_id: 1,
            name: "Corner table".to_string(),
            min_bet: 10,
            max_bet: 100,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_bet_range() {
        assert!(validate_bet_range(10, 100).is_ok());
        assert!(matches!(
            validate_bet_range(100, 100),
            Err(GameError::InvalidRange { min: 100, max: 100 })
        ));
        assert!(matches!(
            validate_bet_range(200, 100),
            Err(GameError::InvalidRange { .. })
        ));
        assert!(matches!(
            validate_bet_range(0, 100),
            Err(GameError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_table_name() {
        assert_eq!(validate_table_name("  Lucky 4  ").unwrap(), "Lucky 4");
        assert!(validate_table_name("   ").is_err());
        assert!(validate_table_name(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_create_funds() {
        assert!(check_create_funds(10, 10).is_ok());
        assert!(matches!(
            check_create_funds(9, 10),
            Err(GameError::InsufficientFunds { available: 9, required: 10 })
        ));
    }

    #[test]
    fn test_unstaked_never_negative() {
        assert_eq!(unstaked(80, 40), 40);
        assert_eq!(unstaked(40, 40), 0);
        assert_eq!(unstaked(30, 40), 0);
        assert_eq!(unstaked(i64::MIN, i64::MAX), 0);
    }

    #[test]
    fn test_stake_at_another_table_blocks_join() {
        // 40 diamonds, all already riding on another table
        let available = unstaked(40, 40);
        assert!(matches!(
            check_join(&table(TableStatus::Waiting), &[], 5, available, 40),
            Err(GameError::InsufficientFunds { available: 0, required: 40 })
        ));
        assert!(check_join(&table(TableStatus::Waiting), &[], 5, unstaked(80, 40), 40).is_ok());
    }

    #[test]
    fn test_lobby_entry_band() {
        let lobby = Lobby {
            id: 2,
            name: "Silver Room".to_string(),
            min_diamonds: 100,
            max_diamonds: Some(1_000),
        };
        assert!(check_lobby_entry(&lobby, 100).is_ok());
        assert!(check_lobby_entry(&lobby, 1_000).is_ok());
        assert!(matches!(
            check_lobby_entry(&lobby, 99),
            Err(GameError::InsufficientFunds { available: 99, required: 100 })
        ));
        assert_eq!(
            check_lobby_entry(&lobby, 1_001).unwrap_err().kind(),
            ErrorKind::Forbidden
        );

        let open = Lobby {
            max_diamonds: None,
            min_diamonds: 0,
            ..lobby
        };
        assert!(check_lobby_entry(&open, i64::MAX).is_ok());
    }

    #[test]
    fn test_join_boundaries_are_inclusive() {
        let t = table(TableStatus::Waiting);
        assert!(check_join(&t, &[], 5, 1_000, 10).is_ok());
        assert!(check_join(&t, &[], 5, 1_000, 100).is_ok());
        assert!(matches!(
            check_join(&t, &[], 5, 1_000, 9),
            Err(GameError::InvalidBet { bet: 9, min: 10, max: 100 })
        ));
        assert!(matches!(
            check_join(&t, &[], 5, 1_000, 101),
            Err(GameError::InvalidBet { .. })
        ));
    }

    #[test]
    fn test_join_rejections() {
        let waiting = table(TableStatus::Waiting);

        assert_eq!(
            check_join(&table(TableStatus::InGame), &[], 5, 1_000, 50)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidState
        );
        assert!(matches!(
            check_join(&waiting, &[], 5, 49, 50),
            Err(GameError::InsufficientFunds { available: 49, required: 50 })
        ));
        assert!(matches!(
            check_join(&waiting, &[1, 5], 5, 1_000, 50),
            Err(GameError::AlreadySeated)
        ));
        assert!(matches!(
            check_join(&waiting, &[1, 2, 3, 4], 5, 1_000, 50),
            Err(GameError::TableFull)
        ));
    }

    #[test]
    fn test_join_check_order() {
        // A seated player re-joining a full in-game table with a bad bet
        // hears about the status first.
        let t = table(TableStatus::InGame);
        assert!(matches!(
            check_join(&t, &[1, 2, 3, 4], 1, 0, 5),
            Err(GameError::InvalidState(_))
        ));

        // Bet limits are reported before funds
        let t = table(TableStatus::Waiting);
        assert!(matches!(
            check_join(&t, &[], 1, 0, 5),
            Err(GameError::InvalidBet { .. })
        ));

        // Already seated wins over full
        assert!(matches!(
            check_join(&t, &[1, 2, 3, 4], 1, 1_000, 50),
            Err(GameError::AlreadySeated)
        ));
    }

    #[test]
    fn test_leave() {
        let t = table(TableStatus::Waiting);
        assert!(check_leave(&t, &[1, 2], 2).is_ok());
        assert!(matches!(
            check_leave(&t, &[1, 2], 3),
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            check_leave(&table(TableStatus::InGame), &[1, 2], 2),
            Err(GameError::InvalidState(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_join_accepts_exactly_the_bet_range(
            min in 1i64..1_000,
            span in 1i64..1_000,
            bet in -10i64..3_000,
        ) {
            let mut t = table(TableStatus::Waiting);
            t.min_bet = min;
            t.max_bet = min + span;
            let result = check_join(&t, &[], 9, i64::MAX, bet);
            let in_range = bet >= t.min_bet && bet <= t.max_bet;
            prop_assert_eq!(result.is_ok(), in_range);
        }

        #[test]
        fn prop_never_seats_a_fifth_player(seated_count in 0usize..8) {
            let t = table(TableStatus::Waiting);
            let seated: Vec<UserId> = (100..100 + seated_count as i64).collect();
            let result = check_join(&t, &seated, 1, 1_000, 50);
            prop_assert_eq!(result.is_ok(), seated_count < TABLE_CAPACITY);
        }
    }
}
