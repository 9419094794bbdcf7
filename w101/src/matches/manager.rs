//! Match lifecycle: `waiting table -> active match -> finished match`.
//!
//! Each transition is one store transaction. The row that carries the status
//! being checked (the table on start, the match on finish) is locked with
//! `FOR UPDATE` before the check, which makes the check-and-set atomic: of two
//! concurrent finish calls for the same match, the second blocks on the lock,
//! then sees `finished` and fails with `InvalidState`.
//!
//! Lock order is match, table, then users by ascending id.
//!
//! Bets are not escrowed. Seating keeps each user's open stakes within their
//! balance, and start re-checks that under the user locks, so a finish whose
//! losses stay within the bets can always be applied.

use super::{
    models::{
        FinishedMatch, Match, MatchId, MatchPlayer, MatchStatus, MatchView, PlayerResult,
        Settlement, StartedMatch,
    },
    settlement,
};
use crate::auth::UserId;
use crate::db::timeouts::with_transaction_timeout;
use crate::errors::{GameError, GameResult};
use crate::ledger::{DiamondLedger, LedgerDelta};
use crate::table::{
    TableId, TableStatus,
    manager::{fetch_seats, lock_table, staked_elsewhere},
};
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};

const MATCH_COLUMNS: &str = "id, table_id, status, started_at, finished_at";

/// Match manager
#[derive(Clone)]
pub struct MatchManager {
    pool: PgPool,
    ledger: DiamondLedger,
}

impl MatchManager {
    pub fn new(pool: PgPool, ledger: DiamondLedger) -> Self {
        Self { pool, ledger }
    }

    /// Start a match from a full table.
    ///
    /// Snapshots the four seats into `match_players` (positions 1..=4 in join
    /// order) and flips the table to `in_game`, all in one transaction.
    ///
    /// # Errors
    ///
    /// * `GameError::TableNotFound` - No such table
    /// * `GameError::InvalidState` - Table not waiting, or not exactly four seats
    /// * `GameError::Forbidden` - Requester is not seated
    /// * `GameError::InsufficientFunds` - A player's balance no longer covers
    ///   their open stakes
    pub async fn start_match(
        &self,
        requester: UserId,
        table_id: TableId,
    ) -> GameResult<StartedMatch> {
        with_transaction_timeout(self.run_start(requester, table_id)).await
    }

    async fn run_start(&self, requester: UserId, table_id: TableId) -> GameResult<StartedMatch> {
        let mut tx = self.pool.begin().await?;

        let table = lock_table(&mut tx, table_id).await?;
        let seats = fetch_seats(&mut *tx, table_id).await?;
        settlement::check_start(&table, &seats, requester)?;

        let seated: Vec<UserId> = seats.iter().map(|s| s.user_id).collect();
        let mut holdings = Vec::with_capacity(seats.len());
        for (user_id, balance) in lock_balances(&mut tx, &seated).await? {
            let staked = staked_elsewhere(&mut tx, user_id, None).await?;
            holdings.push((user_id, balance, staked));
        }
        settlement::check_stakes_covered(&holdings)?;

        let (match_id, started_at): (MatchId, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO matches (table_id, status)
             VALUES ($1, $2)
             RETURNING id, started_at",
        )
        .bind(table_id)
        .bind(MatchStatus::Active.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let mut players = Vec::with_capacity(seats.len());
        for (position, seat) in (1..).zip(seats) {
            sqlx::query(
                "INSERT INTO match_players (match_id, user_id, diamond_bet, position)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(match_id)
            .bind(seat.user_id)
            .bind(seat.diamond_bet)
            .bind(position)
            .execute(&mut *tx)
            .await?;

            players.push(MatchPlayer {
                user_id: seat.user_id,
                username: seat.username,
                diamond_bet: seat.diamond_bet,
                position,
                final_position: None,
                diamond_change: None,
            });
        }

        set_table_status(&mut tx, table_id, TableStatus::InGame).await?;
        tx.commit().await?;

        log::info!(
            "Match {} started at table {} by user {}",
            match_id,
            table_id,
            requester
        );

        Ok(StartedMatch {
            match_id,
            table_id,
            started_at,
            players,
        })
    }

    /// Settle a match and hand its table back for reuse.
    ///
    /// Applies every player's diamond change through the ledger, records
    /// final positions, bumps wins and losses, clears the table's seats and
    /// returns it to `waiting`. All of it commits together or not at all.
    ///
    /// # Errors
    ///
    /// * `GameError::MatchNotFound` - No such match
    /// * `GameError::InvalidState` - Match already finished
    /// * `GameError::Forbidden` - Requester did not play in the match
    /// * `GameError::InvalidInput` - Unknown winner, wrong number of results,
    ///   a duplicate entry, a loss larger than the player's bet, or a win the
    ///   balance cannot hold
    /// * `GameError::InsufficientFunds` - A loss would take a balance below zero
    pub async fn finish_match(
        &self,
        requester: UserId,
        match_id: MatchId,
        winner: UserId,
        results: &[PlayerResult],
    ) -> GameResult<FinishedMatch> {
        with_transaction_timeout(self.run_finish(requester, match_id, winner, results)).await
    }

    async fn run_finish(
        &self,
        requester: UserId,
        match_id: MatchId,
        winner: UserId,
        results: &[PlayerResult],
    ) -> GameResult<FinishedMatch> {
        let mut tx = self.pool.begin().await?;

        let header = sqlx::query_as::<_, Match>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 FOR UPDATE"
        ))
        .bind(match_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(GameError::MatchNotFound(match_id))?;

        let players = fetch_players(&mut *tx, match_id).await?;
        let planned = settlement::plan_settlement(&header, &players, requester, winner, results)?;

        let table = lock_table(&mut tx, header.table_id).await?;

        let participant_ids: Vec<UserId> = players.iter().map(|p| p.user_id).collect();
        let balances = lock_balances(&mut tx, &participant_ids).await?;
        settlement::check_payouts(&planned, &balances)?;

        sqlx::query("UPDATE matches SET status = $1, finished_at = NOW() WHERE id = $2")
            .bind(MatchStatus::Finished.as_str())
            .bind(match_id)
            .execute(&mut *tx)
            .await?;

        let mut settlements = Vec::with_capacity(planned.len());
        for result in &planned {
            let delta = LedgerDelta::for_match(result.user_id, result.diamond_change, &table.name);
            let balance_after = match delta {
                Some(delta) => self.ledger.apply_delta(&mut tx, &delta).await?.balance_after,
                None => {
                    sqlx::query_scalar("SELECT diamonds FROM users WHERE id = $1")
                        .bind(result.user_id)
                        .fetch_one(&mut *tx)
                        .await?
                }
            };

            sqlx::query(
                "UPDATE match_players SET final_position = $1, diamond_change = $2
                 WHERE match_id = $3 AND user_id = $4",
            )
            .bind(result.position)
            .bind(result.diamond_change)
            .bind(match_id)
            .bind(result.user_id)
            .execute(&mut *tx)
            .await?;

            settlements.push(Settlement {
                user_id: result.user_id,
                diamond_change: result.diamond_change,
                final_position: result.position,
                balance_after,
            });
        }

        sqlx::query("UPDATE users SET wins = wins + 1, updated_at = NOW() WHERE id = $1")
            .bind(winner)
            .execute(&mut *tx)
            .await?;
        let losers: Vec<UserId> = participant_ids.into_iter().filter(|&id| id != winner).collect();
        sqlx::query("UPDATE users SET losses = losses + 1, updated_at = NOW() WHERE id = ANY($1)")
            .bind(&losers)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM table_players WHERE table_id = $1")
            .bind(header.table_id)
            .execute(&mut *tx)
            .await?;
        set_table_status(&mut tx, header.table_id, TableStatus::Waiting).await?;

        tx.commit().await?;

        log::info!(
            "Match {} finished at table {}, winner {}, {} settlements",
            match_id,
            header.table_id,
            winner,
            settlements.len()
        );

        Ok(FinishedMatch {
            match_id,
            table_id: header.table_id,
            winner_user_id: winner,
            settlements,
        })
    }

    /// Match header and players in position order
    pub async fn get_match(&self, match_id: MatchId) -> GameResult<MatchView> {
        let header = sqlx::query_as::<_, Match>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"
        ))
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GameError::MatchNotFound(match_id))?;

        let players = fetch_players(&self.pool, match_id).await?;

        Ok(MatchView { header, players })
    }
}

async fn fetch_players<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: MatchId,
) -> Result<Vec<MatchPlayer>, sqlx::Error> {
    sqlx::query_as::<_, MatchPlayer>(
        "SELECT mp.user_id, u.username, mp.diamond_bet, mp.position,
                mp.final_position, mp.diamond_change
         FROM match_players mp
         JOIN users u ON u.id = mp.user_id
         WHERE mp.match_id = $1
         ORDER BY mp.position",
    )
    .bind(match_id)
    .fetch_all(executor)
    .await
}

/// Lock user rows in ascending id order and read their balances
async fn lock_balances(
    tx: &mut Transaction<'_, Postgres>,
    user_ids: &[UserId],
) -> GameResult<Vec<(UserId, i64)>> {
    let balances = sqlx::query_as::<_, (UserId, i64)>(
        "SELECT id, diamonds FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(user_ids)
    .fetch_all(&mut **tx)
    .await?;

    Ok(balances)
}

async fn set_table_status(
    tx: &mut Transaction<'_, Postgres>,
    table_id: TableId,
    status: TableStatus,
) -> GameResult<()> {
    sqlx::query("UPDATE tables SET status = $1 WHERE id = $2")
        .bind(status.as_str())
        .bind(table_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
