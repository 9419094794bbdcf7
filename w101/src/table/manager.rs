//! Table manager: table creation and seating.
//!
//! Seating decisions are made against a snapshot read under a `FOR UPDATE`
//! lock on the table row, so concurrent joins to the same table serialize and
//! capacity can never be exceeded. Funds checks then lock the user row and
//! count the bets the user already has riding at other tables, so a user's
//! total stake never exceeds their balance.

use super::{
    models::{
        CreateTableRequest, GameTable, Lobby, LobbyId, Seat, TABLE_CAPACITY, TableId,
        TableStatus, TableView,
    },
    rules,
};
use crate::auth::UserId;
use crate::db::timeouts::with_transaction_timeout;
use crate::errors::{GameError, GameResult};
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};

const TABLE_COLUMNS: &str = "id, lobby_id, name, min_bet, max_bet, status, created_at";

/// Table manager
#[derive(Clone)]
pub struct TableManager {
    pool: PgPool,
}

impl TableManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a table in `lobby_id` and seat its creator with the minimum bet
    ///
    /// # Errors
    ///
    /// * `GameError::InvalidRange` - `min_bet >= max_bet`
    /// * `GameError::LobbyNotFound` - No such lobby
    /// * `GameError::InsufficientFunds` - Creator is below the lobby's band or
    ///   cannot cover `min_bet` on top of their other seats
    /// * `GameError::Forbidden` - Creator is above the lobby's band
    pub async fn create_table(
        &self,
        owner_id: UserId,
        request: CreateTableRequest,
    ) -> GameResult<TableId> {
        rules::validate_bet_range(request.min_bet, request.max_bet)?;
        let name = rules::validate_table_name(&request.name)?.to_string();

        with_transaction_timeout(self.insert_table(
            owner_id,
            request.lobby_id,
            name,
            request.min_bet,
            request.max_bet,
        ))
        .await
    }

    async fn insert_table(
        &self,
        owner_id: UserId,
        lobby_id: LobbyId,
        name: String,
        min_bet: i64,
        max_bet: i64,
    ) -> GameResult<TableId> {
        let mut tx = self.pool.begin().await?;

        let lobby = fetch_lobby(&mut *tx, lobby_id).await?;

        let balance = lock_balance(&mut tx, owner_id).await?;
        rules::check_lobby_entry(&lobby, balance)?;
        let staked = staked_elsewhere(&mut tx, owner_id, None).await?;
        rules::check_create_funds(rules::unstaked(balance, staked), min_bet)?;

        let table_id: TableId = sqlx::query_scalar(
            "INSERT INTO tables (lobby_id, name, min_bet, max_bet, status)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id",
        )
        .bind(lobby_id)
        .bind(&name)
        .bind(min_bet)
        .bind(max_bet)
        .bind(TableStatus::Waiting.as_str())
        .fetch_one(&mut *tx)
        .await?;

        insert_seat(&mut tx, table_id, owner_id, min_bet).await?;
        tx.commit().await?;

        log::info!(
            "User {} created table {} '{}' ({}-{})",
            owner_id,
            table_id,
            name,
            min_bet,
            max_bet
        );

        Ok(table_id)
    }

    /// Seat `user_id` at a waiting table with the given bet.
    ///
    /// No diamonds move here; bets are settled when the match finishes. The
    /// bet must fit in what the user has not already staked at other tables.
    pub async fn join_table(
        &self,
        user_id: UserId,
        table_id: TableId,
        bet: i64,
    ) -> GameResult<Seat> {
        with_transaction_timeout(self.seat_player(user_id, table_id, bet)).await
    }

    async fn seat_player(&self, user_id: UserId, table_id: TableId, bet: i64) -> GameResult<Seat> {
        let mut tx = self.pool.begin().await?;

        let table = lock_table(&mut tx, table_id).await?;
        let lobby = fetch_lobby(&mut *tx, table.lobby_id).await?;
        let balance = lock_balance(&mut tx, user_id).await?;
        let staked = staked_elsewhere(&mut tx, user_id, Some(table_id)).await?;
        let seated = seated_ids(&fetch_seats(&mut *tx, table_id).await?);

        rules::check_join(&table, &seated, user_id, rules::unstaked(balance, staked), bet)?;
        rules::check_lobby_entry(&lobby, balance)?;

        let seat = insert_seat(&mut tx, table_id, user_id, bet).await?;
        tx.commit().await?;

        log::info!(
            "User {} joined table {} with bet {} ({}/{})",
            user_id,
            table_id,
            bet,
            seated.len() + 1,
            TABLE_CAPACITY
        );

        Ok(seat)
    }

    /// Give up a seat before the match starts
    pub async fn leave_table(&self, user_id: UserId, table_id: TableId) -> GameResult<()> {
        with_transaction_timeout(self.unseat_player(user_id, table_id)).await
    }

    async fn unseat_player(&self, user_id: UserId, table_id: TableId) -> GameResult<()> {
        let mut tx = self.pool.begin().await?;

        let table = lock_table(&mut tx, table_id).await?;
        let seated = seated_ids(&fetch_seats(&mut *tx, table_id).await?);
        rules::check_leave(&table, &seated, user_id)?;

        sqlx::query("DELETE FROM table_players WHERE table_id = $1 AND user_id = $2")
            .bind(table_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        log::info!("User {} left table {}", user_id, table_id);
        Ok(())
    }

    /// Every lobby, cheapest entry first
    pub async fn list_lobbies(&self) -> GameResult<Vec<Lobby>> {
        let lobbies = sqlx::query_as::<_, Lobby>(
            "SELECT id, name, min_diamonds, max_diamonds
             FROM lobbies
             ORDER BY min_diamonds, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(lobbies)
    }

    /// Table with its seats in join order
    pub async fn get_table(&self, table_id: TableId) -> GameResult<TableView> {
        let table = sqlx::query_as::<_, GameTable>(&format!(
            "SELECT {TABLE_COLUMNS} FROM tables WHERE id = $1"
        ))
        .bind(table_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GameError::TableNotFound(table_id))?;

        let seats = fetch_seats(&self.pool, table_id).await?;

        Ok(TableView {
            table,
            seats,
            capacity: TABLE_CAPACITY,
        })
    }
}

/// Load a table row and hold its lock until the transaction ends
pub(crate) async fn lock_table(
    tx: &mut Transaction<'_, Postgres>,
    table_id: TableId,
) -> GameResult<GameTable> {
    sqlx::query_as::<_, GameTable>(&format!(
        "SELECT {TABLE_COLUMNS} FROM tables WHERE id = $1 FOR UPDATE"
    ))
    .bind(table_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(GameError::TableNotFound(table_id))
}

/// Seats in join order
pub(crate) async fn fetch_seats<'e, E: PgExecutor<'e>>(
    executor: E,
    table_id: TableId,
) -> Result<Vec<Seat>, sqlx::Error> {
    sqlx::query_as::<_, Seat>(
        "SELECT tp.user_id, u.username, tp.diamond_bet, tp.joined_at
         FROM table_players tp
         JOIN users u ON u.id = tp.user_id
         WHERE tp.table_id = $1
         ORDER BY tp.joined_at, tp.id",
    )
    .bind(table_id)
    .fetch_all(executor)
    .await
}

async fn fetch_lobby<'e, E: PgExecutor<'e>>(
    executor: E,
    lobby_id: LobbyId,
) -> GameResult<Lobby> {
    sqlx::query_as::<_, Lobby>(
        "SELECT id, name, min_diamonds, max_diamonds FROM lobbies WHERE id = $1",
    )
    .bind(lobby_id)
    .fetch_optional(executor)
    .await?
    .ok_or(GameError::LobbyNotFound(lobby_id))
}

/// Sum of the user's bets on seats at tables other than `except`.
///
/// Seats are removed when their match settles, so every remaining seat is a
/// bet that may still be lost. Callers hold the user's row lock.
pub(crate) async fn staked_elsewhere(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
    except: Option<TableId>,
) -> GameResult<i64> {
    let staked: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(diamond_bet), 0)::BIGINT
         FROM table_players
         WHERE user_id = $1 AND ($2::BIGINT IS NULL OR table_id <> $2)",
    )
    .bind(user_id)
    .bind(except)
    .fetch_one(&mut **tx)
    .await?;

    Ok(staked)
}

fn seated_ids(seats: &[Seat]) -> Vec<UserId> {
    seats.iter().map(|s| s.user_id).collect()
}

async fn lock_balance(tx: &mut Transaction<'_, Postgres>, user_id: UserId) -> GameResult<i64> {
    sqlx::query_scalar("SELECT diamonds FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(GameError::UserNotFound(user_id))
}

async fn insert_seat(
    tx: &mut Transaction<'_, Postgres>,
    table_id: TableId,
    user_id: UserId,
    bet: i64,
) -> GameResult<Seat> {
    let seat = sqlx::query_as::<_, Seat>(
        "WITH seat AS (
             INSERT INTO table_players (table_id, user_id, diamond_bet)
             VALUES ($1, $2, $3)
             RETURNING user_id, diamond_bet, joined_at
         )
         SELECT seat.user_id, u.username, seat.diamond_bet, seat.joined_at
         FROM seat JOIN users u ON u.id = seat.user_id",
    )
    .bind(table_id)
    .bind(user_id)
    .bind(bet)
    .fetch_one(&mut **tx)
    .await?;

    Ok(seat)
}
