//! Lobby and table endpoints. Table routes require a bearer token.
//!
//! Join a table:
//! ```bash
//! curl -X POST http://localhost:8080/api/tables/join \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"table_id": 1, "diamond_bet": 25}'
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State, rejection::JsonRejection},
};
use serde::Serialize;
use w101::auth::UserId;
use w101::table::{CreateTableRequest, JoinTableRequest, Lobby, Seat, TableId, TableView};

use super::{
    AppState,
    error::{ApiResult, ok},
};

#[derive(Debug, Serialize)]
pub struct CreatedTable {
    pub table_id: TableId,
}

#[derive(Debug, Serialize)]
pub struct LeftTable {
    pub table_id: TableId,
}

/// Every lobby with its diamond band, cheapest first
pub async fn list_lobbies(State(state): State<AppState>) -> ApiResult<Vec<Lobby>> {
    Ok(ok(state.tables.list_lobbies().await?))
}

/// Open a table in a lobby; the creator takes the first seat at the minimum bet.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid name or bet range, or creator cannot cover the minimum bet
/// - `403 Forbidden`: Creator holds more diamonds than the lobby admits
/// - `404 Not Found`: Lobby doesn't exist
pub async fn create_table(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    payload: Result<Json<CreateTableRequest>, JsonRejection>,
) -> ApiResult<CreatedTable> {
    let Json(request) = payload?;
    let table_id = state.tables.create_table(user_id, request).await?;
    Ok(ok(CreatedTable { table_id }))
}

/// Take a seat with a bet inside the table's limits.
///
/// # Errors
///
/// - `400 Bad Request`: Table in game, bet out of range, or the bet does not fit in
///   what the caller has not already staked at other tables
/// - `403 Forbidden`: Caller holds more diamonds than the lobby admits
/// - `404 Not Found`: Table doesn't exist
/// - `409 Conflict`: Already seated or table full
pub async fn join_table(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    payload: Result<Json<JoinTableRequest>, JsonRejection>,
) -> ApiResult<Seat> {
    let Json(request) = payload?;
    let seat = state
        .tables
        .join_table(user_id, request.table_id, request.diamond_bet)
        .await?;
    Ok(ok(seat))
}

pub async fn leave_table(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Path(table_id): Path<TableId>,
) -> ApiResult<LeftTable> {
    state.tables.leave_table(user_id, table_id).await?;
    Ok(ok(LeftTable { table_id }))
}

pub async fn get_table(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
) -> ApiResult<TableView> {
    Ok(ok(state.tables.get_table(table_id).await?))
}
