//! Table and seat models.

use crate::auth::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Table ID type
pub type TableId = i64;

/// Lobby ID type
pub type LobbyId = i64;

/// Every match is played by exactly this many seated players
pub const TABLE_CAPACITY: usize = 4;

/// Table status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Open for seating; no match running
    Waiting,
    /// A match built from this table is active
    InGame,
}

impl TableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableStatus::Waiting => "waiting",
            TableStatus::InGame => "in_game",
        }
    }
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for TableStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "waiting" => Ok(TableStatus::Waiting),
            "in_game" => Ok(TableStatus::InGame),
            other => Err(format!("unknown table status '{other}'")),
        }
    }
}

/// A group of tables open to players within a diamond band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lobby {
    pub id: LobbyId,
    pub name: String,
    pub min_diamonds: i64,
    /// `None` means no upper limit
    pub max_diamonds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GameTable {
    pub id: TableId,
    pub lobby_id: LobbyId,
    pub name: String,
    pub min_bet: i64,
    pub max_bet: i64,
    #[sqlx(try_from = "String")]
    pub status: TableStatus,
    pub created_at: DateTime<Utc>,
}

/// A user's seat at a waiting table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Seat {
    pub user_id: UserId,
    pub username: String,
    pub diamond_bet: i64,
    pub joined_at: DateTime<Utc>,
}

/// A table together with its seats in join order
#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    #[serde(flatten)]
    pub table: GameTable,
    pub seats: Vec<Seat>,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTableRequest {
    pub lobby_id: LobbyId,
    pub name: String,
    pub min_bet: i64,
    pub max_bet: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinTableRequest {
    pub table_id: TableId,
    pub diamond_bet: i64,
}
