//! Match data models.

use crate::auth::UserId;
use crate::table::TableId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Match ID type
pub type MatchId = i64;

/// Match status. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Active,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Active => "active",
            MatchStatus::Finished => "finished",
        }
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MatchStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(MatchStatus::Active),
            "finished" => Ok(MatchStatus::Finished),
            other => Err(format!("unknown match status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Match {
    pub id: MatchId,
    pub table_id: TableId,
    #[sqlx(try_from = "String")]
    pub status: MatchStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// A participant, fixed when the match starts.
///
/// `position` is the seating ordinal (1-based, join order), not a ranking.
/// `final_position` and `diamond_change` are filled in at settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MatchPlayer {
    pub user_id: UserId,
    pub username: String,
    pub diamond_bet: i64,
    pub position: i32,
    pub final_position: Option<i32>,
    pub diamond_change: Option<i64>,
}

/// One player's outcome as reported by the finishing client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub user_id: UserId,
    pub diamond_change: i64,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinishMatchRequest {
    pub winner_user_id: UserId,
    pub results: Vec<PlayerResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedMatch {
    pub match_id: MatchId,
    pub table_id: TableId,
    pub started_at: DateTime<Utc>,
    pub players: Vec<MatchPlayer>,
}

/// What settlement did for one player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub user_id: UserId,
    pub diamond_change: i64,
    pub final_position: i32,
    pub balance_after: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinishedMatch {
    pub match_id: MatchId,
    pub table_id: TableId,
    pub winner_user_id: UserId,
    pub settlements: Vec<Settlement>,
}

/// A match with its players in position order
#[derive(Debug, Clone, Serialize)]
pub struct MatchView {
    #[serde(rename = "match")]
    pub header: Match,
    pub players: Vec<MatchPlayer>,
}
