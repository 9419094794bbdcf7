//! Player profile and stats.

use crate::auth::{User, UserId};
use crate::db::UserRepository;
use crate::errors::{GameError, GameResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

const MAX_DISPLAY_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user_id: UserId,
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub level: i32,
    pub diamonds: i64,
    pub wins: i32,
    pub losses: i32,
    pub total_matches: i32,
    /// Percentage of matches won, rounded to two decimals
    pub win_rate: f64,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            total_matches: user.wins + user.losses,
            win_rate: win_rate(user.wins, user.losses),
            username: user.username,
            display_name: user.display_name,
            email: user.email,
            level: user.level,
            diamonds: user.diamonds,
            wins: user.wins,
            losses: user.losses,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

/// Win percentage, 0 when no matches have been played
pub fn win_rate(wins: i32, losses: i32) -> f64 {
    let total = i64::from(wins) + i64::from(losses);
    if total <= 0 {
        return 0.0;
    }
    let pct = f64::from(wins) * 100.0 / total as f64;
    (pct * 100.0).round() / 100.0
}

#[derive(Clone)]
pub struct ProfileManager {
    users: Arc<dyn UserRepository>,
}

impl ProfileManager {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn profile(&self, user_id: UserId) -> GameResult<Profile> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(Profile::from)
            .ok_or(GameError::UserNotFound(user_id))
    }

    /// Change the display name, returning the updated profile
    pub async fn update_display_name(
        &self,
        user_id: UserId,
        display_name: &str,
    ) -> GameResult<Profile> {
        let trimmed = display_name.trim();
        let len = trimmed.chars().count();
        if len == 0 || len > MAX_DISPLAY_NAME_CHARS {
            return Err(GameError::InvalidInput(format!(
                "Display name must be 1-{MAX_DISPLAY_NAME_CHARS} characters"
            )));
        }

        if !self.users.update_display_name(user_id, trimmed).await? {
            return Err(GameError::UserNotFound(user_id));
        }

        self.profile(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::mock::MockUserRepository;

    fn user(id: UserId, wins: i32, losses: i32) -> User {
        User {
            id,
            username: format!("player{id}"),
            email: None,
            display_name: format!("player{id}"),
            level: 3,
            diamonds: 250,
            wins,
            losses,
            last_login: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_win_rate() {
        assert_eq!(win_rate(0, 0), 0.0);
        assert_eq!(win_rate(1, 0), 100.0);
        assert_eq!(win_rate(1, 2), 33.33);
        assert_eq!(win_rate(2, 1), 66.67);
    }

    #[tokio::test]
    async fn test_profile_stats() {
        let repo = MockUserRepository::new().with_user(user(1, 3, 1));
        let profiles = ProfileManager::new(Arc::new(repo));

        let profile = profiles.profile(1).await.unwrap();
        assert_eq!(profile.total_matches, 4);
        assert_eq!(profile.win_rate, 75.0);
        assert_eq!(profile.diamonds, 250);

        assert!(matches!(
            profiles.profile(2).await,
            Err(GameError::UserNotFound(2))
        ));
    }

    #[tokio::test]
    async fn test_update_display_name() {
        let repo = MockUserRepository::new().with_user(user(1, 0, 0));
        let profiles = ProfileManager::new(Arc::new(repo));

        let updated = profiles.update_display_name(1, "  Word Wizard ").await.unwrap();
        assert_eq!(updated.display_name, "Word Wizard");

        assert!(matches!(
            profiles.update_display_name(1, "   ").await,
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            profiles.update_display_name(1, &"x".repeat(101)).await,
            Err(GameError::InvalidInput(_))
        ));
        assert!(matches!(
            profiles.update_display_name(9, "ghost").await,
            Err(GameError::UserNotFound(9))
        ));
    }
}
