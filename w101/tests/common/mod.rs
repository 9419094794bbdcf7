//! Shared fixtures for the database-backed integration tests.
//!
//! Tests connect to `DATABASE_URL` and apply migrations. When the variable is
//! unset they print a notice and return early so the suite still runs on
//! machines without PostgreSQL.

#![allow(dead_code)]

use sqlx::PgPool;
use std::sync::Arc;
use w101::auth::{AuthManager, RegisterRequest, TokenService, UserId};
use w101::db::{Database, DatabaseConfig, PgUserRepository};
use w101::ledger::{DiamondLedger, RewardConfig, RewardManager, StoreManager};
use w101::matches::{MatchManager, PlayerResult};
use w101::profile::ProfileManager;
use w101::table::{CreateTableRequest, LobbyId, TableId, TableManager};

pub const STARTING_DIAMONDS: i64 = 1_000;

pub struct TestEnv {
    pub pool: PgPool,
    pub auth: AuthManager,
    pub tables: TableManager,
    pub matches: MatchManager,
    pub ledger: DiamondLedger,
    pub rewards: RewardManager,
    pub store: StoreManager,
    pub profiles: ProfileManager,
}

/// Connect, migrate and build every manager, or `None` without a database
pub async fn setup() -> Option<TestEnv> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database test");
        return None;
    };

    let mut config = DatabaseConfig::with_url(database_url);
    config.max_connections = 5;
    config.min_connections = 1;

    let db = Database::new(&config)
        .await
        .expect("Failed to create test database");
    db.migrate().await.expect("Failed to run migrations");

    let pool = db.pool().clone();
    let users = Arc::new(PgUserRepository::new(pool.clone()));
    let ledger = DiamondLedger::new(pool.clone());

    Some(TestEnv {
        auth: AuthManager::new(
            users.clone(),
            TokenService::new("integration-test-secret-0123456789", "w101", "w101-clients", 1),
            "test_pepper".to_string(),
            STARTING_DIAMONDS,
        ),
        tables: TableManager::new(pool.clone()),
        matches: MatchManager::new(pool.clone(), ledger.clone()),
        rewards: RewardManager::new(pool.clone(), ledger.clone(), RewardConfig::default()),
        store: StoreManager::new(pool.clone(), ledger.clone()),
        profiles: ProfileManager::new(users),
        ledger,
        pool,
    })
}

fn unique(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &id[..12])
}

impl TestEnv {
    /// Register a throwaway player holding `diamonds`
    pub async fn player(&self, diamonds: i64) -> UserId {
        let response = self
            .auth
            .register(RegisterRequest {
                username: unique("p"),
                email: None,
                password: "secret123".to_string(),
            })
            .await
            .expect("register");

        // Rebase the registration grant so the ledger still reconciles
        sqlx::query("UPDATE users SET diamonds = $1, opening_diamonds = $1 WHERE id = $2")
            .bind(diamonds)
            .bind(response.user_id)
            .execute(&self.pool)
            .await
            .expect("set balance");

        response.user_id
    }

    pub async fn lobby(&self) -> LobbyId {
        sqlx::query_scalar("INSERT INTO lobbies (name) VALUES ($1) RETURNING id")
            .bind(unique("lobby"))
            .fetch_one(&self.pool)
            .await
            .expect("create lobby")
    }

    pub async fn table(&self, owner: UserId, min_bet: i64, max_bet: i64) -> TableId {
        let lobby_id = self.lobby().await;
        self.tables
            .create_table(
                owner,
                CreateTableRequest {
                    lobby_id,
                    name: unique("table"),
                    min_bet,
                    max_bet,
                },
            )
            .await
            .expect("create table")
    }

    /// A table with four seated players whose bets are 10, 20, 30 and 40
    pub async fn full_table(&self) -> (TableId, [UserId; 4]) {
        let players = [
            self.player(500).await,
            self.player(500).await,
            self.player(500).await,
            self.player(500).await,
        ];
        let table_id = self.table(players[0], 10, 100).await;
        for (user_id, bet) in players[1..].iter().zip([20, 30, 40]) {
            self.tables
                .join_table(*user_id, table_id, bet)
                .await
                .expect("join table");
        }
        (table_id, players)
    }

    pub async fn balance(&self, user_id: UserId) -> i64 {
        self.ledger.balance(user_id).await.expect("balance")
    }

    pub async fn ledger_rows(&self, user_id: UserId) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM diamond_transactions WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .expect("count ledger rows")
    }
}

pub fn result(user_id: UserId, diamond_change: i64, position: i32) -> PlayerResult {
    PlayerResult {
        user_id,
        diamond_change,
        position,
    }
}
