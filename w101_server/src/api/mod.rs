//! HTTP API for the w101 game backend.
//!
//! # Endpoints Overview
//!
//! ## Public
//! - `GET /health` - Database ping
//! - `POST /api/auth/register` - Create an account
//! - `POST /api/auth/login` - Log in with username or email
//! - `GET /api/lobbies` - Lobbies and the diamond band each admits
//!
//! ## Tables (auth required)
//! - `POST /api/tables` - Create a table and take the first seat
//! - `GET /api/tables/{id}` - Table with its seats
//! - `POST /api/tables/join` - Take a seat
//! - `POST /api/tables/{id}/leave` - Give up a seat before the match starts
//!
//! ## Matches (auth required)
//! - `POST /api/matches/start/{table_id}` - Start a match from a full table
//! - `POST /api/matches/{id}/finish` - Settle a match
//! - `GET /api/matches/{id}` - Match with its players
//!
//! ## Diamonds, rewards, store, profile (auth required)
//! - `GET /api/diamonds/balance`, `GET /api/diamonds/history`, `GET /api/diamonds/reconcile`
//! - `POST /api/rewards/daily`, `POST /api/rewards/ad`, `GET /api/rewards/status`
//! - `POST /api/store/purchase/{item_id}`
//! - `GET /api/profile`, `PUT /api/profile`
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use w101_server::api::{AppState, create_router};
//! use w101_server::config::ServerConfig;
//! # async fn example(pool: sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env(None, None)?;
//! let app = create_router(AppState::from_config(pool, &config));
//!
//! let listener = tokio::net::TcpListener::bind(config.bind).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod diamonds;
pub mod error;
pub mod matches;
pub mod middleware;
pub mod profile;
pub mod request_id;
pub mod tables;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use w101::{
    auth::{AuthManager, TokenService},
    db::{PgUserRepository, UserRepository, timeouts::with_default_timeout},
    ledger::{DiamondLedger, RewardManager, StoreManager},
    matches::MatchManager,
    profile::ProfileManager,
    table::TableManager,
};

use crate::config::ServerConfig;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; every manager is a cheap handle over the same pool.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthManager>,
    pub tables: TableManager,
    pub matches: MatchManager,
    pub ledger: DiamondLedger,
    pub rewards: RewardManager,
    pub store: StoreManager,
    pub profiles: ProfileManager,
    pub pool: PgPool,
}

impl AppState {
    /// Wire every manager to `pool` using the loaded configuration.
    pub fn from_config(pool: PgPool, config: &ServerConfig) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(pool.clone()));
        let tokens = TokenService::new(
            &config.jwt.secret,
            &config.jwt.issuer,
            &config.jwt.audience,
            config.jwt.expiry_hours,
        );
        let ledger = DiamondLedger::new(pool.clone());

        Self {
            auth: Arc::new(AuthManager::new(
                users.clone(),
                tokens,
                config.password_pepper.clone(),
                config.starting_diamonds,
            )),
            tables: TableManager::new(pool.clone()),
            matches: MatchManager::new(pool.clone(), ledger.clone()),
            rewards: RewardManager::new(pool.clone(), ledger.clone(), config.rewards),
            store: StoreManager::new(pool.clone(), ledger.clone()),
            profiles: ProfileManager::new(users),
            ledger,
            pool,
        }
    }
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/lobbies", get(tables::list_lobbies));

    let protected_routes = Router::new()
        .route("/tables", post(tables::create_table))
        .route("/tables/join", post(tables::join_table))
        .route("/tables/{table_id}", get(tables::get_table))
        .route("/tables/{table_id}/leave", post(tables::leave_table))
        .route("/matches/start/{table_id}", post(matches::start_match))
        .route("/matches/{match_id}", get(matches::get_match))
        .route("/matches/{match_id}/finish", post(matches::finish_match))
        .route("/diamonds/balance", get(diamonds::balance))
        .route("/diamonds/history", get(diamonds::history))
        .route("/diamonds/reconcile", get(diamonds::reconcile))
        .route("/rewards/daily", post(diamonds::claim_daily))
        .route("/rewards/ad", post(diamonds::claim_ad))
        .route("/rewards/status", get(diamonds::reward_status))
        .route("/store/purchase/{item_id}", post(diamonds::purchase))
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", public_routes.merge(protected_routes))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `200` when the database answers within the query timeout, `503` otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = with_default_timeout(sqlx::query("SELECT 1").execute(&state.pool))
        .await
        .is_ok();

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
