//! HTTP server for the w101 game backend.
//!
//! The binary in `main.rs` loads [`config::ServerConfig`], sets up logging
//! and metrics, connects to PostgreSQL and serves [`api::create_router`].
//! Everything is exposed as a library so integration tests can drive the
//! router directly.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
