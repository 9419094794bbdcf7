//! w101 game backend server.

use std::net::SocketAddr;

use anyhow::{Context, Error};
use log::info;
use pico_args::Arguments;
use w101::db::Database;
use w101_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};

const HELP: &str = "\
Run the w101 game backend

USAGE:
  w101_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND, PORT, or 0.0.0.0:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               JWT signing secret (required, 32+ chars)
  PASSWORD_PEPPER          Password hashing pepper (required, 16+ chars)
  METRICS_BIND             Prometheus exporter address (optional)
  RUST_LOG                 Log filter [default: info,sqlx=warn,hyper=warn]
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;

    logging::init();
    info!("Starting w101 server at {}", config.bind);

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(anyhow::Error::msg)?;
        info!("Prometheus metrics exported at http://{}/metrics", addr);
    }

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected successfully");

    if config.run_migrations {
        db.migrate().await.context("Failed to run migrations")?;
        info!("Migrations applied");
    }

    let app = api::create_router(AppState::from_config(db.pool().clone(), &config));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Resolves on Ctrl+C; if the handler cannot be installed, never resolves
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
