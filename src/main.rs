//! Ledger Bank server
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌────────────────┐    ┌────────────┐
//! │  Config  │───▶│ Gateway  │───▶│ TransferEngine │───▶│ PostgreSQL │
//! │  (YAML)  │    │  (axum)  │    │  (one tx/call) │    │            │
//! └──────────┘    └──────────┘    └────────────────┘    └────────────┘
//! ```
//!
//! Usage: `ledger_bank [--env <name>] [--port <port>]`

use std::sync::Arc;

use anyhow::{Context, Result};

use ledger_bank::config::AppConfig;
use ledger_bank::db::Database;
use ledger_bank::gateway::{self, state::AppState};
use ledger_bank::token;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    let _log_guard = ledger_bank::logging::init_logging(&app_config);

    tracing::info!(
        version = gateway::handlers::health::GIT_HASH,
        "Starting Ledger Bank in {} mode",
        env
    );

    let db = Database::connect(
        &app_config.postgres_url,
        app_config.postgres_max_connections,
    )
    .await
    .context("Failed to connect to PostgreSQL")?;
    db.migrate().await.context("Failed to run migrations")?;

    let token_maker = token::new_maker(app_config.token.maker, &app_config.token.symmetric_key)
        .context("Invalid token.symmetric_key")?;

    let state = Arc::new(AppState::new(
        db,
        token_maker,
        &app_config.token,
        &app_config.transfer,
    ));

    gateway::run_server(&app_config.gateway, state).await
}
