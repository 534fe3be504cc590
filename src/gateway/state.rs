use std::sync::Arc;
use std::time::Duration;

use crate::config::{TokenConfig, TransferConfig};
use crate::db::Database;
use crate::ledger::{LedgerQueries, PgLedgerStore, TransferEngine};
use crate::token::TokenMaker;

/// Shared gateway state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Single-statement account/entry/transfer queries
    pub queries: LedgerQueries,
    /// Transfer engine over the same pool
    pub engine: TransferEngine,
    pub token_maker: Arc<dyn TokenMaker>,
    pub access_token_duration: chrono::Duration,
    pub refresh_token_duration: chrono::Duration,
    /// Deadline applied to every transfer call
    pub transfer_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(
        db: Database,
        token_maker: Arc<dyn TokenMaker>,
        token: &TokenConfig,
        transfer: &TransferConfig,
    ) -> Self {
        let pool = db.pool().clone();
        Self {
            queries: LedgerQueries::new(pool.clone()),
            engine: TransferEngine::new(Arc::new(PgLedgerStore::new(pool))),
            db,
            token_maker,
            access_token_duration: secs(token.access_token_duration_secs),
            refresh_token_duration: secs(token.refresh_token_duration_secs),
            transfer_timeout: transfer.timeout(),
        }
    }
}

fn secs(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}
