//! Ledger transfer engine
//!
//! Moves money between two accounts as one all-or-nothing unit of work.
//!
//! # Architecture
//!
//! ```text
//! handler ──▶ TransferEngine::execute ──▶ run_in_transaction ──▶ LedgerTx ──▶ PostgreSQL
//!                                                                    │
//!                                                        MemoryLedgerStore (tests)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Single Transaction**: the transfer row, both entries and both balance
//!    increments commit together or not at all
//! 2. **Lock Ordering**: balance rows are locked lower account id first, for
//!    every transfer, so two transfers can never wait on each other in a cycle
//! 3. **Relative Increment**: balances change by `balance + delta` under the
//!    row lock, never by writing back a value read earlier
//! 4. **No Retries**: failures surface to the caller; the engine never retries

pub mod engine;
pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod queries;
pub mod store;

// Re-exports for convenience
pub use engine::{CallContext, TransferEngine};
pub use error::{StoreError, TransferError};
pub use memory::MemoryLedgerStore;
pub use models::{
    Account, BalanceAdjustment, Entry, Transfer, TransferParams, TransferResult,
};
pub use postgres::PgLedgerStore;
pub use queries::LedgerQueries;
pub use store::{LedgerStore, LedgerTx, run_in_transaction};
