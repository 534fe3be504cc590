//! Ledger Bank - ledger-style banking backend
//!
//! The core is a transactional fund-transfer engine that moves money between
//! two accounts atomically, keeps every balance equal to the sum of its
//! entries, and never deadlocks under concurrent overlapping transfers.
//!
//! # Modules
//!
//! - [`ledger`] - Transfer engine, transactional store seam, PostgreSQL and
//!   in-memory stores, account/entry/transfer queries
//! - [`user`] - Users, sessions, password hashing, input validation
//! - [`token`] - Access and refresh tokens
//! - [`gateway`] - axum HTTP API
//! - [`db`] - Connection pool and migrations
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod token;
pub mod user;

// Convenient re-exports at crate root
pub use ledger::{
    CallContext, LedgerStore, LedgerTx, MemoryLedgerStore, PgLedgerStore, TransferEngine,
    TransferError, TransferParams, TransferResult,
};
