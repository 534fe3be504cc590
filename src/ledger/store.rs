//! Transactional store seam
//!
//! The engine talks to persistence only through these two traits. A
//! [`LedgerTx`] is one open database transaction; dropping it without
//! calling `commit` discards every write made through it.

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::warn;

use super::error::StoreError;
use super::models::{Account, Entry, Transfer};

/// One open transaction against the ledger store
#[async_trait]
pub trait LedgerTx: Send {
    /// Plain read, no row lock
    async fn get_account(&mut self, id: i64) -> Result<Option<Account>, StoreError>;

    /// `balance = balance + delta` under the account's row lock.
    ///
    /// The lock is held until the transaction ends. Returns the updated row,
    /// or `StoreError::NotFound` when the account does not exist.
    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, StoreError>;

    async fn create_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry, StoreError>;

    async fn create_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Source of ledger transactions
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;
}

/// Run `f` inside one transaction.
///
/// Commits when `f` returns `Ok`, rolls back when it returns `Err`. If `f`
/// panics or the returned future is dropped, the transaction is dropped
/// uncommitted and the store rolls it back.
pub async fn run_in_transaction<T, E, F>(store: &dyn LedgerStore, f: F) -> Result<T, E>
where
    F: for<'t> FnOnce(&'t mut dyn LedgerTx) -> BoxFuture<'t, Result<T, E>>,
    E: From<StoreError> + std::fmt::Display,
{
    let mut tx = store.begin().await?;
    let outcome = f(&mut *tx).await;

    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rb_err) = tx.rollback().await {
                warn!(error = %err, rollback_error = %rb_err, "Rollback failed");
            }
            Err(err)
        }
    }
}
