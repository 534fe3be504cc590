//! Transfer Engine
//!
//! Executes one transfer as a single transaction:
//!
//! ```text
//! BEGIN
//!   check both accounts exist
//!   INSERT transfer
//!   INSERT entry (from, -amount)
//!   INSERT entry (to,   +amount)
//!   UPDATE balance   ── lower account id first
//!   UPDATE balance   ── higher account id second
//! COMMIT
//! ```
//!
//! Any failure rolls the whole transaction back. Nothing is retried here.
//!
//! Setting a balance directly goes through the same seam: the row is locked
//! first, and the difference to the requested balance is written as an
//! entry, so the balance keeps matching the entry sum.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{StoreError, TransferError};
use super::models::{Account, BalanceAdjustment, TransferParams, TransferResult};
use super::store::{LedgerStore, LedgerTx, run_in_transaction};

/// Per-call context supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Correlation id attached to every log line of this call
    pub request_id: Uuid,
    /// Abort and roll back if the transfer has not committed by then
    pub timeout: Option<Duration>,
}

impl CallContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timeout: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Transfer engine. Holds no mutable state; clones share the store.
#[derive(Clone)]
pub struct TransferEngine {
    store: Arc<dyn LedgerStore>,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Move `params.amount` from `params.from_account_id` to
    /// `params.to_account_id`.
    ///
    /// # Errors
    /// - `InvalidTransfer`: non-positive amount or identical accounts;
    ///   rejected before any transaction is opened
    /// - `AccountNotFound`: either account does not exist
    /// - `Persistence`: the store failed; nothing was committed
    /// - `Cancelled`: `ctx.timeout` elapsed; the transaction was rolled back
    ///
    /// Dropping the returned future before it completes also rolls back.
    pub async fn execute(
        &self,
        ctx: &CallContext,
        params: TransferParams,
    ) -> Result<TransferResult, TransferError> {
        params.validate()?;

        let request_id = ctx.request_id;
        debug!(
            request_id = %request_id,
            from = params.from_account_id,
            to = params.to_account_id,
            amount = params.amount,
            "Transfer started"
        );

        let work = run_in_transaction(self.store.as_ref(), move |tx| {
            Box::pin(transfer_tx(tx, request_id, params))
        });

        let outcome = within_deadline(ctx, work).await;

        match &outcome {
            Ok(result) => info!(
                request_id = %request_id,
                transfer_id = result.transfer.id,
                from = params.from_account_id,
                to = params.to_account_id,
                amount = params.amount,
                "Transfer committed"
            ),
            Err(e) => warn!(
                request_id = %request_id,
                from = params.from_account_id,
                to = params.to_account_id,
                amount = params.amount,
                code = e.code(),
                retryable = e.is_retryable(),
                error = %e,
                "Transfer rolled back"
            ),
        }

        outcome
    }

    /// Set `account_id`'s balance to `balance`, recording the difference as
    /// an entry in the same transaction.
    ///
    /// # Errors
    /// - `AccountNotFound`: the account does not exist
    /// - `Persistence`: the store failed or the difference overflows
    /// - `Cancelled`: `ctx.timeout` elapsed; the transaction was rolled back
    pub async fn adjust_balance(
        &self,
        ctx: &CallContext,
        account_id: i64,
        balance: i64,
    ) -> Result<BalanceAdjustment, TransferError> {
        let request_id = ctx.request_id;
        let work = run_in_transaction(self.store.as_ref(), move |tx| {
            Box::pin(adjust_tx(tx, account_id, balance))
        });

        let outcome = within_deadline(ctx, work).await;
        match &outcome {
            Ok(adjustment) => info!(
                request_id = %request_id,
                account_id,
                balance,
                delta = adjustment.entry.as_ref().map(|e| e.amount).unwrap_or(0),
                "Balance adjusted"
            ),
            Err(e) => warn!(
                request_id = %request_id,
                account_id,
                balance,
                code = e.code(),
                retryable = e.is_retryable(),
                error = %e,
                "Balance adjustment rolled back"
            ),
        }

        outcome
    }
}

/// Apply `ctx.timeout` to `work`. Timing out drops `work`, and with it the
/// open transaction.
async fn within_deadline<T>(
    ctx: &CallContext,
    work: impl Future<Output = Result<T, TransferError>>,
) -> Result<T, TransferError> {
    match ctx.timeout {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .unwrap_or(Err(TransferError::Cancelled)),
        None => work.await,
    }
}

/// Body of the balance adjustment transaction
async fn adjust_tx(
    tx: &mut dyn LedgerTx,
    account_id: i64,
    balance: i64,
) -> Result<BalanceAdjustment, TransferError> {
    // A zero increment takes the row lock and returns the current balance
    let current = tx
        .add_account_balance(account_id, 0)
        .await
        .map_err(|e| account_error(e, account_id))?;
    let delta = balance
        .checked_sub(current.balance)
        .ok_or(TransferError::Persistence(StoreError::Overflow(account_id)))?;
    if delta == 0 {
        return Ok(BalanceAdjustment {
            account: current,
            entry: None,
        });
    }

    let entry = tx
        .create_entry(account_id, delta)
        .await
        .map_err(|e| account_error(e, account_id))?;
    let account = tx
        .add_account_balance(account_id, delta)
        .await
        .map_err(|e| account_error(e, account_id))?;

    Ok(BalanceAdjustment {
        account,
        entry: Some(entry),
    })
}

/// Body of the transfer transaction
async fn transfer_tx(
    tx: &mut dyn LedgerTx,
    request_id: Uuid,
    params: TransferParams,
) -> Result<TransferResult, TransferError> {
    let TransferParams {
        from_account_id,
        to_account_id,
        amount,
    } = params;

    for id in [from_account_id, to_account_id] {
        if tx.get_account(id).await?.is_none() {
            return Err(TransferError::AccountNotFound(id));
        }
    }

    let transfer = tx
        .create_transfer(from_account_id, to_account_id, amount)
        .await
        .map_err(|e| transfer_error(e, from_account_id, to_account_id))?;
    let from_entry = tx
        .create_entry(from_account_id, -amount)
        .await
        .map_err(|e| account_error(e, from_account_id))?;
    let to_entry = tx
        .create_entry(to_account_id, amount)
        .await
        .map_err(|e| account_error(e, to_account_id))?;
    debug!(
        request_id = %request_id,
        transfer_id = transfer.id,
        "Transfer and entries inserted"
    );

    let mut from_account: Option<Account> = None;
    let mut to_account: Option<Account> = None;
    for (account_id, delta) in params.balance_updates() {
        let updated = tx
            .add_account_balance(account_id, delta)
            .await
            .map_err(|e| account_error(e, account_id))?;
        debug!(
            request_id = %request_id,
            account_id,
            delta,
            balance = updated.balance,
            "Balance updated"
        );
        if account_id == from_account_id {
            from_account = Some(updated);
        } else {
            to_account = Some(updated);
        }
    }

    // balance_updates() yields exactly one update per side
    let from_account = from_account.ok_or(TransferError::AccountNotFound(from_account_id))?;
    let to_account = to_account.ok_or(TransferError::AccountNotFound(to_account_id))?;

    Ok(TransferResult {
        transfer,
        from_entry,
        to_entry,
        from_account,
        to_account,
    })
}

/// A missing row or dangling foreign key for a known account id means the
/// account disappeared; anything else is a store failure.
fn account_error(err: StoreError, account_id: i64) -> TransferError {
    match err {
        StoreError::NotFound | StoreError::ForeignKeyViolation(_) => {
            TransferError::AccountNotFound(account_id)
        }
        other => TransferError::Persistence(other),
    }
}

/// Like [`account_error`] for the transfer row, which references both
/// accounts. PostgreSQL names the violated constraint in the message.
fn transfer_error(err: StoreError, from_account_id: i64, to_account_id: i64) -> TransferError {
    let account_id = match &err {
        StoreError::ForeignKeyViolation(msg) if msg.contains("to_account_id") => to_account_id,
        _ => from_account_id,
    };
    account_error(err, account_id)
}
