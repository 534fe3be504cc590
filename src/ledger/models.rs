//! Ledger rows and transfer request/result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::TransferError;

/// Account row. `balance` always equals the sum of the account's entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Account {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "alice")]
    pub owner: String,
    #[schema(example = 1000)]
    pub balance: i64,
    #[schema(example = "USD")]
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Immutable balance-affecting event for one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Entry {
    pub id: i64,
    pub account_id: i64,
    /// Signed: negative for debits
    #[schema(example = -10)]
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Immutable record of one money movement, backed by exactly two entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Transfer {
    pub id: i64,
    pub from_account_id: i64,
    pub to_account_id: i64,
    #[schema(example = 10)]
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Transfer request accepted by [`TransferEngine::execute`](super::TransferEngine::execute)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferParams {
    pub from_account_id: i64,
    pub to_account_id: i64,
    pub amount: i64,
}

impl TransferParams {
    pub fn new(from_account_id: i64, to_account_id: i64, amount: i64) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    /// Reject requests that must never reach the store.
    ///
    /// Self-transfers are refused here rather than treated as a no-op.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.amount <= 0 {
            return Err(TransferError::InvalidTransfer(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        if self.from_account_id == self.to_account_id {
            return Err(TransferError::InvalidTransfer(format!(
                "cannot transfer from account {} to itself",
                self.from_account_id
            )));
        }
        Ok(())
    }

    /// Balance increments in lock order: `(account_id, delta)`, lower id first.
    ///
    /// Every transfer touching the same pair of accounts locks them in the
    /// same order regardless of direction.
    pub fn balance_updates(&self) -> [(i64, i64); 2] {
        let debit = (self.from_account_id, -self.amount);
        let credit = (self.to_account_id, self.amount);
        if debit.0 < credit.0 {
            [debit, credit]
        } else {
            [credit, debit]
        }
    }
}

/// Everything a committed transfer produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_entry: Entry,
    pub to_entry: Entry,
    /// Post-transfer snapshot of the source account
    pub from_account: Account,
    /// Post-transfer snapshot of the destination account
    pub to_account: Account,
}

/// Outcome of setting an account balance through the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BalanceAdjustment {
    /// Account after the adjustment
    pub account: Account,
    /// Entry recording the difference; absent when the balance was unchanged
    pub entry: Option<Entry>,
}
