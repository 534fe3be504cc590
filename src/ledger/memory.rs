//! In-process ledger store
//!
//! Same contract as the PostgreSQL store: each account row has its own async
//! lock, taken by `add_account_balance` and held until the transaction ends.
//! Writes are staged in the transaction and applied on commit, so a dropped
//! or rolled-back transaction leaves no trace. Ids are drawn from sequences
//! at insert time and are not reused after a rollback.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex as RowLock, OwnedMutexGuard};

use super::error::StoreError;
use super::models::{Account, Entry, Transfer};
use super::store::{LedgerStore, LedgerTx};

struct AccountRow {
    account: Account,
    lock: Arc<RowLock<()>>,
}

#[derive(Default)]
struct Tables {
    accounts: BTreeMap<i64, AccountRow>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<Tables>,
    account_seq: AtomicI64,
    entry_seq: AtomicI64,
    transfer_seq: AtomicI64,
}

impl Inner {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        // Commits mutate only after every check has passed, so a poisoned
        // lock still guards consistent tables.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn next_id(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::SeqCst) + 1
}

/// In-memory ledger store
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<Inner>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account outside any transfer.
    ///
    /// A non-zero opening balance is recorded as an entry so that the
    /// balance always equals the entry sum.
    pub fn create_account(
        &self,
        owner: &str,
        currency: &str,
        balance: i64,
    ) -> Result<Account, StoreError> {
        let mut tables = self.inner.tables();
        if tables
            .accounts
            .values()
            .any(|row| row.account.owner == owner && row.account.currency == currency)
        {
            return Err(StoreError::UniqueViolation(format!(
                "account for ({owner}, {currency}) already exists"
            )));
        }

        let now = Utc::now();
        let account = Account {
            id: next_id(&self.inner.account_seq),
            owner: owner.to_string(),
            balance,
            currency: currency.to_string(),
            created_at: now,
        };
        if balance != 0 {
            let entry = Entry {
                id: next_id(&self.inner.entry_seq),
                account_id: account.id,
                amount: balance,
                created_at: now,
            };
            tables.entries.push(entry);
        }
        tables.accounts.insert(
            account.id,
            AccountRow {
                account: account.clone(),
                lock: Arc::new(RowLock::new(())),
            },
        );
        Ok(account)
    }

    /// Committed state of an account
    pub fn account(&self, id: i64) -> Option<Account> {
        self.inner
            .tables()
            .accounts
            .get(&id)
            .map(|row| row.account.clone())
    }

    pub fn entries_for(&self, account_id: i64) -> Vec<Entry> {
        self.inner
            .tables()
            .entries
            .iter()
            .filter(|e| e.account_id == account_id)
            .cloned()
            .collect()
    }

    pub fn entry_sum(&self, account_id: i64) -> i64 {
        self.entries_for(account_id).iter().map(|e| e.amount).sum()
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.inner.tables().transfers.clone()
    }

    pub fn entry_count(&self) -> usize {
        self.inner.tables().entries.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        Ok(Box::new(MemoryLedgerTx {
            inner: self.inner.clone(),
            locks: BTreeMap::new(),
            deltas: BTreeMap::new(),
            entries: Vec::new(),
            transfers: Vec::new(),
        }))
    }
}

/// Open in-memory transaction. Row locks are released when it is dropped.
pub struct MemoryLedgerTx {
    inner: Arc<Inner>,
    locks: BTreeMap<i64, OwnedMutexGuard<()>>,
    deltas: BTreeMap<i64, i64>,
    entries: Vec<Entry>,
    transfers: Vec<Transfer>,
}

impl MemoryLedgerTx {
    /// Committed row plus this transaction's own uncommitted delta
    fn visible(&self, tables: &Tables, id: i64) -> Result<Option<Account>, StoreError> {
        let Some(row) = tables.accounts.get(&id) else {
            return Ok(None);
        };
        let mut account = row.account.clone();
        if let Some(delta) = self.deltas.get(&id) {
            account.balance = account
                .balance
                .checked_add(*delta)
                .ok_or(StoreError::Overflow(id))?;
        }
        Ok(Some(account))
    }

    fn require_account(&self, id: i64) -> Result<(), StoreError> {
        if self.inner.tables().accounts.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::ForeignKeyViolation(format!(
                "account {id} does not exist"
            )))
        }
    }
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn get_account(&mut self, id: i64) -> Result<Option<Account>, StoreError> {
        let tables = self.inner.tables();
        self.visible(&tables, id)
    }

    async fn add_account_balance(&mut self, id: i64, delta: i64) -> Result<Account, StoreError> {
        if !self.locks.contains_key(&id) {
            let lock = {
                let tables = self.inner.tables();
                let row = tables.accounts.get(&id).ok_or(StoreError::NotFound)?;
                row.lock.clone()
            };
            let guard = lock.lock_owned().await;
            self.locks.insert(id, guard);
        }

        let tables = self.inner.tables();
        let current = self.visible(&tables, id)?.ok_or(StoreError::NotFound)?;
        let balance = current
            .balance
            .checked_add(delta)
            .ok_or(StoreError::Overflow(id))?;
        drop(tables);

        let pending = self.deltas.entry(id).or_insert(0);
        *pending = pending.checked_add(delta).ok_or(StoreError::Overflow(id))?;

        Ok(Account { balance, ..current })
    }

    async fn create_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry, StoreError> {
        self.require_account(account_id)?;
        let entry = Entry {
            id: next_id(&self.inner.entry_seq),
            account_id,
            amount,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    async fn create_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer, StoreError> {
        self.require_account(from_account_id)?;
        self.require_account(to_account_id)?;
        let transfer = Transfer {
            id: next_id(&self.inner.transfer_seq),
            from_account_id,
            to_account_id,
            amount,
            created_at: Utc::now(),
        };
        self.transfers.push(transfer.clone());
        Ok(transfer)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut this = *self;
        let mut tables = this.inner.tables();

        let mut updated = Vec::with_capacity(this.deltas.len());
        for (&id, &delta) in &this.deltas {
            let row = tables.accounts.get(&id).ok_or(StoreError::NotFound)?;
            let balance = row
                .account
                .balance
                .checked_add(delta)
                .ok_or(StoreError::Overflow(id))?;
            updated.push((id, balance));
        }
        for (id, balance) in updated {
            if let Some(row) = tables.accounts.get_mut(&id) {
                row.account.balance = balance;
            }
        }
        tables.entries.append(&mut this.entries);
        tables.transfers.append(&mut this.transfers);
        drop(tables);

        // Row locks are released only after the new balances are visible
        this.locks.clear();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        drop(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_create_account_records_opening_entry() {
        let store = MemoryLedgerStore::new();
        let account = store.create_account("alice", "USD", 100).unwrap();

        assert!(account.id > 0);
        assert_eq!(store.entry_sum(account.id), 100);
        assert_eq!(store.entries_for(account.id).len(), 1);
    }

    #[tokio::test]
    async fn test_create_account_unique_per_owner_currency() {
        let store = MemoryLedgerStore::new();
        store.create_account("alice", "USD", 0).unwrap();

        assert!(matches!(
            store.create_account("alice", "USD", 0),
            Err(StoreError::UniqueViolation(_))
        ));
        assert!(store.create_account("alice", "EUR", 0).is_ok());
    }

    #[tokio::test]
    async fn test_uncommitted_writes_invisible_outside_tx() {
        let store = MemoryLedgerStore::new();
        let account = store.create_account("alice", "USD", 100).unwrap();

        let mut tx = store.begin().await.unwrap();
        let updated = tx.add_account_balance(account.id, 25).await.unwrap();
        assert_eq!(updated.balance, 125);
        tx.create_entry(account.id, 25).await.unwrap();

        // Own writes visible inside, committed state unchanged outside
        let inside = tx.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(inside.balance, 125);
        assert_eq!(store.account(account.id).unwrap().balance, 100);

        tx.commit().await.unwrap();
        assert_eq!(store.account(account.id).unwrap().balance, 125);
        assert_eq!(store.entry_sum(account.id), 125);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = MemoryLedgerStore::new();
        let a = store.create_account("alice", "USD", 100).unwrap();
        let b = store.create_account("bob", "USD", 100).unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.create_transfer(a.id, b.id, 10).await.unwrap();
        tx.add_account_balance(a.id, -10).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.account(a.id).unwrap().balance, 100);
        assert!(store.transfers().is_empty());
    }

    #[tokio::test]
    async fn test_missing_account() {
        let store = MemoryLedgerStore::new();
        let mut tx = store.begin().await.unwrap();

        assert!(tx.get_account(99).await.unwrap().is_none());
        assert!(matches!(
            tx.add_account_balance(99, 1).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            tx.create_entry(99, 1).await,
            Err(StoreError::ForeignKeyViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_overflow_rejected() {
        let store = MemoryLedgerStore::new();
        let account = store.create_account("alice", "USD", i64::MAX).unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(matches!(
            tx.add_account_balance(account.id, 1).await,
            Err(StoreError::Overflow(id)) if id == account.id
        ));
    }

    #[tokio::test]
    async fn test_row_lock_blocks_until_release() {
        let store = MemoryLedgerStore::new();
        let account = store.create_account("alice", "USD", 0).unwrap();

        let mut holder = store.begin().await.unwrap();
        holder.add_account_balance(account.id, 5).await.unwrap();

        let mut waiter = store.begin().await.unwrap();
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            waiter.add_account_balance(account.id, 1),
        )
        .await;
        assert!(blocked.is_err(), "second writer must wait for the row lock");

        holder.commit().await.unwrap();

        let updated = waiter.add_account_balance(account.id, 1).await.unwrap();
        assert_eq!(updated.balance, 6);
        waiter.commit().await.unwrap();
        assert_eq!(store.account(account.id).unwrap().balance, 6);
    }
}
