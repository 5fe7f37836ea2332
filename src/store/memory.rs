// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::{Account, RecurringTransaction, Transaction};

use super::{
    AccountFilter, Batch, DocumentStore, StoreError, StoreResult, TransactionFilter, Write,
};

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<String, Account>,
    transactions: BTreeMap<String, Transaction>,
    recurring: BTreeMap<String, RecurringTransaction>,
}

/// Prior value of one touched key; `None` means the key was absent.
#[derive(Debug)]
enum Undo {
    Account(String, Option<Account>),
    Transaction(String, Option<Transaction>),
    Recurring(String, Option<RecurringTransaction>),
}

fn restore<V>(table: &mut BTreeMap<String, V>, key: String, prior: Option<V>) {
    match prior {
        Some(value) => {
            table.insert(key, value);
        }
        None => {
            table.remove(&key);
        }
    }
}

impl Tables {
    /// Apply one write in place, returning how to undo it.
    fn apply(&mut self, write: Write) -> StoreResult<Undo> {
        let undo = match write {
            Write::InsertAccount(account) => {
                if self.accounts.contains_key(&account.id) {
                    return Err(StoreError::Duplicate(account.id));
                }
                let id = account.id.clone();
                self.accounts.insert(id.clone(), account);
                Undo::Account(id, None)
            }
            Write::UpdateAccount { id, changes } => {
                let account = self
                    .accounts
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::Missing(id.clone()))?;
                let prior = account.clone();
                changes.apply(account);
                Undo::Account(id, Some(prior))
            }
            Write::IncrementBalance { account_id, delta } => {
                let account = self
                    .accounts
                    .get_mut(&account_id)
                    .ok_or_else(|| StoreError::Missing(account_id.clone()))?;
                let current = account.current_balance.ok_or_else(|| {
                    StoreError::Corrupt(format!("account {} carries no balance", account_id))
                })?;
                let prior = account.clone();
                account.current_balance = Some(current + delta);
                Undo::Account(account_id, Some(prior))
            }
            Write::InsertTransaction(tx) => {
                if self.transactions.contains_key(&tx.id) {
                    return Err(StoreError::Duplicate(tx.id));
                }
                let id = tx.id.clone();
                self.transactions.insert(id.clone(), tx);
                Undo::Transaction(id, None)
            }
            Write::UpdateTransaction(tx) => {
                let id = tx.id.clone();
                let slot = self
                    .transactions
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::Missing(id.clone()))?;
                let prior = std::mem::replace(slot, tx);
                Undo::Transaction(id, Some(prior))
            }
            Write::DeleteTransaction(id) => {
                let prior = self
                    .transactions
                    .remove(&id)
                    .ok_or_else(|| StoreError::Missing(id.clone()))?;
                Undo::Transaction(id, Some(prior))
            }
            Write::InsertRecurring(rec) => {
                if self.recurring.contains_key(&rec.id) {
                    return Err(StoreError::Duplicate(rec.id));
                }
                let id = rec.id.clone();
                self.recurring.insert(id.clone(), rec);
                Undo::Recurring(id, None)
            }
            Write::UpdateRecurring(rec) => {
                let id = rec.id.clone();
                let slot = self
                    .recurring
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::Missing(id.clone()))?;
                let prior = std::mem::replace(slot, rec);
                Undo::Recurring(id, Some(prior))
            }
            Write::DeleteRecurring(id) => {
                let prior = self
                    .recurring
                    .remove(&id)
                    .ok_or_else(|| StoreError::Missing(id.clone()))?;
                Undo::Recurring(id, Some(prior))
            }
        };
        Ok(undo)
    }

    fn rollback(&mut self, log: Vec<Undo>) {
        for undo in log.into_iter().rev() {
            match undo {
                Undo::Account(id, prior) => restore(&mut self.accounts, id, prior),
                Undo::Transaction(id, prior) => restore(&mut self.transactions, id, prior),
                Undo::Recurring(id, prior) => restore(&mut self.recurring, id, prior),
            }
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    tables: Tables,
    fail_next_commit: bool,
    commits: usize,
}

/// In-process store. Writes apply in place with an undo log of the keys they
/// touch; a failing write rolls the batch back.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next [`DocumentStore::commit`] fail with
    /// [`StoreError::Unavailable`] without applying anything.
    pub fn fail_next_commit(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_next_commit = true;
        }
    }

    /// Number of batches committed successfully so far.
    pub fn commits(&self) -> usize {
        self.inner.lock().map(|inner| inner.commits).unwrap_or(0)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl DocumentStore for MemoryStore {
    fn get_account(&self, id: &str) -> StoreResult<Option<Account>> {
        Ok(self.lock()?.tables.accounts.get(id).cloned())
    }

    fn find_accounts(&self, filter: &AccountFilter) -> StoreResult<Vec<Account>> {
        let inner = self.lock()?;
        Ok(inner
            .tables
            .accounts
            .values()
            .filter(|a| a.owner_id == filter.owner_id)
            .filter(|a| filter.is_active.is_none_or(|active| a.is_active == active))
            .cloned()
            .collect())
    }

    fn get_transaction(&self, id: &str) -> StoreResult<Option<Transaction>> {
        Ok(self.lock()?.tables.transactions.get(id).cloned())
    }

    fn find_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
        let inner = self.lock()?;
        Ok(inner
            .tables
            .transactions
            .values()
            .filter(|t| t.owner_id == filter.owner_id)
            .filter(|t| {
                filter.account_id.as_deref().is_none_or(|acct| {
                    t.debit_account_id == acct || t.credit_account_id == acct
                })
            })
            .cloned()
            .collect())
    }

    fn get_recurring(&self, id: &str) -> StoreResult<Option<RecurringTransaction>> {
        Ok(self.lock()?.tables.recurring.get(id).cloned())
    }

    fn find_recurring(&self, owner_id: &str) -> StoreResult<Vec<RecurringTransaction>> {
        let inner = self.lock()?;
        Ok(inner
            .tables
            .recurring
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn commit(&self, batch: Batch) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if inner.fail_next_commit {
            inner.fail_next_commit = false;
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }
        let size = batch.len();
        let mut log = Vec::with_capacity(size);
        for write in batch.into_writes() {
            match inner.tables.apply(write) {
                Ok(undo) => log.push(undo),
                Err(err) => {
                    inner.tables.rollback(log);
                    return Err(err);
                }
            }
        }
        inner.commits += 1;
        tracing::trace!(writes = size, "memory batch committed");
        Ok(())
    }
}
