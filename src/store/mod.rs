// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Persistence port used by the engine.
//!
//! The engine never talks to a database directly. It reads through
//! [`DocumentStore`] and expresses every mutation as a [`Batch`] of
//! [`Write`]s that the adapter commits as one atomic unit. Balance changes
//! are always [`Write::IncrementBalance`], never a full overwrite.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{Account, RecurringTransaction, Transaction};

mod memory;
mod sqlite;

pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("\"{0}\" not found in store")]
    Missing(String),
    #[error("\"{0}\" already present in store")]
    Duplicate(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Equality filter over accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub owner_id: String,
    pub is_active: Option<bool>,
}

impl AccountFilter {
    pub fn owner(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            is_active: None,
        }
    }

    pub fn active(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            is_active: Some(true),
        }
    }
}

/// Equality filter over transactions. `account_id` matches either side.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub owner_id: String,
    pub account_id: Option<String>,
}

/// Profile fields of an account that may change after creation. Balance only
/// moves through [`Write::IncrementBalance`].
#[derive(Debug, Clone, PartialEq)]
pub struct AccountChanges {
    pub name: Option<String>,
    /// `Some(None)` clears the field.
    pub icon: Option<Option<String>>,
    pub color: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl AccountChanges {
    pub fn apply(&self, account: &mut Account) {
        if let Some(name) = &self.name {
            account.name = name.clone();
        }
        if let Some(icon) = &self.icon {
            account.icon = icon.clone();
        }
        if let Some(color) = &self.color {
            account.color = color.clone();
        }
        if let Some(active) = self.is_active {
            account.is_active = active;
        }
        account.updated_at = self.updated_at;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    InsertAccount(Account),
    UpdateAccount { id: String, changes: AccountChanges },
    IncrementBalance { account_id: String, delta: Decimal },
    InsertTransaction(Transaction),
    UpdateTransaction(Transaction),
    DeleteTransaction(String),
    InsertRecurring(RecurringTransaction),
    UpdateRecurring(RecurringTransaction),
    DeleteRecurring(String),
}

/// Ordered list of writes committed all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    writes: Vec<Write>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, write: Write) -> &mut Self {
        self.writes.push(write);
        self
    }

    /// Queue a balance increment. Zero deltas are dropped.
    pub fn increment(&mut self, account_id: &str, delta: Decimal) -> &mut Self {
        if !delta.is_zero() {
            self.writes.push(Write::IncrementBalance {
                account_id: account_id.to_string(),
                delta,
            });
        }
        self
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    /// Number of balance increments queued.
    pub fn increments(&self) -> usize {
        self.writes
            .iter()
            .filter(|w| matches!(w, Write::IncrementBalance { .. }))
            .count()
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

/// Minimal contract the engine needs from a document store.
pub trait DocumentStore {
    fn get_account(&self, id: &str) -> StoreResult<Option<Account>>;
    fn find_accounts(&self, filter: &AccountFilter) -> StoreResult<Vec<Account>>;
    fn get_transaction(&self, id: &str) -> StoreResult<Option<Transaction>>;
    fn find_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>>;
    fn get_recurring(&self, id: &str) -> StoreResult<Option<RecurringTransaction>>;
    fn find_recurring(&self, owner_id: &str) -> StoreResult<Vec<RecurringTransaction>>;
    /// Apply every write in `batch` or none of them.
    fn commit(&self, batch: Batch) -> StoreResult<()>;
}
