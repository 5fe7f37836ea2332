// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Ledger transactions and the balances they move.
//!
//! Balances are maintained incrementally: every write carries the signed
//! deltas it causes, and edits or deletes first undo the exact effect the
//! stored transaction had. For every balance-bearing account this keeps
//!
//! ```text
//! current_balance == opening_balance + sum(effect of each referencing transaction)
//! ```
//!
//! All checks run before the batch is built, and the transaction record and
//! its balance increments are committed together.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, Transaction};
use crate::rules::{Side, effect, has_balance};
use crate::store::{Batch, DocumentStore, TransactionFilter, Write};
use crate::utils::{clean_tags, new_id, optional_text, parse_date, required_text, same_month};

/// How far into the future a transaction may be dated.
pub const FUTURE_HORIZON_DAYS: u64 = 365;

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: String,
    pub amount: Decimal,
    pub debit_account_id: String,
    pub credit_account_id: String,
    pub note: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Fields to change on an existing transaction; `None` keeps the stored value.
///
/// A blank `note` clears it. `tags` replace the stored list only when they
/// contain at least one non-blank entry.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub date: Option<String>,
    pub amount: Option<Decimal>,
    pub debit_account_id: Option<String>,
    pub credit_account_id: Option<String>,
    pub note: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub account_id: Option<String>,
    /// `YYYY-MM`
    pub month: Option<String>,
    pub limit: Option<usize>,
}

/// One amount moving from a credit account to a debit account.
#[derive(Debug, Clone, Copy)]
pub struct Posting<'a> {
    pub amount: Decimal,
    pub debit: &'a Account,
    pub credit: &'a Account,
}

impl Posting<'_> {
    /// Signed balance change on each side, debit first.
    pub fn effects(&self) -> [(&str, Decimal); 2] {
        [
            (
                self.debit.id.as_str(),
                effect(self.debit.account_type, self.amount, Side::Debit),
            ),
            (
                self.credit.id.as_str(),
                effect(self.credit.account_type, self.amount, Side::Credit),
            ),
        ]
    }
}

/// Per-account delta of replacing `before` with `after`: the reversal of the
/// old effect plus the new one. An account on both sides nets to the
/// difference only. Entries may be zero.
pub fn net_adjustments(before: &Posting<'_>, after: &Posting<'_>) -> BTreeMap<String, Decimal> {
    let mut net: BTreeMap<String, Decimal> = BTreeMap::new();
    for (id, delta) in before.effects() {
        *net.entry(id.to_string()).or_default() -= delta;
    }
    for (id, delta) in after.effects() {
        *net.entry(id.to_string()).or_default() += delta;
    }
    net
}

pub(crate) fn check_amount(amount: Decimal) -> LedgerResult<()> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidArgument(format!(
            "amount must be greater than zero, got {}",
            amount
        )));
    }
    Ok(())
}

pub(crate) fn check_distinct(debit_account_id: &str, credit_account_id: &str) -> LedgerResult<()> {
    if debit_account_id == credit_account_id {
        return Err(LedgerError::InvalidArgument(
            "debit and credit accounts must differ".to_string(),
        ));
    }
    Ok(())
}

/// Parse a transaction date and reject anything past the future horizon.
pub(crate) fn check_date(raw: &str) -> LedgerResult<NaiveDate> {
    let date = parse_date(raw)?;
    let today = Utc::now().date_naive();
    let limit = today
        .checked_add_days(Days::new(FUTURE_HORIZON_DAYS))
        .unwrap_or(NaiveDate::MAX);
    if date > limit {
        return Err(LedgerError::InvalidArgument(format!(
            "date {} is more than {} days in the future",
            date, FUTURE_HORIZON_DAYS
        )));
    }
    Ok(date)
}

pub(crate) fn load_owned<S>(store: &S, owner_id: &str, account_id: &str) -> LedgerResult<Account>
where
    S: DocumentStore + ?Sized,
{
    let account = store
        .get_account(account_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("account {}", account_id)))?;
    if account.owner_id != owner_id {
        return Err(LedgerError::PermissionDenied(format!(
            "account {} belongs to another owner",
            account_id
        )));
    }
    Ok(account)
}

pub(crate) fn ensure_active(account: &Account) -> LedgerResult<()> {
    if !account.is_active {
        return Err(LedgerError::FailedPrecondition(format!(
            "account '{}' ({}) is inactive",
            account.name, account.id
        )));
    }
    Ok(())
}

fn account<'m>(loaded: &'m BTreeMap<String, Account>, id: &str) -> LedgerResult<&'m Account> {
    loaded
        .get(id)
        .ok_or_else(|| LedgerError::NotFound(format!("account {}", id)))
}

pub struct TransactionLedger<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: DocumentStore + ?Sized> TransactionLedger<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn create_transaction(
        &self,
        owner_id: &str,
        input: NewTransaction,
    ) -> LedgerResult<Transaction> {
        check_amount(input.amount)?;
        let debit_id = required_text(&input.debit_account_id, "debit account id")?;
        let credit_id = required_text(&input.credit_account_id, "credit account id")?;
        check_distinct(&debit_id, &credit_id)?;
        let date = check_date(&input.date)?;

        let debit = load_owned(self.store, owner_id, &debit_id)?;
        let credit = load_owned(self.store, owner_id, &credit_id)?;
        ensure_active(&debit)?;
        ensure_active(&credit)?;

        let now = Utc::now();
        let tx = Transaction {
            id: new_id(),
            owner_id: owner_id.to_string(),
            date,
            amount: input.amount,
            debit_account_id: debit_id,
            credit_account_id: credit_id,
            note: optional_text(input.note.as_deref()),
            tags: clean_tags(input.tags.as_deref()),
            created_at: now,
            updated_at: now,
        };

        let posting = Posting {
            amount: tx.amount,
            debit: &debit,
            credit: &credit,
        };
        let mut batch = Batch::new();
        batch.push(Write::InsertTransaction(tx.clone()));
        for (id, delta) in posting.effects() {
            batch.increment(id, delta);
        }
        let adjustments = batch.increments();
        self.store.commit(batch)?;

        tracing::info!(
            transaction_id = %tx.id,
            owner_id,
            adjustments,
            "transaction created"
        );
        Ok(tx)
    }

    pub fn update_transaction(
        &self,
        owner_id: &str,
        transaction_id: &str,
        patch: TransactionPatch,
    ) -> LedgerResult<()> {
        let existing = self.owned(owner_id, transaction_id)?;

        let new_debit_id = match patch.debit_account_id.as_deref() {
            Some(id) => required_text(id, "debit account id")?,
            None => existing.debit_account_id.clone(),
        };
        let new_credit_id = match patch.credit_account_id.as_deref() {
            Some(id) => required_text(id, "credit account id")?,
            None => existing.credit_account_id.clone(),
        };
        let new_amount = patch.amount.unwrap_or(existing.amount);
        check_amount(new_amount)?;
        check_distinct(&new_debit_id, &new_credit_id)?;
        let new_date = match patch.date.as_deref() {
            Some(raw) => check_date(raw)?,
            None => existing.date,
        };

        // Every account on either side, before or after, must still resolve
        // and belong to the owner.
        let mut loaded: BTreeMap<String, Account> = BTreeMap::new();
        for id in [
            &existing.debit_account_id,
            &existing.credit_account_id,
            &new_debit_id,
            &new_credit_id,
        ] {
            if !loaded.contains_key(id.as_str()) {
                loaded.insert(id.clone(), load_owned(self.store, owner_id, id)?);
            }
        }
        for id in [&new_debit_id, &new_credit_id] {
            let was_referenced =
                *id == existing.debit_account_id || *id == existing.credit_account_id;
            if !was_referenced {
                ensure_active(account(&loaded, id)?)?;
            }
        }

        let before = Posting {
            amount: existing.amount,
            debit: account(&loaded, &existing.debit_account_id)?,
            credit: account(&loaded, &existing.credit_account_id)?,
        };
        let after = Posting {
            amount: new_amount,
            debit: account(&loaded, &new_debit_id)?,
            credit: account(&loaded, &new_credit_id)?,
        };
        let net = net_adjustments(&before, &after);
        tracing::debug!(transaction_id, ?net, "net balance adjustments");

        let note = match patch.note.as_deref() {
            Some(raw) => optional_text(Some(raw)),
            None => existing.note.clone(),
        };
        let tags = clean_tags(patch.tags.as_deref()).or_else(|| existing.tags.clone());

        let updated = Transaction {
            date: new_date,
            amount: new_amount,
            debit_account_id: new_debit_id,
            credit_account_id: new_credit_id,
            note,
            tags,
            updated_at: Utc::now(),
            ..existing
        };

        let mut batch = Batch::new();
        batch.push(Write::UpdateTransaction(updated));
        for (id, delta) in &net {
            batch.increment(id, *delta);
        }
        let adjustments = batch.increments();
        self.store.commit(batch)?;

        tracing::info!(transaction_id, owner_id, adjustments, "transaction updated");
        Ok(())
    }

    pub fn delete_transaction(&self, owner_id: &str, transaction_id: &str) -> LedgerResult<()> {
        let existing = self.owned(owner_id, transaction_id)?;

        let mut batch = Batch::new();
        for (id, side) in [
            (&existing.debit_account_id, Side::Debit),
            (&existing.credit_account_id, Side::Credit),
        ] {
            match self.store.get_account(id)? {
                Some(acct) if has_balance(acct.account_type) => {
                    batch.increment(id, -effect(acct.account_type, existing.amount, side));
                }
                Some(_) => {}
                None => {
                    tracing::warn!(
                        transaction_id,
                        account_id = %id,
                        "referenced account missing, skipping reversal"
                    );
                }
            }
        }
        batch.push(Write::DeleteTransaction(existing.id.clone()));
        let adjustments = batch.increments();
        self.store.commit(batch)?;

        tracing::info!(transaction_id, owner_id, adjustments, "transaction deleted");
        Ok(())
    }

    pub fn get(&self, owner_id: &str, transaction_id: &str) -> LedgerResult<Transaction> {
        self.owned(owner_id, transaction_id)
    }

    /// Owner's transactions, newest first.
    pub fn list(&self, owner_id: &str, query: &TransactionQuery) -> LedgerResult<Vec<Transaction>> {
        let filter = TransactionFilter {
            owner_id: owner_id.to_string(),
            account_id: query.account_id.clone(),
        };
        let mut rows: Vec<Transaction> = self
            .store
            .find_transactions(&filter)?
            .into_iter()
            .filter(|t| query.month.as_deref().is_none_or(|m| same_month(t.date, m)))
            .collect();
        rows.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn owned(&self, owner_id: &str, transaction_id: &str) -> LedgerResult<Transaction> {
        let tx = self
            .store
            .get_transaction(transaction_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("transaction {}", transaction_id)))?;
        if tx.owner_id != owner_id {
            return Err(LedgerError::PermissionDenied(format!(
                "transaction {} belongs to another owner",
                transaction_id
            )));
        }
        Ok(tx)
    }
}
