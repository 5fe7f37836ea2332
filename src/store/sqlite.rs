// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! SQLite adapter for the persistence port.
//!
//! Optional model fields map to SQL NULL, decimals are stored as TEXT and tags
//! as a JSON array. Each batch runs in its own `BEGIN IMMEDIATE` transaction,
//! which serializes writers for the read-add-write of a balance.

use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use rust_decimal::Decimal;

use crate::models::{Account, AccountType, Frequency, RecurringTransaction, Transaction};

use super::{
    AccountFilter, Batch, DocumentStore, StoreError, StoreResult, TransactionFilter, Write,
};

const ACCOUNT_COLS: &str = "id, owner_id, name, account_type, parent_category, sub_category, \
     icon, color, opening_balance, current_balance, is_active, created_at, updated_at";

const TRANSACTION_COLS: &str = "id, owner_id, date, amount, debit_account_id, \
     credit_account_id, note, tags, created_at, updated_at";

const RECURRING_COLS: &str = "id, owner_id, amount, debit_account_id, credit_account_id, \
     frequency, day_of_recurrence, start_date, end_date, next_occurrence, is_active, \
     notify_before_days, last_created_date, note, created_at, updated_at";

fn conversion_err<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn decimal_at(r: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = r.get(idx)?;
    raw.parse::<Decimal>().map_err(|e| conversion_err(idx, e))
}

fn opt_decimal_at(r: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = r.get(idx)?;
    raw.map(|s| s.parse::<Decimal>().map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn tags_at(r: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Vec<String>>> {
    let raw: Option<String> = r.get(idx)?;
    raw.map(|s| serde_json::from_str::<Vec<String>>(&s).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn tags_to_sql(tags: &Option<Vec<String>>) -> StoreResult<Option<String>> {
    tags.as_ref()
        .map(|t| serde_json::to_string(t).map_err(|e| StoreError::Corrupt(e.to_string())))
        .transpose()
}

fn account_from_row(r: &Row<'_>) -> rusqlite::Result<Account> {
    let kind: String = r.get(3)?;
    Ok(Account {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        name: r.get(2)?,
        account_type: AccountType::from_str(&kind).map_err(|e| conversion_err(3, e))?,
        parent_category: r.get(4)?,
        sub_category: r.get(5)?,
        icon: r.get(6)?,
        color: r.get(7)?,
        opening_balance: opt_decimal_at(r, 8)?,
        current_balance: opt_decimal_at(r, 9)?,
        is_active: r.get(10)?,
        created_at: r.get(11)?,
        updated_at: r.get(12)?,
    })
}

fn transaction_from_row(r: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        date: r.get(2)?,
        amount: decimal_at(r, 3)?,
        debit_account_id: r.get(4)?,
        credit_account_id: r.get(5)?,
        note: r.get(6)?,
        tags: tags_at(r, 7)?,
        created_at: r.get(8)?,
        updated_at: r.get(9)?,
    })
}

fn recurring_from_row(r: &Row<'_>) -> rusqlite::Result<RecurringTransaction> {
    let freq: String = r.get(5)?;
    Ok(RecurringTransaction {
        id: r.get(0)?,
        owner_id: r.get(1)?,
        amount: decimal_at(r, 2)?,
        debit_account_id: r.get(3)?,
        credit_account_id: r.get(4)?,
        frequency: Frequency::from_str(&freq).map_err(|e| conversion_err(5, e))?,
        day_of_recurrence: r.get(6)?,
        start_date: r.get(7)?,
        end_date: r.get(8)?,
        next_occurrence: r.get(9)?,
        is_active: r.get(10)?,
        notify_before_days: r.get(11)?,
        last_created_date: r.get(12)?,
        note: r.get(13)?,
        created_at: r.get(14)?,
        updated_at: r.get(15)?,
    })
}

fn ensure_changed(changed: usize, id: &str) -> StoreResult<()> {
    if changed == 0 {
        return Err(StoreError::Missing(id.to_string()));
    }
    Ok(())
}

fn apply(conn: &Connection, write: &Write) -> StoreResult<()> {
    match write {
        Write::InsertAccount(a) => {
            conn.execute(
                &format!(
                    "INSERT INTO accounts({ACCOUNT_COLS}) \
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)"
                ),
                params![
                    a.id,
                    a.owner_id,
                    a.name,
                    a.account_type.as_str(),
                    a.parent_category,
                    a.sub_category,
                    a.icon,
                    a.color,
                    a.opening_balance.map(|d| d.to_string()),
                    a.current_balance.map(|d| d.to_string()),
                    a.is_active,
                    a.created_at,
                    a.updated_at
                ],
            )?;
        }
        Write::UpdateAccount { id, changes } => {
            let mut account = conn
                .query_row(
                    &format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE id=?1"),
                    params![id],
                    account_from_row,
                )
                .optional()?
                .ok_or_else(|| StoreError::Missing(id.clone()))?;
            changes.apply(&mut account);
            // Profile columns only.
            conn.execute(
                "UPDATE accounts SET name=?2, icon=?3, color=?4, is_active=?5, updated_at=?6 \
                 WHERE id=?1",
                params![
                    id,
                    account.name,
                    account.icon,
                    account.color,
                    account.is_active,
                    account.updated_at
                ],
            )?;
        }
        Write::IncrementBalance { account_id, delta } => {
            let current: Option<String> = conn
                .query_row(
                    "SELECT current_balance FROM accounts WHERE id=?1",
                    params![account_id],
                    |r| r.get(0),
                )
                .optional()?
                .ok_or_else(|| StoreError::Missing(account_id.clone()))?;
            let current = current.ok_or_else(|| {
                StoreError::Corrupt(format!("account {} carries no balance", account_id))
            })?;
            let current = current.parse::<Decimal>().map_err(|e| {
                StoreError::Corrupt(format!("balance '{}' of {}: {}", current, account_id, e))
            })?;
            conn.execute(
                "UPDATE accounts SET current_balance=?2 WHERE id=?1",
                params![account_id, (current + delta).to_string()],
            )?;
        }
        Write::InsertTransaction(t) => {
            conn.execute(
                &format!(
                    "INSERT INTO transactions({TRANSACTION_COLS}) \
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)"
                ),
                params![
                    t.id,
                    t.owner_id,
                    t.date,
                    t.amount.to_string(),
                    t.debit_account_id,
                    t.credit_account_id,
                    t.note,
                    tags_to_sql(&t.tags)?,
                    t.created_at,
                    t.updated_at
                ],
            )?;
        }
        Write::UpdateTransaction(t) => {
            let changed = conn.execute(
                "UPDATE transactions SET date=?2, amount=?3, debit_account_id=?4, \
                 credit_account_id=?5, note=?6, tags=?7, updated_at=?8 WHERE id=?1",
                params![
                    t.id,
                    t.date,
                    t.amount.to_string(),
                    t.debit_account_id,
                    t.credit_account_id,
                    t.note,
                    tags_to_sql(&t.tags)?,
                    t.updated_at
                ],
            )?;
            ensure_changed(changed, &t.id)?;
        }
        Write::DeleteTransaction(id) => {
            let changed = conn.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
            ensure_changed(changed, id)?;
        }
        Write::InsertRecurring(r) => {
            conn.execute(
                &format!(
                    "INSERT INTO recurring_transactions({RECURRING_COLS}) \
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)"
                ),
                params![
                    r.id,
                    r.owner_id,
                    r.amount.to_string(),
                    r.debit_account_id,
                    r.credit_account_id,
                    r.frequency.as_str(),
                    r.day_of_recurrence,
                    r.start_date,
                    r.end_date,
                    r.next_occurrence,
                    r.is_active,
                    r.notify_before_days,
                    r.last_created_date,
                    r.note,
                    r.created_at,
                    r.updated_at
                ],
            )?;
        }
        Write::UpdateRecurring(r) => {
            let changed = conn.execute(
                "UPDATE recurring_transactions SET amount=?2, debit_account_id=?3, \
                 credit_account_id=?4, frequency=?5, day_of_recurrence=?6, start_date=?7, \
                 end_date=?8, next_occurrence=?9, is_active=?10, notify_before_days=?11, \
                 last_created_date=?12, note=?13, updated_at=?14 WHERE id=?1",
                params![
                    r.id,
                    r.amount.to_string(),
                    r.debit_account_id,
                    r.credit_account_id,
                    r.frequency.as_str(),
                    r.day_of_recurrence,
                    r.start_date,
                    r.end_date,
                    r.next_occurrence,
                    r.is_active,
                    r.notify_before_days,
                    r.last_created_date,
                    r.note,
                    r.updated_at
                ],
            )?;
            ensure_changed(changed, &r.id)?;
        }
        Write::DeleteRecurring(id) => {
            let changed = conn.execute(
                "DELETE FROM recurring_transactions WHERE id=?1",
                params![id],
            )?;
            ensure_changed(changed, id)?;
        }
    }
    Ok(())
}

impl DocumentStore for Connection {
    fn get_account(&self, id: &str) -> StoreResult<Option<Account>> {
        let account = self
            .query_row(
                &format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE id=?1"),
                params![id],
                account_from_row,
            )
            .optional()?;
        Ok(account)
    }

    fn find_accounts(&self, filter: &AccountFilter) -> StoreResult<Vec<Account>> {
        let mut sql = format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE owner_id=?1");
        if filter.is_active.is_some() {
            sql.push_str(" AND is_active=?2");
        }
        sql.push_str(" ORDER BY name");
        let mut stmt = self.prepare(&sql)?;
        let rows = match filter.is_active {
            Some(active) => stmt.query_map(params![filter.owner_id, active], account_from_row)?,
            None => stmt.query_map(params![filter.owner_id], account_from_row)?,
        };
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn get_transaction(&self, id: &str) -> StoreResult<Option<Transaction>> {
        let tx = self
            .query_row(
                &format!("SELECT {TRANSACTION_COLS} FROM transactions WHERE id=?1"),
                params![id],
                transaction_from_row,
            )
            .optional()?;
        Ok(tx)
    }

    fn find_transactions(&self, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>> {
        let mut sql = format!("SELECT {TRANSACTION_COLS} FROM transactions WHERE owner_id=?1");
        if filter.account_id.is_some() {
            sql.push_str(" AND (debit_account_id=?2 OR credit_account_id=?2)");
        }
        sql.push_str(" ORDER BY date, id");
        let mut stmt = self.prepare(&sql)?;
        let rows = match &filter.account_id {
            Some(acct) => stmt.query_map(params![filter.owner_id, acct], transaction_from_row)?,
            None => stmt.query_map(params![filter.owner_id], transaction_from_row)?,
        };
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn get_recurring(&self, id: &str) -> StoreResult<Option<RecurringTransaction>> {
        let rec = self
            .query_row(
                &format!("SELECT {RECURRING_COLS} FROM recurring_transactions WHERE id=?1"),
                params![id],
                recurring_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    fn find_recurring(&self, owner_id: &str) -> StoreResult<Vec<RecurringTransaction>> {
        let mut stmt = self.prepare(&format!(
            "SELECT {RECURRING_COLS} FROM recurring_transactions WHERE owner_id=?1 \
             ORDER BY next_occurrence, id"
        ))?;
        let rows = stmt.query_map(params![owner_id], recurring_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn commit(&self, batch: Batch) -> StoreResult<()> {
        let tx = rusqlite::Transaction::new_unchecked(self, TransactionBehavior::Immediate)?;
        for write in batch.writes() {
            apply(&tx, write)?;
        }
        tx.commit()?;
        tracing::trace!(writes = batch.len(), "sqlite batch committed");
        Ok(())
    }
}
