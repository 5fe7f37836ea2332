// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Recurring schedules and their next-occurrence calculation.

use chrono::{Datelike, Days, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{check_amount, check_distinct, ensure_active, load_owned};
use crate::models::{Frequency, RecurringTransaction};
use crate::store::{Batch, DocumentStore, Write};
use crate::utils::{days_in_month, new_id, optional_text, parse_date, required_text};

/// Reject a `day_of_recurrence` outside the range its frequency allows:
/// 0..=6 (0 = Sunday) for weekly, 1..=31 otherwise.
pub fn check_day_of_recurrence(frequency: Frequency, day: u32) -> LedgerResult<()> {
    let ok = match frequency {
        Frequency::Weekly => day <= 6,
        Frequency::Daily | Frequency::Monthly | Frequency::Yearly => (1..=31).contains(&day),
    };
    if !ok {
        return Err(LedgerError::InvalidArgument(format!(
            "day of recurrence {} is out of range for a {} schedule",
            day, frequency
        )));
    }
    Ok(())
}

fn out_of_range(base: NaiveDate) -> LedgerError {
    LedgerError::InvalidArgument(format!("no occurrence representable after {}", base))
}

fn clamped(base: NaiveDate, year: i32, month: u32, day: u32) -> LedgerResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day.min(days_in_month(year, month)))
        .ok_or_else(|| out_of_range(base))
}

/// Next date a schedule fires, counted from `last_created_date` if a
/// transaction has already been materialized, else from `start_date`.
///
/// - daily: the following day.
/// - weekly: the first date strictly after the base whose weekday index
///   (0 = Sunday) equals `day_of_recurrence`; a base already on that weekday
///   moves a full week.
/// - monthly: the following calendar month, on `day_of_recurrence` clamped to
///   the length of that month.
/// - yearly: the same month of the following year, clamped the same way.
pub fn next_occurrence(
    frequency: Frequency,
    day_of_recurrence: u32,
    start_date: NaiveDate,
    last_created_date: Option<NaiveDate>,
) -> LedgerResult<NaiveDate> {
    check_day_of_recurrence(frequency, day_of_recurrence)?;
    let base = last_created_date.unwrap_or(start_date);
    match frequency {
        Frequency::Daily => base.succ_opt().ok_or_else(|| out_of_range(base)),
        Frequency::Weekly => {
            let current = base.weekday().num_days_from_sunday();
            let ahead = match (day_of_recurrence + 7 - current) % 7 {
                0 => 7,
                n => n,
            };
            base.checked_add_days(Days::new(u64::from(ahead)))
                .ok_or_else(|| out_of_range(base))
        }
        Frequency::Monthly => {
            let (year, month) = if base.month() == 12 {
                (base.year() + 1, 1)
            } else {
                (base.year(), base.month() + 1)
            };
            clamped(base, year, month, day_of_recurrence)
        }
        Frequency::Yearly => clamped(base, base.year() + 1, base.month(), day_of_recurrence),
    }
}

#[derive(Debug, Clone)]
pub struct NewRecurring {
    pub amount: Decimal,
    pub debit_account_id: String,
    pub credit_account_id: String,
    pub frequency: Frequency,
    pub day_of_recurrence: u32,
    pub start_date: String,
    pub end_date: Option<String>,
    pub notify_before_days: Option<u32>,
    pub note: Option<String>,
}

/// Changes to a schedule. The doubled options distinguish "keep" (`None`)
/// from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct RecurringPatch {
    pub amount: Option<Decimal>,
    pub debit_account_id: Option<String>,
    pub credit_account_id: Option<String>,
    pub frequency: Option<Frequency>,
    pub day_of_recurrence: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub notify_before_days: Option<Option<u32>>,
    pub note: Option<String>,
}

fn check_window(start: NaiveDate, end: Option<NaiveDate>) -> LedgerResult<()> {
    if let Some(end) = end {
        if end <= start {
            return Err(LedgerError::InvalidArgument(format!(
                "end date {} must be after start date {}",
                end, start
            )));
        }
    }
    Ok(())
}

fn check_notify(days: Option<u32>) -> LedgerResult<()> {
    if days == Some(0) {
        return Err(LedgerError::InvalidArgument(
            "notify-before days must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn within_end(rec: &RecurringTransaction) -> bool {
    rec.end_date.is_none_or(|end| rec.next_occurrence <= end)
}

pub struct RecurringSchedules<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: DocumentStore + ?Sized> RecurringSchedules<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn create(
        &self,
        owner_id: &str,
        input: NewRecurring,
    ) -> LedgerResult<RecurringTransaction> {
        check_amount(input.amount)?;
        let debit_id = required_text(&input.debit_account_id, "debit account id")?;
        let credit_id = required_text(&input.credit_account_id, "credit account id")?;
        check_distinct(&debit_id, &credit_id)?;
        check_day_of_recurrence(input.frequency, input.day_of_recurrence)?;
        let start_date = parse_date(&input.start_date)?;
        let end_date = input.end_date.as_deref().map(parse_date).transpose()?;
        check_window(start_date, end_date)?;
        check_notify(input.notify_before_days)?;

        for id in [&debit_id, &credit_id] {
            ensure_active(&load_owned(self.store, owner_id, id)?)?;
        }

        let next = next_occurrence(input.frequency, input.day_of_recurrence, start_date, None)?;
        let now = Utc::now();
        let rec = RecurringTransaction {
            id: new_id(),
            owner_id: owner_id.to_string(),
            amount: input.amount,
            debit_account_id: debit_id,
            credit_account_id: credit_id,
            frequency: input.frequency,
            day_of_recurrence: input.day_of_recurrence,
            start_date,
            end_date,
            next_occurrence: next,
            is_active: true,
            notify_before_days: input.notify_before_days,
            last_created_date: None,
            note: optional_text(input.note.as_deref()),
            created_at: now,
            updated_at: now,
        };

        let mut batch = Batch::new();
        batch.push(Write::InsertRecurring(rec.clone()));
        self.store.commit(batch)?;
        tracing::info!(
            recurring_id = %rec.id,
            owner_id,
            frequency = %rec.frequency,
            next_occurrence = %rec.next_occurrence,
            "recurring schedule created"
        );
        Ok(rec)
    }

    pub fn update(
        &self,
        owner_id: &str,
        recurring_id: &str,
        patch: RecurringPatch,
    ) -> LedgerResult<RecurringTransaction> {
        let existing = self.owned(owner_id, recurring_id)?;

        let amount = patch.amount.unwrap_or(existing.amount);
        check_amount(amount)?;
        let debit_id = match patch.debit_account_id.as_deref() {
            Some(id) => required_text(id, "debit account id")?,
            None => existing.debit_account_id.clone(),
        };
        let credit_id = match patch.credit_account_id.as_deref() {
            Some(id) => required_text(id, "credit account id")?,
            None => existing.credit_account_id.clone(),
        };
        check_distinct(&debit_id, &credit_id)?;

        let frequency = patch.frequency.unwrap_or(existing.frequency);
        let day = patch.day_of_recurrence.unwrap_or(existing.day_of_recurrence);
        check_day_of_recurrence(frequency, day)?;
        let start_date = match patch.start_date.as_deref() {
            Some(raw) => parse_date(raw)?,
            None => existing.start_date,
        };
        let end_date = match &patch.end_date {
            Some(Some(raw)) => Some(parse_date(raw)?),
            Some(None) => None,
            None => existing.end_date,
        };
        check_window(start_date, end_date)?;
        let notify_before_days = patch
            .notify_before_days
            .unwrap_or(existing.notify_before_days);
        check_notify(notify_before_days)?;

        for id in [&debit_id, &credit_id] {
            let acct = load_owned(self.store, owner_id, id)?;
            if *id != existing.debit_account_id && *id != existing.credit_account_id {
                ensure_active(&acct)?;
            }
        }

        let next = next_occurrence(frequency, day, start_date, existing.last_created_date)?;
        let note = match patch.note.as_deref() {
            Some(raw) => optional_text(Some(raw)),
            None => existing.note.clone(),
        };
        let updated = RecurringTransaction {
            amount,
            debit_account_id: debit_id,
            credit_account_id: credit_id,
            frequency,
            day_of_recurrence: day,
            start_date,
            end_date,
            next_occurrence: next,
            is_active: patch.is_active.unwrap_or(existing.is_active),
            notify_before_days,
            note,
            updated_at: Utc::now(),
            ..existing
        };

        let mut batch = Batch::new();
        batch.push(Write::UpdateRecurring(updated.clone()));
        self.store.commit(batch)?;
        tracing::info!(
            recurring_id,
            owner_id,
            next_occurrence = %updated.next_occurrence,
            "recurring schedule updated"
        );
        Ok(updated)
    }

    /// Record that a concrete transaction was produced for `created_date`,
    /// and move `next_occurrence` past it. The date may not precede the start
    /// date or an earlier recorded materialization.
    pub fn record_materialized(
        &self,
        owner_id: &str,
        recurring_id: &str,
        created_date: &str,
    ) -> LedgerResult<RecurringTransaction> {
        let existing = self.owned(owner_id, recurring_id)?;
        let created = parse_date(created_date)?;
        if created < existing.start_date {
            return Err(LedgerError::InvalidArgument(format!(
                "materialized date {} precedes start date {}",
                created, existing.start_date
            )));
        }
        if let Some(last) = existing.last_created_date {
            if created < last {
                return Err(LedgerError::InvalidArgument(format!(
                    "materialized date {} precedes last materialization {}",
                    created, last
                )));
            }
        }
        let next = next_occurrence(
            existing.frequency,
            existing.day_of_recurrence,
            existing.start_date,
            Some(created),
        )?;
        let updated = RecurringTransaction {
            last_created_date: Some(created),
            next_occurrence: next,
            updated_at: Utc::now(),
            ..existing
        };
        let mut batch = Batch::new();
        batch.push(Write::UpdateRecurring(updated.clone()));
        self.store.commit(batch)?;
        tracing::info!(
            recurring_id,
            owner_id,
            next_occurrence = %updated.next_occurrence,
            "recurring schedule advanced"
        );
        Ok(updated)
    }

    pub fn delete(&self, owner_id: &str, recurring_id: &str) -> LedgerResult<()> {
        let existing = self.owned(owner_id, recurring_id)?;
        let mut batch = Batch::new();
        batch.push(Write::DeleteRecurring(existing.id));
        self.store.commit(batch)?;
        tracing::info!(recurring_id, owner_id, "recurring schedule deleted");
        Ok(())
    }

    pub fn get(&self, owner_id: &str, recurring_id: &str) -> LedgerResult<RecurringTransaction> {
        self.owned(owner_id, recurring_id)
    }

    pub fn list(&self, owner_id: &str) -> LedgerResult<Vec<RecurringTransaction>> {
        let mut rows = self.store.find_recurring(owner_id)?;
        rows.sort_by(|a, b| {
            a.next_occurrence
                .cmp(&b.next_occurrence)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(rows)
    }

    /// Active schedules whose next occurrence is on or before `as_of` and not
    /// past their end date.
    pub fn due_on(
        &self,
        owner_id: &str,
        as_of: NaiveDate,
    ) -> LedgerResult<Vec<RecurringTransaction>> {
        Ok(self
            .list(owner_id)?
            .into_iter()
            .filter(|r| r.is_active && r.next_occurrence <= as_of && within_end(r))
            .collect())
    }

    /// Active schedules whose notification window
    /// `next_occurrence - notify_before_days ..= next_occurrence` contains `today`.
    pub fn reminders_due(
        &self,
        owner_id: &str,
        today: NaiveDate,
    ) -> LedgerResult<Vec<RecurringTransaction>> {
        Ok(self
            .list(owner_id)?
            .into_iter()
            .filter(|r| r.is_active && within_end(r))
            .filter(|r| {
                r.notify_before_days.is_some_and(|days| {
                    let opens = r
                        .next_occurrence
                        .checked_sub_days(Days::new(u64::from(days)))
                        .unwrap_or(NaiveDate::MIN);
                    opens <= today && today <= r.next_occurrence
                })
            })
            .collect())
    }

    fn owned(&self, owner_id: &str, recurring_id: &str) -> LedgerResult<RecurringTransaction> {
        let rec = self
            .store
            .get_recurring(recurring_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("recurring schedule {}", recurring_id)))?;
        if rec.owner_id != owner_id {
            return Err(LedgerError::PermissionDenied(format!(
                "recurring schedule {} belongs to another owner",
                recurring_id
            )));
        }
        Ok(rec)
    }
}
