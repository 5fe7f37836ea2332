// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Income,
    Expense,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Income => "income",
            AccountType::Expense => "expense",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asset" => Ok(AccountType::Asset),
            "liability" => Ok(AccountType::Liability),
            "income" => Ok(AccountType::Income),
            "expense" => Ok(AccountType::Expense),
            other => Err(LedgerError::InvalidArgument(format!(
                "unrecognized account type '{}' (use asset|liability|income|expense)",
                other
            ))),
        }
    }
}

/// An account owned by a single user.
///
/// `opening_balance` and `current_balance` are `Some` exactly when the type is
/// balance-bearing (asset or liability).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub account_type: AccountType,
    pub parent_category: String,
    pub sub_category: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub opening_balance: Option<Decimal>,
    pub current_balance: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub owner_id: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub debit_account_id: String,
    pub credit_account_id: String,
    pub note: Option<String>,
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(LedgerError::InvalidArgument(format!(
                "unrecognized frequency '{}' (use daily|weekly|monthly|yearly)",
                other
            ))),
        }
    }
}

/// A schedule that periodically produces a concrete [`Transaction`].
///
/// `next_occurrence` is derived from `(frequency, day_of_recurrence,
/// start_date, last_created_date)` and is rewritten on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTransaction {
    pub id: String,
    pub owner_id: String,
    pub amount: Decimal,
    pub debit_account_id: String,
    pub credit_account_id: String,
    pub frequency: Frequency,
    /// Weekday index (0 = Sunday) for weekly schedules, day of month otherwise.
    pub day_of_recurrence: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub next_occurrence: NaiveDate,
    pub is_active: bool,
    pub notify_before_days: Option<u32>,
    pub last_created_date: Option<NaiveDate>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Success envelope returned to callers. Failures use
/// [`ErrorReport`](crate::error::ErrorReport).
#[derive(Debug, Clone, Serialize)]
pub struct OpResult<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> OpResult<T> {
    pub fn with(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

impl OpResult<()> {
    pub fn done() -> Self {
        Self {
            success: true,
            data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedId {
    pub id: String,
}
