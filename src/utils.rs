// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::models::Account;
use crate::store::{AccountFilter, DocumentStore};

/// Parse `YYYY-MM-DD`, or an RFC 3339 timestamp reduced to its UTC date.
pub fn parse_date(s: &str) -> LedgerResult<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| {
            LedgerError::InvalidArgument(format!(
                "Invalid date '{}', expected YYYY-MM-DD or RFC 3339",
                s
            ))
        })
}

pub fn parse_month(s: &str) -> LedgerResult<String> {
    let s = s.trim();
    NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").map_err(|_| {
        LedgerError::InvalidArgument(format!("Invalid month '{}', expected YYYY-MM", s))
    })?;
    Ok(s.to_string())
}

pub fn parse_decimal(s: &str) -> LedgerResult<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .map_err(|_| LedgerError::InvalidArgument(format!("Invalid decimal '{}'", s)))
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
    }
}

pub fn same_month(date: NaiveDate, month: &str) -> bool {
    format!("{:04}-{:02}", date.year(), date.month()) == month
}

/// Trim and reject blank required text.
pub fn required_text(value: &str, label: &str) -> LedgerResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidArgument(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim optional text; blank becomes `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Trim tags and drop blank ones; an empty result becomes `None`.
pub fn clean_tags(tags: Option<&[String]>) -> Option<Vec<String>> {
    let cleaned: Vec<String> = tags
        .unwrap_or_default()
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub fn fmt_balance(d: Option<Decimal>) -> String {
    d.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

/// Resolve an account reference given on the command line: an id, or the
/// case-insensitive name of one of the owner's accounts. Names match active
/// accounts first; inactive ones only when `include_inactive` is set.
pub fn resolve_account<S>(
    store: &S,
    owner_id: &str,
    key: &str,
    include_inactive: bool,
) -> LedgerResult<Account>
where
    S: DocumentStore + ?Sized,
{
    let key = key.trim();
    if let Some(acct) = store.get_account(key)? {
        if acct.owner_id != owner_id {
            return Err(LedgerError::PermissionDenied(format!(
                "account {} belongs to another owner",
                key
            )));
        }
        return Ok(acct);
    }
    let wanted = key.to_lowercase();
    let filter = if include_inactive {
        AccountFilter::owner(owner_id)
    } else {
        AccountFilter::active(owner_id)
    };
    let mut matches: Vec<Account> = store
        .find_accounts(&filter)?
        .into_iter()
        .filter(|a| a.name.to_lowercase() == wanted)
        .collect();
    matches.sort_by_key(|a| (!a.is_active, std::cmp::Reverse(a.updated_at)));
    matches
        .into_iter()
        .next()
        .ok_or_else(|| LedgerError::NotFound(format!("account '{}'", key)))
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}
