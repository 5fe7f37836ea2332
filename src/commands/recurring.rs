// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::str::FromStr;

use crate::cli::owner;
use crate::models::{CreatedId, Frequency, OpResult, RecurringTransaction};
use crate::recurrence::{NewRecurring, RecurringPatch, RecurringSchedules};
use crate::utils::{maybe_print_json, parse_date, parse_decimal, pretty_table, resolve_account};
use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("rm", sub)) => {
            let id = sub.get_one::<String>("id").unwrap().trim();
            RecurringSchedules::new(conn).delete(owner(sub), id)?;
            println!("Removed recurring schedule {}", id);
        }
        Some(("list", sub)) => {
            let rows = RecurringSchedules::new(conn).list(owner(sub))?;
            print_rows(sub, &rows)?;
        }
        Some(("materialized", sub)) => {
            let id = sub.get_one::<String>("id").unwrap().trim();
            let date = sub.get_one::<String>("date").unwrap();
            let rec = RecurringSchedules::new(conn).record_materialized(owner(sub), id, date)?;
            println!("Next occurrence of {} is {}", rec.id, rec.next_occurrence);
        }
        Some(("due", sub)) => {
            let on = match sub.get_one::<String>("on") {
                Some(d) => parse_date(d)?,
                None => Utc::now().date_naive(),
            };
            let schedules = RecurringSchedules::new(conn);
            let rows = if sub.get_flag("reminders") {
                schedules.reminders_due(owner(sub), on)?
            } else {
                schedules.due_on(owner(sub), on)?
            };
            print_rows(sub, &rows)?;
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner_id = owner(sub);
    let debit = resolve_account(
        conn,
        owner_id,
        sub.get_one::<String>("debit").unwrap(),
        false,
    )?;
    let credit = resolve_account(
        conn,
        owner_id,
        sub.get_one::<String>("credit").unwrap(),
        false,
    )?;
    let input = NewRecurring {
        amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
        debit_account_id: debit.id,
        credit_account_id: credit.id,
        frequency: Frequency::from_str(sub.get_one::<String>("frequency").unwrap())?,
        day_of_recurrence: *sub.get_one::<u32>("day").unwrap(),
        start_date: sub.get_one::<String>("start").unwrap().to_string(),
        end_date: sub.get_one::<String>("end").cloned(),
        notify_before_days: sub.get_one::<u32>("notify-before").copied(),
        note: sub.get_one::<String>("note").cloned(),
    };
    let rec = RecurringSchedules::new(conn).create(owner_id, input)?;
    let result = OpResult::with(CreatedId { id: rec.id.clone() });
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &result)? {
        println!(
            "Added {} schedule {} (next {})",
            rec.frequency, rec.id, rec.next_occurrence
        );
    }
    Ok(())
}

fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner_id = owner(sub);
    let id = sub.get_one::<String>("id").unwrap().trim();
    let account_ref = |key: &str| -> Result<Option<String>> {
        match sub.get_one::<String>(key) {
            Some(v) => Ok(Some(resolve_account(conn, owner_id, v, false)?.id)),
            None => Ok(None),
        }
    };
    let end_date = if sub.get_flag("clear-end") {
        Some(None)
    } else {
        sub.get_one::<String>("end").cloned().map(Some)
    };
    let notify_before_days = if sub.get_flag("clear-notify") {
        Some(None)
    } else {
        sub.get_one::<u32>("notify-before").copied().map(Some)
    };
    let patch = RecurringPatch {
        amount: sub
            .get_one::<String>("amount")
            .map(|s| parse_decimal(s))
            .transpose()?,
        debit_account_id: account_ref("debit")?,
        credit_account_id: account_ref("credit")?,
        frequency: sub
            .get_one::<String>("frequency")
            .map(|s| Frequency::from_str(s))
            .transpose()?,
        day_of_recurrence: sub.get_one::<u32>("day").copied(),
        start_date: sub.get_one::<String>("start").cloned(),
        end_date,
        is_active: sub.get_one::<bool>("active").copied(),
        notify_before_days,
        note: sub.get_one::<String>("note").cloned(),
    };
    let rec = RecurringSchedules::new(conn).update(owner_id, id, patch)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &OpResult::with(&rec))? {
        println!("Updated schedule {} (next {})", rec.id, rec.next_occurrence);
    }
    Ok(())
}

fn print_rows(sub: &clap::ArgMatches, rows: &[RecurringTransaction]) -> Result<()> {
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &rows)? {
        let data: Vec<Vec<String>> = rows
            .iter()
            .map(|r| {
                vec![
                    r.next_occurrence.to_string(),
                    r.frequency.to_string(),
                    r.day_of_recurrence.to_string(),
                    r.amount.to_string(),
                    r.end_date.map(|d| d.to_string()).unwrap_or_default(),
                    if r.is_active { "yes" } else { "no" }.to_string(),
                    r.id.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Next", "Frequency", "Day", "Amount", "Ends", "Active", "ID"],
                data
            )
        );
    }
    Ok(())
}
