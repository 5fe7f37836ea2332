// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;

use crate::accounts::AccountStore;
use crate::cli::owner;
use crate::ledger::{NewTransaction, TransactionLedger, TransactionPatch, TransactionQuery};
use crate::models::{CreatedId, OpResult};
use crate::utils::{maybe_print_json, parse_decimal, parse_month, pretty_table, resolve_account};
use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("rm", sub)) => {
            let id = sub.get_one::<String>("id").unwrap().trim();
            TransactionLedger::new(conn).delete_transaction(owner(sub), id)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &OpResult::done())? {
                println!("Removed transaction {}", id);
            }
        }
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn tags(sub: &clap::ArgMatches) -> Option<Vec<String>> {
    sub.get_many::<String>("tag")
        .map(|vals| vals.cloned().collect())
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
    let input = NewTransaction {
        date: sub.get_one::<String>("date").unwrap().to_string(),
        amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
        debit_account_id: debit.id.clone(),
        credit_account_id: credit.id.clone(),
        note: sub.get_one::<String>("note").cloned(),
        tags: tags(sub),
    };
    let tx = TransactionLedger::new(conn).create_transaction(owner_id, input)?;
    let result = OpResult::with(CreatedId { id: tx.id.clone() });
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &result)? {
        println!(
            "Recorded {} on {}: {} <- {} (id={})",
            tx.amount, tx.date, debit.name, credit.name, tx.id
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
    let patch = TransactionPatch {
        date: sub.get_one::<String>("date").cloned(),
        amount: sub
            .get_one::<String>("amount")
            .map(|s| parse_decimal(s))
            .transpose()?,
        debit_account_id: account_ref("debit")?,
        credit_account_id: account_ref("credit")?,
        note: sub.get_one::<String>("note").cloned(),
        tags: tags(sub),
    };
    TransactionLedger::new(conn).update_transaction(owner_id, id, patch)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &OpResult::done())? {
        println!("Updated transaction {}", id);
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.date.clone(),
                    r.debit.clone(),
                    r.credit.clone(),
                    r.amount.clone(),
                    r.note.clone(),
                    r.tags.join(","),
                    r.id.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Date", "Debit", "Credit", "Amount", "Note", "Tags", "ID"],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: String,
    pub date: String,
    pub debit: String,
    pub credit: String,
    pub amount: String,
    pub note: String,
    pub tags: Vec<String>,
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let owner_id = owner(sub);
    let account_id = match sub.get_one::<String>("account") {
        Some(key) => Some(resolve_account(conn, owner_id, key, true)?.id),
        None => None,
    };
    let month = sub
        .get_one::<String>("month")
        .map(|m| parse_month(m))
        .transpose()?;
    let query = TransactionQuery {
        account_id,
        month,
        limit: sub.get_one::<usize>("limit").copied(),
    };
    let txs = TransactionLedger::new(conn).list(owner_id, &query)?;

    let names: HashMap<String, String> = AccountStore::new(conn)
        .list(owner_id, true)?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();
    let name_of = |id: &str| names.get(id).cloned().unwrap_or_else(|| id.to_string());

    Ok(txs
        .into_iter()
        .map(|t| TransactionRow {
            date: t.date.to_string(),
            debit: name_of(&t.debit_account_id),
            credit: name_of(&t.credit_account_id),
            amount: t.amount.to_string(),
            note: t.note.unwrap_or_default(),
            tags: t.tags.unwrap_or_default(),
            id: t.id,
        })
        .collect())
}
