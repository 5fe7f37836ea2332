// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;

use crate::accounts::AccountStore;
use crate::cli::owner;
use crate::ledger::{TransactionLedger, TransactionQuery};
use anyhow::{Result, bail};
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(conn, sub),
        _ => Ok(()),
    }
}

fn export_transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().trim().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();
    if fmt != "csv" && fmt != "json" {
        bail!("Unknown format: {} (use csv|json)", fmt);
    }

    let owner_id = owner(sub);
    let mut txs = TransactionLedger::new(conn).list(owner_id, &TransactionQuery::default())?;
    txs.reverse();
    let names: HashMap<String, String> = AccountStore::new(conn)
        .list(owner_id, true)?
        .into_iter()
        .map(|a| (a.id, a.name))
        .collect();
    let name_of = |id: &str| names.get(id).cloned().unwrap_or_default();

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "id", "date", "amount", "debit", "credit", "note", "tags",
            ])?;
            for t in &txs {
                wtr.write_record([
                    t.id.clone(),
                    t.date.to_string(),
                    t.amount.to_string(),
                    name_of(&t.debit_account_id),
                    name_of(&t.credit_account_id),
                    t.note.clone().unwrap_or_default(),
                    t.tags.clone().unwrap_or_default().join(";"),
                ])?;
            }
            wtr.flush()?;
        }
        _ => {
            let items: Vec<serde_json::Value> = txs
                .iter()
                .map(|t| {
                    json!({
                        "id": t.id,
                        "date": t.date.to_string(),
                        "amount": t.amount.to_string(),
                        "debit": name_of(&t.debit_account_id),
                        "credit": name_of(&t.credit_account_id),
                        "note": t.note,
                        "tags": t.tags,
                    })
                })
                .collect();
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
    }
    println!("Exported {} transactions to {}", txs.len(), out);
    Ok(())
}
