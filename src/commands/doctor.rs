// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::cli::owner;
use crate::reports::{BalanceCheck, reconcile};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rusqlite::Connection;

/// Balance checks that disagree with the transaction history.
pub fn drifted(conn: &Connection, owner_id: &str) -> Result<Vec<BalanceCheck>> {
    Ok(reconcile(conn, owner_id)?
        .into_iter()
        .filter(|c| !c.is_consistent())
        .collect())
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let issues = drifted(conn, owner(m))?;
    if maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &issues)? {
        return Ok(());
    }
    if issues.is_empty() {
        println!("doctor: balances agree with transaction history");
    } else {
        let rows = issues
            .iter()
            .map(|c| {
                vec![
                    c.name.clone(),
                    format!("{:.2}", c.stored_balance),
                    format!("{:.2}", c.derived_balance),
                    format!("{:.2}", c.drift),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Account", "Stored", "From history", "Drift"], rows)
        );
    }
    Ok(())
}
