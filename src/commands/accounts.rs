// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::str::FromStr;

use crate::accounts::{AccountPatch, AccountStore, NewAccount};
use crate::cli::owner;
use crate::models::{AccountType, CreatedId, OpResult};
use crate::utils::{fmt_balance, maybe_print_json, parse_decimal, pretty_table, resolve_account};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("deactivate", sub)) => {
            let owner_id = owner(sub);
            let key = sub.get_one::<String>("account").unwrap();
            let acct = resolve_account(conn, owner_id, key, false)?;
            AccountStore::new(conn).deactivate_account(owner_id, &acct.id)?;
            println!("Deactivated account '{}'", acct.name);
        }
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner_id = owner(sub);
    let account_type = AccountType::from_str(sub.get_one::<String>("type").unwrap())?;
    let opening_balance = sub
        .get_one::<String>("opening")
        .map(|s| parse_decimal(s))
        .transpose()?;
    let input = NewAccount {
        name: sub.get_one::<String>("name").unwrap().to_string(),
        account_type,
        parent_category: sub.get_one::<String>("parent").unwrap().to_string(),
        sub_category: sub.get_one::<String>("sub").unwrap().to_string(),
        opening_balance,
        icon: sub.get_one::<String>("icon").cloned(),
        color: sub.get_one::<String>("color").cloned(),
    };
    let account = AccountStore::new(conn).create_account(owner_id, input)?;
    let result = OpResult::with(CreatedId {
        id: account.id.clone(),
    });
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &result)? {
        println!(
            "Added account '{}' ({}, {}/{}) id={}",
            account.name,
            account.account_type,
            account.parent_category,
            account.sub_category,
            account.id
        );
    }
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let accounts = AccountStore::new(conn).list(owner(sub), sub.get_flag("all"))?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &accounts)? {
        let rows: Vec<Vec<String>> = accounts
            .iter()
            .map(|a| {
                vec![
                    a.name.clone(),
                    a.account_type.to_string(),
                    format!("{} / {}", a.parent_category, a.sub_category),
                    fmt_balance(a.current_balance),
                    if a.is_active { "yes" } else { "no" }.to_string(),
                    a.id.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Name", "Type", "Category", "Balance", "Active", "ID"],
                rows
            )
        );
    }
    Ok(())
}

fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let owner_id = owner(sub);
    let key = sub.get_one::<String>("account").unwrap();
    let acct = resolve_account(conn, owner_id, key, true)?;
    let patch = AccountPatch {
        name: sub.get_one::<String>("name").cloned(),
        icon: sub.get_one::<String>("icon").cloned(),
        color: sub.get_one::<String>("color").cloned(),
        is_active: sub.get_one::<bool>("active").copied(),
    };
    AccountStore::new(conn).update_account(owner_id, &acct.id, patch)?;
    println!("Updated account '{}'", acct.name);
    Ok(())
}
