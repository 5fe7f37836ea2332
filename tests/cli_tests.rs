// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use dualbook::accounts::{AccountStore, NewAccount};
use dualbook::commands::{accounts, doctor, exporter, transactions};
use dualbook::ledger::{NewTransaction, TransactionLedger};
use dualbook::models::{Account, AccountType};
use dualbook::store::{AccountFilter, DocumentStore};
use dualbook::{ErrorKind, LedgerError, cli, db};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde_json::json;
use tempfile::tempdir;

fn account(conn: &Connection, name: &str, account_type: AccountType, opening: i64) -> Account {
    AccountStore::new(conn)
        .create_account(
            cli::DEFAULT_OWNER,
            NewAccount {
                name: name.to_string(),
                account_type,
                parent_category: "Main".to_string(),
                sub_category: "Misc".to_string(),
                opening_balance: Some(Decimal::new(opening, 0)),
                icon: None,
                color: None,
            },
        )
        .unwrap()
}

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    let checking = account(&conn, "Checking", AccountType::Asset, 100);
    let groceries = account(&conn, "Groceries", AccountType::Expense, 0);
    let ledger = TransactionLedger::new(&conn);
    for i in 1..=3 {
        ledger
            .create_transaction(
                cli::DEFAULT_OWNER,
                NewTransaction {
                    date: format!("2025-01-0{}", i),
                    amount: Decimal::new(1234, 2),
                    debit_account_id: groceries.id.clone(),
                    credit_account_id: checking.id.clone(),
                    note: Some(format!("Weekly run {}", i)),
                    tags: Some(vec!["food".to_string()]),
                },
            )
            .unwrap();
    }
    conn
}

#[test]
fn list_limit_respected() {
    let conn = setup();
    let matches = cli::build_cli().get_matches_from(["dualbook", "tx", "list", "--limit", "2"]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = tx_m.subcommand() {
            let rows = transactions::query_rows(&conn, list_m).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].date, "2025-01-03");
            assert_eq!(rows[0].debit, "Groceries");
            assert_eq!(rows[0].credit, "Checking");
        } else {
            panic!("no list subcommand");
        }
    } else {
        panic!("no tx subcommand");
    }
}

#[test]
fn list_is_scoped_to_owner() {
    let conn = setup();
    let matches =
        cli::build_cli().get_matches_from(["dualbook", "--owner", "bob", "tx", "list"]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = tx_m.subcommand() {
            assert!(transactions::query_rows(&conn, list_m).unwrap().is_empty());
        } else {
            panic!("no list subcommand");
        }
    } else {
        panic!("no tx subcommand");
    }
}

#[test]
fn export_transactions_streams_pretty_json() {
    let conn = setup();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.json");
    let out_str = out_path.to_string_lossy().to_string();

    let matches = cli::build_cli().get_matches_from([
        "dualbook",
        "export",
        "transactions",
        "--format",
        "json",
        "--out",
        &out_str,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(&conn, export_m).unwrap();
    } else {
        panic!("no export subcommand");
    }

    let contents = std::fs::read_to_string(&out_path).unwrap();
    let mut parsed: Vec<serde_json::Value> = serde_json::from_str(&contents).unwrap();
    assert_eq!(parsed.len(), 3);
    let first = parsed.remove(0);
    assert_eq!(first["date"], json!("2025-01-01"));
    assert_eq!(first["amount"], json!("12.34"));
    assert_eq!(first["debit"], json!("Groceries"));
    assert_eq!(first["credit"], json!("Checking"));
    assert_eq!(first["note"], json!("Weekly run 1"));
    assert_eq!(first["tags"], json!(["food"]));
}

#[test]
fn export_transactions_writes_csv() {
    let conn = setup();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.csv");
    let out_str = out_path.to_string_lossy().to_string();

    let matches = cli::build_cli().get_matches_from([
        "dualbook",
        "export",
        "transactions",
        "--out",
        &out_str,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        exporter::handle(&conn, export_m).unwrap();
    } else {
        panic!("no export subcommand");
    }

    let mut rdr = csv::Reader::from_path(&out_path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        ["id", "date", "amount", "debit", "credit", "note", "tags"]
    );
    let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 3);
    assert_eq!(&records[2][1], "2025-01-03");
    assert_eq!(&records[2][3], "Groceries");
    assert_eq!(&records[2][6], "food");
}

#[test]
fn export_transactions_rejects_unknown_format() {
    let conn = setup();
    let dir = tempdir().unwrap();
    let out_path = dir.path().join("export.unknown");
    let out_str = out_path.to_string_lossy().to_string();

    let matches = cli::build_cli().get_matches_from([
        "dualbook",
        "export",
        "transactions",
        "--format",
        "xml",
        "--out",
        &out_str,
    ]);
    if let Some(("export", export_m)) = matches.subcommand() {
        assert!(exporter::handle(&conn, export_m).is_err());
    } else {
        panic!("no export subcommand");
    }
    assert!(!out_path.exists());
}

#[test]
fn doctor_reports_tampered_balance() {
    let conn = setup();
    assert!(doctor::drifted(&conn, cli::DEFAULT_OWNER).unwrap().is_empty());

    conn.execute(
        "UPDATE accounts SET current_balance=?1 WHERE name='Checking'",
        params!["1"],
    )
    .unwrap();
    let issues = doctor::drifted(&conn, cli::DEFAULT_OWNER).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].name, "Checking");
    assert_eq!(issues[0].derived_balance, Decimal::new(6298, 2));
    assert_eq!(issues[0].drift, Decimal::new(-6198, 2));
}

#[test]
fn owner_defaults_to_local() {
    let matches = cli::build_cli().get_matches_from(["dualbook", "doctor"]);
    if let Some(("doctor", doctor_m)) = matches.subcommand() {
        assert_eq!(cli::owner(doctor_m), cli::DEFAULT_OWNER);
    } else {
        panic!("no doctor subcommand");
    }
}

fn run_tx_add(conn: &Connection, debit: &str, amount: &str) -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches_from([
        "dualbook",
        "tx",
        "add",
        "--date",
        "2025-01-05",
        "--amount",
        amount,
        "--debit",
        debit,
        "--credit",
        "Checking",
    ]);
    if let Some(("tx", tx_m)) = matches.subcommand() {
        transactions::handle(conn, tx_m)
    } else {
        panic!("no tx subcommand");
    }
}

fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.downcast_ref::<LedgerError>().map(|e| e.kind())
}

#[test]
fn tx_add_reports_typed_errors() {
    let conn = setup();
    let bob_wallet = AccountStore::new(&conn)
        .create_account(
            "bob",
            NewAccount {
                name: "Wallet".to_string(),
                account_type: AccountType::Asset,
                parent_category: "Main".to_string(),
                sub_category: "Cash".to_string(),
                opening_balance: Some(Decimal::ZERO),
                icon: None,
                color: None,
            },
        )
        .unwrap();

    let err = run_tx_add(&conn, "nope", "5").unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::NotFound));

    let err = run_tx_add(&conn, &bob_wallet.id, "5").unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::PermissionDenied));

    let err = run_tx_add(&conn, "groceries", "abc").unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::InvalidArgument));

    // Rejected adds write nothing.
    assert_eq!(
        conn.get_account(&bob_wallet.id).unwrap().unwrap().current_balance,
        Some(Decimal::ZERO)
    );
    run_tx_add(&conn, "groceries", "5").unwrap();
    assert!(doctor::drifted(&conn, cli::DEFAULT_OWNER).unwrap().is_empty());
}

#[test]
fn account_edit_reactivates_by_name() {
    let conn = setup();
    let run = |args: &[&str]| {
        let matches = cli::build_cli()
            .get_matches_from(["dualbook", "account"].iter().chain(args).copied());
        if let Some(("account", account_m)) = matches.subcommand() {
            accounts::handle(&conn, account_m)
        } else {
            panic!("no account subcommand");
        }
    };

    run(&["deactivate", "--account", "Groceries"]).unwrap();
    let active = conn
        .find_accounts(&AccountFilter::active(cli::DEFAULT_OWNER))
        .unwrap();
    assert!(active.iter().all(|a| a.name != "Groceries"));

    // Inactive accounts cannot be deactivated again by name.
    let err = run(&["deactivate", "--account", "Groceries"]).unwrap_err();
    assert_eq!(error_kind(&err), Some(ErrorKind::NotFound));

    run(&["edit", "--account", "groceries", "--active", "true"]).unwrap();
    let active = conn
        .find_accounts(&AccountFilter::active(cli::DEFAULT_OWNER))
        .unwrap();
    assert!(active.iter().any(|a| a.name == "Groceries"));
}
