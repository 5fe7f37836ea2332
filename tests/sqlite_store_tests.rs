// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::Connection;
use rust_decimal::Decimal;
use tempfile::tempdir;

use dualbook::accounts::{AccountPatch, AccountStore, NewAccount};
use dualbook::db;
use dualbook::ledger::{NewTransaction, TransactionLedger, TransactionPatch, TransactionQuery};
use dualbook::models::{Account, AccountType, Frequency};
use dualbook::recurrence::{NewRecurring, RecurringSchedules};
use dualbook::reports::reconcile;
use dualbook::store::{AccountFilter, Batch, DocumentStore, StoreError, Write};

const OWNER: &str = "local";

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

fn add_account(
    conn: &Connection,
    name: &str,
    account_type: AccountType,
    opening: Option<&str>,
) -> Account {
    AccountStore::new(conn)
        .create_account(
            OWNER,
            NewAccount {
                name: name.to_string(),
                account_type,
                parent_category: "Money".to_string(),
                sub_category: "Daily".to_string(),
                opening_balance: opening.map(dec),
                icon: Some("wallet".to_string()),
                color: None,
            },
        )
        .unwrap()
}

fn spend(amount: &str, debit: &Account, credit: &Account) -> NewTransaction {
    NewTransaction {
        date: "2025-02-01".to_string(),
        amount: dec(amount),
        debit_account_id: debit.id.clone(),
        credit_account_id: credit.id.clone(),
        note: Some("lunch".to_string()),
        tags: Some(vec!["food".to_string(), "work".to_string()]),
    }
}

#[test]
fn accounts_round_trip() {
    let conn = setup();
    let bank = add_account(&conn, "Bank", AccountType::Asset, Some("250.75"));
    let food = add_account(&conn, "Food", AccountType::Expense, None);

    let stored = conn.get_account(&bank.id).unwrap().unwrap();
    assert_eq!(stored, bank);
    let stored = conn.get_account(&food.id).unwrap().unwrap();
    assert_eq!(stored.opening_balance, None);
    assert_eq!(stored.current_balance, None);
    assert!(conn.get_account("missing").unwrap().is_none());

    let names: Vec<String> = conn
        .find_accounts(&AccountFilter::owner(OWNER))
        .unwrap()
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, ["Bank", "Food"]);
    assert!(
        conn.find_accounts(&AccountFilter::owner("someone-else"))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn profile_update_keeps_balance() {
    let conn = setup();
    let bank = add_account(&conn, "Bank", AccountType::Asset, Some("100"));
    let food = add_account(&conn, "Food", AccountType::Expense, None);
    TransactionLedger::new(&conn)
        .create_transaction(OWNER, spend("30", &food, &bank))
        .unwrap();

    AccountStore::new(&conn)
        .update_account(
            OWNER,
            &bank.id,
            AccountPatch {
                name: Some("Checking".to_string()),
                icon: Some(String::new()),
                color: Some("blue".to_string()),
                is_active: Some(false),
            },
        )
        .unwrap();

    let stored = conn.get_account(&bank.id).unwrap().unwrap();
    assert_eq!(stored.name, "Checking");
    assert_eq!(stored.icon, None);
    assert_eq!(stored.color.as_deref(), Some("blue"));
    assert!(!stored.is_active);
    assert_eq!(stored.current_balance, Some(dec("70")));
    assert!(
        conn.find_accounts(&AccountFilter::active(OWNER))
            .unwrap()
            .iter()
            .all(|a| a.id != bank.id)
    );
}

#[test]
fn ledger_operations_persist() {
    let conn = setup();
    let bank = add_account(&conn, "Bank", AccountType::Asset, Some("100"));
    let card = add_account(&conn, "Card", AccountType::Liability, None);
    let food = add_account(&conn, "Food", AccountType::Expense, None);
    let ledger = TransactionLedger::new(&conn);

    let tx = ledger
        .create_transaction(OWNER, spend("12.50", &food, &bank))
        .unwrap();
    let stored = conn.get_transaction(&tx.id).unwrap().unwrap();
    assert_eq!(stored, tx);
    assert_eq!(
        conn.get_account(&bank.id).unwrap().unwrap().current_balance,
        Some(dec("87.50"))
    );

    ledger
        .update_transaction(
            OWNER,
            &tx.id,
            TransactionPatch {
                credit_account_id: Some(card.id.clone()),
                note: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();
    let stored = conn.get_transaction(&tx.id).unwrap().unwrap();
    assert_eq!(stored.credit_account_id, card.id);
    assert_eq!(stored.note, None);
    assert_eq!(stored.tags, tx.tags);
    assert_eq!(
        conn.get_account(&bank.id).unwrap().unwrap().current_balance,
        Some(dec("100.00"))
    );
    assert_eq!(
        conn.get_account(&card.id).unwrap().unwrap().current_balance,
        Some(dec("12.50"))
    );

    let by_card = ledger
        .list(
            OWNER,
            &TransactionQuery {
                account_id: Some(card.id.clone()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(by_card.len(), 1);

    ledger.delete_transaction(OWNER, &tx.id).unwrap();
    assert!(conn.get_transaction(&tx.id).unwrap().is_none());
    assert_eq!(
        conn.get_account(&card.id).unwrap().unwrap().current_balance,
        Some(Decimal::ZERO)
    );
    assert!(
        reconcile(&conn, OWNER)
            .unwrap()
            .iter()
            .all(|c| c.is_consistent())
    );
}

#[test]
fn failing_write_rolls_back_whole_batch() {
    let conn = setup();
    let bank = add_account(&conn, "Bank", AccountType::Asset, Some("100"));
    let food = add_account(&conn, "Food", AccountType::Expense, None);
    let tx = TransactionLedger::new(&conn)
        .create_transaction(OWNER, spend("10", &food, &bank))
        .unwrap();

    let mut batch = Batch::new();
    batch
        .push(Write::DeleteTransaction(tx.id.clone()))
        .increment(&bank.id, dec("10"))
        .increment("ghost", dec("1"));
    let err = conn.commit(batch).unwrap_err();
    assert!(matches!(err, StoreError::Missing(ref id) if id == "ghost"));

    assert!(conn.get_transaction(&tx.id).unwrap().is_some());
    assert_eq!(
        conn.get_account(&bank.id).unwrap().unwrap().current_balance,
        Some(dec("90"))
    );

    // Incrementing a label account is a corrupt write.
    let mut batch = Batch::new();
    batch.increment(&food.id, dec("1"));
    assert!(matches!(
        conn.commit(batch).unwrap_err(),
        StoreError::Corrupt(_)
    ));
}

#[test]
fn recurring_round_trip() {
    let conn = setup();
    let bank = add_account(&conn, "Bank", AccountType::Asset, None);
    let gym = add_account(&conn, "Gym", AccountType::Expense, None);
    let schedules = RecurringSchedules::new(&conn);

    let rec = schedules
        .create(
            OWNER,
            NewRecurring {
                amount: dec("45"),
                debit_account_id: gym.id.clone(),
                credit_account_id: bank.id.clone(),
                frequency: Frequency::Weekly,
                day_of_recurrence: 1,
                start_date: "2025-03-01".to_string(),
                end_date: Some("2025-12-31".to_string()),
                notify_before_days: Some(2),
                note: None,
            },
        )
        .unwrap();
    assert_eq!(conn.get_recurring(&rec.id).unwrap().unwrap(), rec);

    let advanced = schedules
        .record_materialized(OWNER, &rec.id, "2025-03-03")
        .unwrap();
    assert_eq!(conn.get_recurring(&rec.id).unwrap().unwrap(), advanced);
    assert_eq!(conn.find_recurring(OWNER).unwrap().len(), 1);

    schedules.delete(OWNER, &rec.id).unwrap();
    assert!(conn.get_recurring(&rec.id).unwrap().is_none());
}

#[test]
fn file_database_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("book.sqlite");

    let bank_id = {
        let conn = db::open_or_init(Some(path.as_path())).unwrap();
        let bank = add_account(&conn, "Bank", AccountType::Asset, Some("5"));
        let salary = add_account(&conn, "Salary", AccountType::Income, None);
        TransactionLedger::new(&conn)
            .create_transaction(OWNER, spend("20", &bank, &salary))
            .unwrap();
        bank.id
    };

    let conn = db::open_or_init(Some(path.as_path())).unwrap();
    assert_eq!(
        conn.get_account(&bank_id).unwrap().unwrap().current_balance,
        Some(dec("25"))
    );
    assert_eq!(
        TransactionLedger::new(&conn)
            .list(OWNER, &TransactionQuery::default())
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn concurrent_writers_keep_balances_exact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.sqlite");
    let conn = db::open_or_init(Some(path.as_path())).unwrap();
    let bank = add_account(&conn, "Bank", AccountType::Asset, Some("0"));
    let salary = add_account(&conn, "Salary", AccountType::Income, None);

    let workers: Vec<_> = (0..4)
        .map(|_| db::open_or_init(Some(path.as_path())).unwrap())
        .map(|worker| {
            let bank = bank.clone();
            let salary = salary.clone();
            std::thread::spawn(move || {
                let ledger = TransactionLedger::new(&worker);
                for _ in 0..50 {
                    ledger
                        .create_transaction(OWNER, spend("1", &bank, &salary))
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(
        conn.get_account(&bank.id).unwrap().unwrap().current_balance,
        Some(dec("200"))
    );
    assert_eq!(
        TransactionLedger::new(&conn)
            .list(OWNER, &TransactionQuery::default())
            .unwrap()
            .len(),
        200
    );
    assert!(
        reconcile(&conn, OWNER)
            .unwrap()
            .iter()
            .all(|c| c.is_consistent())
    );
}
