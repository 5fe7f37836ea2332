// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use dualbook::accounts::{AccountPatch, AccountStore, NewAccount};
use dualbook::models::AccountType;
use dualbook::store::MemoryStore;
use dualbook::{ErrorKind, LedgerError};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn new_account(name: &str, account_type: AccountType, opening: Option<&str>) -> NewAccount {
    NewAccount {
        name: name.to_string(),
        account_type,
        parent_category: "Everyday".to_string(),
        sub_category: "General".to_string(),
        opening_balance: opening.map(dec),
        icon: None,
        color: None,
    }
}

#[test]
fn asset_starts_at_opening_balance() {
    let store = MemoryStore::new();
    let accounts = AccountStore::new(&store);
    let bank = accounts
        .create_account("alice", new_account("Bank", AccountType::Asset, Some("1000")))
        .unwrap();
    assert_eq!(bank.opening_balance, Some(dec("1000")));
    assert_eq!(bank.current_balance, Some(dec("1000")));
    assert!(bank.is_active);
}

#[test]
fn liability_defaults_to_zero_balance() {
    let store = MemoryStore::new();
    let card = AccountStore::new(&store)
        .create_account("alice", new_account("Card", AccountType::Liability, None))
        .unwrap();
    assert_eq!(card.opening_balance, Some(Decimal::ZERO));
    assert_eq!(card.current_balance, Some(Decimal::ZERO));
}

#[test]
fn income_and_expense_carry_no_balance_fields() {
    let store = MemoryStore::new();
    let accounts = AccountStore::new(&store);
    for (name, kind) in [("Salary", AccountType::Income), ("Food", AccountType::Expense)] {
        // Opening balance is ignored for label accounts.
        let acct = accounts
            .create_account("alice", new_account(name, kind, Some("50")))
            .unwrap();
        assert_eq!(acct.opening_balance, None);
        assert_eq!(acct.current_balance, None);
    }
}

#[test]
fn negative_opening_balance_is_rejected() {
    let store = MemoryStore::new();
    let err = AccountStore::new(&store)
        .create_account("alice", new_account("Bank", AccountType::Asset, Some("-0.01")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn blank_name_or_categories_are_rejected() {
    let store = MemoryStore::new();
    let accounts = AccountStore::new(&store);

    let err = accounts
        .create_account("alice", new_account("   ", AccountType::Asset, None))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let mut input = new_account("Bank", AccountType::Asset, None);
    input.parent_category = String::new();
    assert_eq!(
        accounts.create_account("alice", input).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );

    let mut input = new_account("Bank", AccountType::Asset, None);
    input.sub_category = " ".to_string();
    assert_eq!(
        accounts.create_account("alice", input).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
}

#[test]
fn duplicate_name_is_rejected_case_insensitively() {
    let store = MemoryStore::new();
    let accounts = AccountStore::new(&store);
    let bank = accounts
        .create_account("alice", new_account("Bank", AccountType::Asset, None))
        .unwrap();

    let err = accounts
        .create_account("alice", new_account("  bANK ", AccountType::Liability, None))
        .unwrap_err();
    match err {
        LedgerError::AlreadyExists(msg) => {
            assert!(msg.contains("Bank"));
            assert!(msg.contains(&bank.id));
        }
        other => panic!("expected AlreadyExists, got {other:?}"),
    }

    // Another owner may reuse the name.
    accounts
        .create_account("bob", new_account("Bank", AccountType::Asset, None))
        .unwrap();
}

#[test]
fn name_of_deactivated_account_can_be_reused() {
    let store = MemoryStore::new();
    let accounts = AccountStore::new(&store);
    let old = accounts
        .create_account("alice", new_account("Wallet", AccountType::Asset, None))
        .unwrap();
    accounts.deactivate_account("alice", &old.id).unwrap();
    accounts
        .create_account("alice", new_account("wallet", AccountType::Asset, None))
        .unwrap();

    // Reactivating the old one would now clash.
    let err = accounts
        .update_account(
            "alice",
            &old.id,
            AccountPatch {
                is_active: Some(true),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[test]
fn update_checks_existence_and_owner() {
    let store = MemoryStore::new();
    let accounts = AccountStore::new(&store);
    let bank = accounts
        .create_account("alice", new_account("Bank", AccountType::Asset, None))
        .unwrap();

    let err = accounts
        .update_account("alice", "missing", AccountPatch::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = accounts
        .update_account("mallory", &bank.id, AccountPatch::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let err = accounts.deactivate_account("mallory", &bank.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[test]
fn update_changes_profile_fields_only() {
    let store = MemoryStore::new();
    let accounts = AccountStore::new(&store);
    let bank = accounts
        .create_account("alice", new_account("Bank", AccountType::Asset, Some("10")))
        .unwrap();
    accounts
        .create_account("alice", new_account("Cash", AccountType::Asset, None))
        .unwrap();

    let err = accounts
        .update_account(
            "alice",
            &bank.id,
            AccountPatch {
                name: Some("  ".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = accounts
        .update_account(
            "alice",
            &bank.id,
            AccountPatch {
                name: Some("CASH".to_string()),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    accounts
        .update_account(
            "alice",
            &bank.id,
            AccountPatch {
                name: Some(" Main Bank ".to_string()),
                icon: Some("bank".to_string()),
                color: Some("#00ff00".to_string()),
                is_active: None,
            },
        )
        .unwrap();
    let after = accounts.get("alice", &bank.id).unwrap();
    assert_eq!(after.name, "Main Bank");
    assert_eq!(after.icon.as_deref(), Some("bank"));
    assert_eq!(after.color.as_deref(), Some("#00ff00"));
    assert_eq!(after.account_type, AccountType::Asset);
    assert_eq!(after.parent_category, "Everyday");
    assert_eq!(after.current_balance, Some(dec("10")));

    // Renaming to a different case of the same name is not a clash.
    accounts
        .update_account(
            "alice",
            &bank.id,
            AccountPatch {
                name: Some("main bank".to_string()),
                icon: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();
    let after = accounts.get("alice", &bank.id).unwrap();
    assert_eq!(after.name, "main bank");
    assert_eq!(after.icon, None);
}

#[test]
fn deactivation_keeps_balance() {
    let store = MemoryStore::new();
    let accounts = AccountStore::new(&store);
    let bank = accounts
        .create_account("alice", new_account("Bank", AccountType::Asset, Some("42.50")))
        .unwrap();
    accounts.deactivate_account("alice", &bank.id).unwrap();

    let after = accounts.get("alice", &bank.id).unwrap();
    assert!(!after.is_active);
    assert_eq!(after.current_balance, Some(dec("42.50")));
    assert!(accounts.list("alice", false).unwrap().is_empty());
    assert_eq!(accounts.list("alice", true).unwrap().len(), 1);
}
