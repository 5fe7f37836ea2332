// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Full-history recomputation of balances, used to check the incrementally
//! maintained `current_balance` of every balance-bearing account.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::LedgerResult;
use crate::models::AccountType;
use crate::rules::{Side, effect, has_balance};
use crate::store::{AccountFilter, DocumentStore, TransactionFilter};

#[derive(Debug, Clone, Serialize)]
pub struct BalanceCheck {
    pub account_id: String,
    pub name: String,
    pub account_type: AccountType,
    pub opening_balance: Decimal,
    pub stored_balance: Decimal,
    pub derived_balance: Decimal,
    pub drift: Decimal,
}

impl BalanceCheck {
    pub fn is_consistent(&self) -> bool {
        self.drift.is_zero()
    }
}

/// Recompute `opening_balance + sum(effects)` for each of the owner's
/// balance-bearing accounts, active or not, and compare with the stored value.
pub fn reconcile<S>(store: &S, owner_id: &str) -> LedgerResult<Vec<BalanceCheck>>
where
    S: DocumentStore + ?Sized,
{
    let accounts = store.find_accounts(&AccountFilter::owner(owner_id))?;
    let types: HashMap<&str, AccountType> = accounts
        .iter()
        .map(|a| (a.id.as_str(), a.account_type))
        .collect();

    let mut sums: HashMap<&str, Decimal> = HashMap::new();
    let transactions = store.find_transactions(&TransactionFilter {
        owner_id: owner_id.to_string(),
        account_id: None,
    })?;
    for tx in &transactions {
        for (id, side) in [
            (tx.debit_account_id.as_str(), Side::Debit),
            (tx.credit_account_id.as_str(), Side::Credit),
        ] {
            if let Some((key, kind)) = types.get_key_value(id) {
                *sums.entry(*key).or_default() += effect(*kind, tx.amount, side);
            }
        }
    }

    let mut checks: Vec<BalanceCheck> = accounts
        .iter()
        .filter(|a| has_balance(a.account_type))
        .map(|a| {
            let opening = a.opening_balance.unwrap_or_default();
            let stored = a.current_balance.unwrap_or_default();
            let derived = opening + sums.get(a.id.as_str()).copied().unwrap_or_default();
            BalanceCheck {
                account_id: a.id.clone(),
                name: a.name.clone(),
                account_type: a.account_type,
                opening_balance: opening,
                stored_balance: stored,
                derived_balance: derived,
                drift: stored - derived,
            }
        })
        .collect();
    checks.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(checks)
}
