// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Debit/credit sign conventions per account type.

use rust_decimal::Decimal;

use crate::models::AccountType;

/// Which side of a transaction an account sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Debit,
    Credit,
}

/// Only assets and liabilities store an opening and current balance.
pub fn has_balance(account_type: AccountType) -> bool {
    matches!(account_type, AccountType::Asset | AccountType::Liability)
}

/// Signed change to an account's balance when `amount` is posted on `side`.
///
/// | type | debit | credit |
/// |---|---|---|
/// | asset | +amount | -amount |
/// | liability | -amount | +amount |
/// | income / expense | 0 | 0 |
pub fn effect(account_type: AccountType, amount: Decimal, side: Side) -> Decimal {
    match (account_type, side) {
        (AccountType::Asset, Side::Debit) | (AccountType::Liability, Side::Credit) => amount,
        (AccountType::Asset, Side::Credit) | (AccountType::Liability, Side::Debit) => -amount,
        (AccountType::Income | AccountType::Expense, _) => Decimal::ZERO,
    }
}
