// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Account lifecycle: creation, profile edits and soft deletion.
//!
//! Account type and categories are fixed at creation. Balances are never
//! touched here; they only move through the transaction ledger.

use chrono::Utc;
use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Account, AccountType};
use crate::rules::has_balance;
use crate::store::{AccountChanges, AccountFilter, Batch, DocumentStore, Write};
use crate::utils::{new_id, optional_text, required_text};

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub account_type: AccountType,
    pub parent_category: String,
    pub sub_category: String,
    pub opening_balance: Option<Decimal>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Editable account fields. Empty `icon`/`color` clear the value.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

pub struct AccountStore<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: DocumentStore + ?Sized> AccountStore<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn create_account(&self, owner_id: &str, input: NewAccount) -> LedgerResult<Account> {
        let name = required_text(&input.name, "account name")?;
        let parent_category = required_text(&input.parent_category, "parent category")?;
        let sub_category = required_text(&input.sub_category, "sub category")?;

        let (opening_balance, current_balance) = if has_balance(input.account_type) {
            let opening = input.opening_balance.unwrap_or(Decimal::ZERO);
            if opening < Decimal::ZERO {
                return Err(LedgerError::InvalidArgument(format!(
                    "opening balance must not be negative, got {}",
                    opening
                )));
            }
            (Some(opening), Some(opening))
        } else {
            (None, None)
        };

        self.ensure_name_free(owner_id, &name, None)?;

        let now = Utc::now();
        let account = Account {
            id: new_id(),
            owner_id: owner_id.to_string(),
            name,
            account_type: input.account_type,
            parent_category,
            sub_category,
            icon: optional_text(input.icon.as_deref()),
            color: optional_text(input.color.as_deref()),
            opening_balance,
            current_balance,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let mut batch = Batch::new();
        batch.push(Write::InsertAccount(account.clone()));
        self.store.commit(batch)?;
        tracing::info!(
            account_id = %account.id,
            owner_id,
            account_type = %account.account_type,
            "account created"
        );
        Ok(account)
    }

    pub fn update_account(
        &self,
        owner_id: &str,
        account_id: &str,
        patch: AccountPatch,
    ) -> LedgerResult<()> {
        let existing = self.owned(owner_id, account_id)?;

        let name = patch
            .name
            .as_deref()
            .map(|n| required_text(n, "account name"))
            .transpose()?;

        let renamed = name
            .as_deref()
            .is_some_and(|n| n.to_lowercase() != existing.name.to_lowercase());
        let reactivated = patch.is_active == Some(true) && !existing.is_active;
        let will_be_active = patch.is_active.unwrap_or(existing.is_active);
        if will_be_active && (renamed || reactivated) {
            let effective = name.as_deref().unwrap_or(&existing.name);
            self.ensure_name_free(owner_id, effective, Some(&existing.id))?;
        }

        let changes = AccountChanges {
            name,
            icon: patch.icon.map(|v| optional_text(Some(&v))),
            color: patch.color.map(|v| optional_text(Some(&v))),
            is_active: patch.is_active,
            updated_at: Utc::now(),
        };
        let mut batch = Batch::new();
        batch.push(Write::UpdateAccount {
            id: existing.id.clone(),
            changes,
        });
        self.store.commit(batch)?;
        tracing::info!(account_id, owner_id, "account updated");
        Ok(())
    }

    /// Soft delete. Balance and referencing transactions are retained.
    pub fn deactivate_account(&self, owner_id: &str, account_id: &str) -> LedgerResult<()> {
        let existing = self.owned(owner_id, account_id)?;
        let mut batch = Batch::new();
        batch.push(Write::UpdateAccount {
            id: existing.id,
            changes: AccountChanges {
                name: None,
                icon: None,
                color: None,
                is_active: Some(false),
                updated_at: Utc::now(),
            },
        });
        self.store.commit(batch)?;
        tracing::info!(account_id, owner_id, "account deactivated");
        Ok(())
    }

    pub fn get(&self, owner_id: &str, account_id: &str) -> LedgerResult<Account> {
        self.owned(owner_id, account_id)
    }

    pub fn list(&self, owner_id: &str, include_inactive: bool) -> LedgerResult<Vec<Account>> {
        let filter = if include_inactive {
            AccountFilter::owner(owner_id)
        } else {
            AccountFilter::active(owner_id)
        };
        let mut accounts = self.store.find_accounts(&filter)?;
        accounts.sort_by_key(|a| a.name.to_lowercase());
        Ok(accounts)
    }

    fn owned(&self, owner_id: &str, account_id: &str) -> LedgerResult<Account> {
        let account = self
            .store
            .get_account(account_id)?
            .ok_or_else(|| LedgerError::NotFound(format!("account {}", account_id)))?;
        if account.owner_id != owner_id {
            return Err(LedgerError::PermissionDenied(format!(
                "account {} belongs to another owner",
                account_id
            )));
        }
        Ok(account)
    }

    fn ensure_name_free(
        &self,
        owner_id: &str,
        name: &str,
        except: Option<&str>,
    ) -> LedgerResult<()> {
        let wanted = name.to_lowercase();
        let clash = self
            .store
            .find_accounts(&AccountFilter::active(owner_id))?
            .into_iter()
            .filter(|a| except != Some(a.id.as_str()))
            .find(|a| a.name.to_lowercase() == wanted);
        if let Some(other) = clash {
            return Err(LedgerError::AlreadyExists(format!(
                "an active account named '{}' already exists ({})",
                other.name, other.id
            )));
        }
        Ok(())
    }
}
