// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long a writer waits on another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Dualbook", "dualbook"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("dualbook.sqlite"))
}

/// Open the database at `path`, or at the platform data dir when `None`.
pub fn open_or_init(path: Option<&Path>) -> Result<Connection> {
    let path = match path {
        Some(p) => {
            if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            p.to_path_buf()
        }
        None => db_path()?,
    };
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT).context("Failed to set busy timeout")?;
    init_schema(&conn)?;
    tracing::debug!(path = %path.display(), "database ready");
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    CREATE TABLE IF NOT EXISTS accounts(
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL,
        name TEXT NOT NULL,
        account_type TEXT NOT NULL CHECK(account_type IN ('asset','liability','income','expense')),
        parent_category TEXT NOT NULL,
        sub_category TEXT NOT NULL,
        icon TEXT,
        color TEXT,
        opening_balance TEXT,
        current_balance TEXT,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        CHECK((opening_balance IS NULL) = (current_balance IS NULL))
    );
    CREATE INDEX IF NOT EXISTS idx_accounts_owner ON accounts(owner_id, is_active);

    -- Account ids are not foreign keys; a transaction may outlive its account.
    CREATE TABLE IF NOT EXISTS transactions(
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL,
        date TEXT NOT NULL,
        amount TEXT NOT NULL,
        debit_account_id TEXT NOT NULL,
        credit_account_id TEXT NOT NULL,
        note TEXT,
        tags TEXT, -- JSON array
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_owner_date ON transactions(owner_id, date);
    CREATE INDEX IF NOT EXISTS idx_transactions_debit ON transactions(debit_account_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_credit ON transactions(credit_account_id);

    CREATE TABLE IF NOT EXISTS recurring_transactions(
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL,
        amount TEXT NOT NULL,
        debit_account_id TEXT NOT NULL,
        credit_account_id TEXT NOT NULL,
        frequency TEXT NOT NULL CHECK(frequency IN ('daily','weekly','monthly','yearly')),
        day_of_recurrence INTEGER NOT NULL,
        start_date TEXT NOT NULL,
        end_date TEXT,
        next_occurrence TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        notify_before_days INTEGER,
        last_created_date TEXT,
        note TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_recurring_owner ON recurring_transactions(owner_id);
    "#,
    )?;
    Ok(())
}
