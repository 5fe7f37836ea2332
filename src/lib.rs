// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod cli;
pub mod commands;
pub mod db;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod recurrence;
pub mod reports;
pub mod rules;
pub mod store;
pub mod utils;

pub use error::{ErrorKind, LedgerError, LedgerResult};
