// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use dualbook::{cli, commands, db, logging, LedgerError};

fn run(matches: &clap::ArgMatches) -> Result<()> {
    let db_arg = matches.get_one::<String>("db").map(Path::new);
    let conn = db::open_or_init(db_arg)?;

    match matches.subcommand() {
        Some(("init", _)) => match db_arg {
            Some(p) => println!("Database initialized at {}", p.display()),
            None => println!("Database initialized at {}", db::db_path()?.display()),
        },
        Some(("account", sub)) => commands::accounts::handle(&conn, sub)?,
        Some(("tx", sub)) => commands::transactions::handle(&conn, sub)?,
        Some(("recurring", sub)) => commands::recurring::handle(&conn, sub)?,
        Some(("export", sub)) => commands::exporter::handle(&conn, sub)?,
        Some(("doctor", sub)) => commands::doctor::handle(&conn, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    logging::init();
    let matches = cli::build_cli().get_matches();

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(ledger_err) = err.downcast_ref::<LedgerError>() {
                tracing::debug!(kind = ?ledger_err.kind(), "request rejected");
                match serde_json::to_string(&ledger_err.report()) {
                    Ok(report) => eprintln!("{}", report),
                    Err(_) => eprintln!("Error: {}", ledger_err),
                }
            } else {
                eprintln!("Error: {:#}", err);
            }
            ExitCode::FAILURE
        }
    }
}
