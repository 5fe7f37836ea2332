// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

pub const DEFAULT_OWNER: &str = "local";

/// Owner identity resolved from `--owner` / `DUALBOOK_OWNER`.
pub fn owner(m: &ArgMatches) -> &str {
    m.get_one::<String>("owner")
        .map(String::as_str)
        .unwrap_or(DEFAULT_OWNER)
}

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn opt(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).help(help)
}

fn req(name: &'static str, help: &'static str) -> Arg {
    opt(name, help).required(true)
}

fn account_cmd() -> Command {
    Command::new("account")
        .about("Manage accounts")
        .subcommand_required(true)
        .subcommand(json_flags(
            Command::new("add")
                .about("Create an account")
                .arg(req("name", "Account name"))
                .arg(req("type", "asset|liability|income|expense"))
                .arg(req("parent", "Parent category"))
                .arg(req("sub", "Sub category"))
                .arg(opt("opening", "Opening balance (asset/liability only)"))
                .arg(opt("icon", "Icon"))
                .arg(opt("color", "Color")),
        ))
        .subcommand(json_flags(
            Command::new("list").about("List accounts").arg(
                Arg::new("all")
                    .long("all")
                    .action(ArgAction::SetTrue)
                    .help("Include inactive accounts"),
            ),
        ))
        .subcommand(
            Command::new("edit")
                .about("Edit account name, icon, color or active flag")
                .arg(req("account", "Account id or name"))
                .arg(opt("name", "New name"))
                .arg(opt("icon", "New icon (empty clears)"))
                .arg(opt("color", "New color (empty clears)"))
                .arg(
                    Arg::new("active")
                        .long("active")
                        .value_parser(value_parser!(bool))
                        .help("true|false"),
                ),
        )
        .subcommand(
            Command::new("deactivate")
                .about("Deactivate an account, keeping its history")
                .arg(req("account", "Account id or name")),
        )
}

fn tx_cmd() -> Command {
    let tags = || {
        Arg::new("tag")
            .long("tag")
            .action(ArgAction::Append)
            .help("Tag (repeatable)")
    };
    Command::new("tx")
        .about("Record and edit transactions")
        .subcommand_required(true)
        .subcommand(json_flags(
            Command::new("add")
                .about("Record a transaction")
                .arg(req("date", "YYYY-MM-DD"))
                .arg(req("amount", "Positive amount"))
                .arg(req("debit", "Debit (receiving) account id or name"))
                .arg(req("credit", "Credit (giving) account id or name"))
                .arg(opt("note", "Note"))
                .arg(tags()),
        ))
        .subcommand(json_flags(
            Command::new("edit")
                .about("Edit a transaction")
                .arg(req("id", "Transaction id"))
                .arg(opt("date", "YYYY-MM-DD"))
                .arg(opt("amount", "Positive amount"))
                .arg(opt("debit", "Debit account id or name"))
                .arg(opt("credit", "Credit account id or name"))
                .arg(opt("note", "Note (empty clears)"))
                .arg(tags()),
        ))
        .subcommand(json_flags(
            Command::new("rm")
                .about("Delete a transaction")
                .arg(req("id", "Transaction id")),
        ))
        .subcommand(json_flags(
            Command::new("list")
                .about("List transactions, newest first")
                .arg(opt("account", "Account id or name"))
                .arg(opt("month", "YYYY-MM"))
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(usize)),
                ),
        ))
}

fn recurring_cmd() -> Command {
    let day = || {
        Arg::new("day")
            .long("day")
            .value_parser(value_parser!(u32))
            .help("Weekday 0-6 (0 = Sunday) for weekly, day of month 1-31 otherwise")
    };
    let notify = || {
        Arg::new("notify-before")
            .long("notify-before")
            .value_parser(value_parser!(u32))
            .help("Days before an occurrence to remind")
    };
    Command::new("recurring")
        .about("Manage recurring schedules")
        .subcommand_required(true)
        .subcommand(json_flags(
            Command::new("add")
                .about("Create a recurring schedule")
                .arg(req("amount", "Positive amount"))
                .arg(req("debit", "Debit account id or name"))
                .arg(req("credit", "Credit account id or name"))
                .arg(req("frequency", "daily|weekly|monthly|yearly"))
                .arg(day().required(true))
                .arg(req("start", "Start date YYYY-MM-DD"))
                .arg(opt("end", "End date YYYY-MM-DD"))
                .arg(notify())
                .arg(opt("note", "Note")),
        ))
        .subcommand(json_flags(
            Command::new("edit")
                .about("Edit a recurring schedule")
                .arg(req("id", "Schedule id"))
                .arg(opt("amount", "Positive amount"))
                .arg(opt("debit", "Debit account id or name"))
                .arg(opt("credit", "Credit account id or name"))
                .arg(opt("frequency", "daily|weekly|monthly|yearly"))
                .arg(day())
                .arg(opt("start", "Start date YYYY-MM-DD"))
                .arg(opt("end", "End date YYYY-MM-DD"))
                .arg(
                    Arg::new("clear-end")
                        .long("clear-end")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("end"),
                )
                .arg(notify())
                .arg(
                    Arg::new("clear-notify")
                        .long("clear-notify")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("notify-before"),
                )
                .arg(
                    Arg::new("active")
                        .long("active")
                        .value_parser(value_parser!(bool)),
                )
                .arg(opt("note", "Note (empty clears)")),
        ))
        .subcommand(
            Command::new("rm")
                .about("Delete a recurring schedule")
                .arg(req("id", "Schedule id")),
        )
        .subcommand(json_flags(
            Command::new("list").about("List recurring schedules"),
        ))
        .subcommand(
            Command::new("materialized")
                .about("Record that a transaction was created from a schedule")
                .arg(req("id", "Schedule id"))
                .arg(req("date", "Date the transaction was created for")),
        )
        .subcommand(json_flags(
            Command::new("due")
                .about("Schedules due on or before a date")
                .arg(opt("on", "YYYY-MM-DD (default today)"))
                .arg(
                    Arg::new("reminders")
                        .long("reminders")
                        .action(ArgAction::SetTrue)
                        .help("Show schedules inside their notify window instead"),
                ),
        ))
}

pub fn build_cli() -> Command {
    Command::new("dualbook")
        .version(clap::crate_version!())
        .about("Personal double-entry bookkeeping ledger")
        .arg(
            Arg::new("owner")
                .long("owner")
                .env("DUALBOOK_OWNER")
                .default_value(DEFAULT_OWNER)
                .global(true)
                .help("Owner identity all operations run as"),
        )
        .arg(
            Arg::new("db")
                .long("db")
                .env("DUALBOOK_DB")
                .global(true)
                .help("SQLite database path (defaults to the platform data dir)"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(account_cmd())
        .subcommand(tx_cmd())
        .subcommand(recurring_cmd())
        .subcommand(
            Command::new("export")
                .about("Export data")
                .subcommand_required(true)
                .subcommand(
                    Command::new("transactions")
                        .about("Export transactions")
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .default_value("csv")
                                .help("csv|json"),
                        )
                        .arg(req("out", "Output path")),
                ),
        )
        .subcommand(json_flags(
            Command::new("doctor").about("Reconcile stored balances against history"),
        ))
}
