// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use fairway_ledger::{Engine, TransactionKind, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;

/// Fairway Ledger - Replay payment CSV files through the wagering engine
///
/// Reads deposits and withdrawals from a CSV file, runs them through the
/// engine (instant gateway, limits enforced), and writes per-user money
/// summaries to stdout.
#[derive(Parser, Debug)]
#[command(name = "fairway-ledger")]
#[command(about = "Replays payment CSVs through the wagering engine", long_about = None)]
struct Args {
    /// Path to CSV file with payment commands
    ///
    /// Expected format: type,user,amount
    /// Example: cargo run -- payments.csv > summaries.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    let args = Args::parse();

    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    let engine = match process_payments(BufReader::new(file)) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error processing payments: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_summaries(&engine, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, user, amount`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    kind: String,
    user: u64,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
}

impl CsvRecord {
    /// Converts the record into a payment command.
    ///
    /// Returns `None` for unknown command types or a missing amount.
    fn into_command(self) -> Option<(TransactionKind, UserId, Decimal)> {
        let user_id = UserId(self.user);
        let amount = self.amount?;

        match self.kind.to_lowercase().as_str() {
            "deposit" => Some((TransactionKind::Deposit, user_id, amount)),
            "withdrawal" => Some((TransactionKind::Withdrawal, user_id, amount)),
            _ => None,
        }
    }
}

/// Per-user output row with 2-decimal money columns.
#[derive(Debug, Serialize)]
struct SummaryRow {
    user: u64,
    balance: Decimal,
    deposited: Decimal,
    withdrawn: Decimal,
}

/// Replays payment commands from a CSV reader through a fresh engine.
///
/// Streaming parse; malformed rows and rejected commands (limit breaches,
/// insufficient balance) are skipped, reported on stderr in debug builds.
/// Unknown users are auto-seeded with no limits.
///
/// # CSV Format
///
/// Expected columns: `type, user, amount`
/// - `type`: `deposit` or `withdrawal`
/// - `user`: User ID (u64)
/// - `amount`: Decimal amount
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
pub fn process_payments<R: Read>(reader: R) -> Result<Engine, csv::Error> {
    let engine = Engine::with_instant_gateway();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    for result in rdr.deserialize::<CsvRecord>() {
        match result {
            Ok(record) => {
                let Some((kind, user_id, amount)) = record.into_command() else {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping invalid payment record");
                    continue;
                };

                engine.ledger().ensure_account(user_id, format!("user-{user_id}"));

                let outcome = match kind {
                    TransactionKind::Deposit => engine.deposit(user_id, amount, "csv"),
                    TransactionKind::Withdrawal => engine.withdraw(user_id, amount, "csv"),
                };
                if let Err(_e) = outcome {
                    #[cfg(debug_assertions)]
                    eprintln!("Skipping {kind} for user {user_id}: {_e}");
                }
            }
            Err(_e) => {
                #[cfg(debug_assertions)]
                eprintln!("Skipping malformed row: {_e}");
                continue;
            }
        }
    }

    Ok(engine)
}

/// Writes per-user summaries to a CSV writer.
///
/// # CSV Format
///
/// Columns: `user, balance, deposited, withdrawn`
///
/// # Errors
///
/// Returns a CSV error if writing fails.
pub fn write_summaries<W: Write>(engine: &Engine, writer: W) -> Result<(), csv::Error> {
    const MONEY_PRECISION: u32 = 2;

    let mut wtr = Writer::from_writer(writer);

    let mut user_ids = engine.ledger().user_ids();
    user_ids.sort();

    for user_id in user_ids {
        let Ok(summary) = engine.user_summary(user_id) else {
            continue;
        };
        wtr.serialize(SummaryRow {
            user: user_id.0,
            balance: summary.balance.round_dp(MONEY_PRECISION),
            deposited: summary.deposited.round_dp(MONEY_PRECISION),
            withdrawn: summary.withdrawn.round_dp(MONEY_PRECISION),
        })?;
    }

    wtr.flush()?;
    Ok(())
}
