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
use csv::{ReaderBuilder, StringRecord, Trim};
use loyalty_ledger_rs::{LoyaltyEngine, LoyaltyError, MemoryLedger, ProgramConfig};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use thiserror::Error;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

/// Loyalty Ledger - Run invocation scripts against an in-memory ledger
///
/// Each CSV row is an invocation name followed by its positional arguments.
/// Query responses are written to stdout as one JSON document per line.
#[derive(Parser, Debug)]
#[command(name = "loyalty-ledger")]
#[command(about = "Runs loyalty program invocation scripts", long_about = None)]
struct Args {
    /// TOML file overriding index keys, event names and balances
    #[arg(long, env = "LOYALTY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also print every committed event envelope
    #[arg(long)]
    events: bool,

    /// Path to the invocation script
    ///
    /// Example row: createOwner,O1,admin,Program Admin
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,
}

#[derive(Debug, Error)]
enum ScriptError {
    #[error("malformed script row: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {source}")]
    Invocation {
        row: u64,
        #[source]
        source: LoyaltyError,
    },

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match ProgramConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to load config");
                process::exit(1);
            }
        },
        None => ProgramConfig::default(),
    };

    let file = match File::open(&args.script) {
        Ok(f) => f,
        Err(e) => {
            error!(path = %args.script.display(), error = %e, "failed to open script");
            process::exit(1);
        }
    };

    let engine = LoyaltyEngine::new(config);
    let ledger = MemoryLedger::new();
    let stdout = std::io::stdout();
    if let Err(e) = run_script(&engine, &ledger, BufReader::new(file), stdout.lock(), args.events) {
        error!(error = %e, "script aborted");
        process::exit(1);
    }
}

/// Runs every row of `reader` as one invocation against `ledger`.
///
/// Rejected invocations are logged and skipped; their error envelopes still
/// reach the event stream. A ledger failure stops the run.
///
/// # Errors
///
/// Returns the first malformed row, hard invocation failure, or output error.
fn run_script<R: Read, W: Write>(
    engine: &LoyaltyEngine,
    ledger: &MemoryLedger,
    reader: R,
    mut out: W,
    print_events: bool,
) -> Result<(), ScriptError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(false)
        .from_reader(reader);

    let mut record = StringRecord::new();
    while rdr.read_record(&mut record)? {
        let row = record.position().map_or(0, |position| position.line());
        let Some(name) = record.get(0) else {
            continue;
        };
        if name.is_empty() || name.starts_with('#') {
            continue;
        }
        let args: Vec<&str> = record.iter().skip(1).collect();
        debug!(row, name, args = args.len(), "running row");

        match engine.invoke(ledger, name, &args) {
            Ok(response) => {
                if let Some(json) = response.to_json()? {
                    writeln!(out, "{json}")?;
                }
            }
            Err(e) if e.is_rejection() => {
                warn!(row, name, reason = %e, "row rejected");
            }
            Err(e) => return Err(ScriptError::Invocation { row, source: e }),
        }

        if print_events {
            for event in ledger.take_events() {
                writeln!(out, "{}", String::from_utf8_lossy(&event.payload))?;
            }
        }
    }

    out.flush()?;
    Ok(())
}
