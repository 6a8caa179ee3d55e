//! Report CLI tool
//!
//! Prints per-user connected time from a termtally database without
//! modifying it.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use termtally_store::{SqliteStore, Store, write_csv, write_json};
use termtally_util::{DATABASE_FILENAME, default_data_dir};

enum Format {
    Table,
    Csv,
    Json,
}

fn usage() {
    eprintln!("Usage: termtally-report [--csv | --json] [database]");
    eprintln!();
    eprintln!("Prints cumulative connected minutes per user.");
    eprintln!();
    eprintln!(
        "If no database is provided, uses: {}",
        default_data_dir().join(DATABASE_FILENAME).display()
    );
}

fn main() -> ExitCode {
    let mut format = Format::Table;
    let mut db_path = None;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--csv" => format = Format::Csv,
            "--json" => format = Format::Json,
            "-h" | "--help" => {
                usage();
                return ExitCode::SUCCESS;
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown option: {}", other);
                usage();
                return ExitCode::from(2);
            }
            other => db_path = Some(PathBuf::from(other)),
        }
    }

    let db_path = db_path.unwrap_or_else(|| default_data_dir().join(DATABASE_FILENAME));
    if !db_path.exists() {
        eprintln!("Error: Database not found: {}", db_path.display());
        return ExitCode::from(1);
    }

    let store = match SqliteStore::open_read_only(&db_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: Failed to open {}: {}", db_path.display(), e);
            return ExitCode::from(1);
        }
    };

    let totals = match store.get_all() {
        Ok(totals) => totals,
        Err(e) => {
            eprintln!("Error: Failed to read totals: {}", e);
            return ExitCode::from(1);
        }
    };

    let result = match format {
        Format::Csv => write_csv(io::stdout().lock(), &totals),
        Format::Json => write_json(io::stdout().lock(), &totals),
        Format::Table => {
            if totals.is_empty() {
                println!("No usage recorded yet");
            } else {
                let width = totals
                    .iter()
                    .map(|t| t.username.as_str().len())
                    .max()
                    .unwrap_or(0)
                    .max("USER".len());
                println!("{:<width$}  {:>12}", "USER", "MINUTES", width = width);
                for total in &totals {
                    println!(
                        "{:<width$}  {:>12.2}",
                        total.username.as_str(),
                        total.minutes(),
                        width = width
                    );
                }
            }
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
