use std::error::Error;
use std::path::Path;
use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use rusqlite::Connection;
use time::Duration;

use spendwise::{
    AppState,
    clock::{Clock, SystemClock},
    quota::QuotaLimits,
    transaction::{NewTransaction, TransactionKind},
};

/// A utility for creating a test database for spendwise.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,
}

/// Monthly sample transactions as (amount, description, kind, days after the monthly anchor).
const SAMPLES: [(f64, &str, TransactionKind, i64); 5] = [
    (3200.0, "Salary", TransactionKind::Income, 0),
    (1450.0, "Rent", TransactionKind::Expense, 1),
    (182.35, "Groceries", TransactionKind::Expense, 6),
    (64.9, "Power bill", TransactionKind::Expense, 12),
    (23.5, "Coffee with friends", TransactionKind::Expense, 20),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    let clock = SystemClock::new(&args.timezone)?;
    let now = clock.now();
    // Seeding more than a day's worth of transactions, so lift the add limit.
    let limits = QuotaLimits {
        add: u32::MAX,
        ..QuotaLimits::default()
    };
    let state = AppState::new(conn, Arc::new(clock), limits)?;

    let session_id = state.start_session();
    println!("Created session {session_id}");

    println!("Creating sample transactions...");

    let mut count = 0;
    for months_ago in (0..6).rev() {
        let anchor = now - Duration::days(30 * months_ago);

        for (amount, description, kind, day_offset) in SAMPLES {
            let date = anchor + Duration::days(day_offset);
            if date > now {
                continue;
            }

            state.add_transaction(&NewTransaction::new(amount, date, description, kind)?)?;
            count += 1;
        }
    }

    println!("Created {count} transactions.");
    println!("Success!");

    Ok(())
}
