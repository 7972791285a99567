use std::{fs::OpenOptions, path::PathBuf, process::ExitCode, sync::Arc};

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use spendwise::{
    AppState, SharedClock,
    analytics::{SortConfig, SortDirection, SortKey},
    chart::{chart_page, monthly_expenses_chart},
    clock::{Clock, FixedClock, SystemClock},
    display::{format_currency, format_date},
    quota::{DEFAULT_ADD_LIMIT, DEFAULT_LIST_LIMIT, QuotaLimits},
    transaction::{NewTransaction, Transaction, TransactionKind},
};

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Record income and expenses and summarise spending by month.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "SPENDWISE_DB_PATH", default_value = "spendwise.db")]
    db_path: PathBuf,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    #[arg(long, env = "SPENDWISE_TIMEZONE", default_value = "Etc/UTC")]
    timezone: String,

    /// Treat this date (YYYY-MM-DD) as today.
    #[arg(long, value_parser = parse_date)]
    today: Option<Date>,

    /// The maximum number of transactions that can be added per day.
    #[arg(long, default_value_t = DEFAULT_ADD_LIMIT)]
    add_limit: u32,

    /// The maximum number of times transactions can be listed per day.
    #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
    list_limit: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the session ID, creating one if this is the first run.
    Session,

    /// Record a transaction.
    Add {
        /// The amount of money earned or spent, must be positive.
        #[arg(long)]
        amount: f64,

        /// Either "income" or "expense".
        #[arg(long, default_value = "expense")]
        kind: TransactionKind,

        /// What the transaction was for.
        #[arg(long)]
        description: String,

        /// When the transaction happened (YYYY-MM-DD), defaults to now.
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,
    },

    /// Print the transactions of this session as a table.
    List {
        /// Only show transactions whose description contains this text.
        #[arg(long, short, default_value = "")]
        search: String,

        /// The column to sort by: date, description, amount or type.
        #[arg(long, default_value = "date")]
        sort: SortKey,

        /// The sort direction: asc or desc.
        #[arg(long, default_value = "desc")]
        direction: SortDirection,
    },

    /// Print the expense totals of the last six months.
    Summary {
        /// Also write the totals as a bar chart to this HTML file.
        #[arg(long)]
        chart_path: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    setup_logging();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error}");
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let system_clock = SystemClock::new(&args.timezone)?;
    let clock: SharedClock = match args.today {
        Some(today) => Arc::new(FixedClock(system_clock.now().replace_date(today))),
        None => Arc::new(system_clock),
    };

    let limits = QuotaLimits {
        add: args.add_limit,
        list: args.list_limit,
    };

    let conn = Connection::open(&args.db_path)?;
    let state = AppState::new(conn, clock, limits)?;
    let session_id = state.start_session();

    match args.command {
        Command::Session => println!("{session_id}"),
        Command::Add {
            amount,
            kind,
            description,
            date,
        } => {
            let date = match date {
                Some(date) => state.clock().now().replace_date(date),
                None => state.clock().now(),
            };
            let transaction = NewTransaction::new(amount, date, &description, kind)?;
            let id = state.add_transaction(&transaction)?;
            println!("Added transaction {id}");
        }
        Command::List {
            search,
            sort,
            direction,
        } => {
            let transactions = state.transaction_view(
                &search,
                SortConfig {
                    key: sort,
                    direction,
                },
            )?;
            print_transactions(&transactions);
        }
        Command::Summary { chart_path } => {
            let buckets = state.monthly_summary()?;

            for bucket in &buckets {
                println!("{:<10}{:>14}", bucket.label, format_currency(bucket.total));
            }

            if let Some(chart_path) = chart_path {
                std::fs::write(&chart_path, chart_page(&monthly_expenses_chart(&buckets)))?;
                println!("Wrote chart to {}", chart_path.display());
            }
        }
    }

    Ok(())
}

fn print_transactions(transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("No transactions found.");
        return;
    }

    println!(
        "{:<14}{:<32}{:>14}  {}",
        "Date", "Description", "Amount", "Type"
    );

    for transaction in transactions {
        println!(
            "{:<14}{:<32}{:>14}  {}",
            format_date(transaction.date.date()),
            transaction.description.as_ref(),
            format_currency(transaction.amount),
            transaction.kind.label()
        );
    }
}

fn parse_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text, DATE_FORMAT)
}

fn setup_logging() {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let console_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let debug_log = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .ok()
        .map(|log_file| {
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_ansi(false)
                .with_writer(Arc::new(log_file))
                .with_filter(filter::LevelFilter::DEBUG)
        });

    tracing_subscriber::registry()
        .with(console_log)
        .with(debug_log)
        .init();
}
