use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use finance_recorder::{Ledger, LedgerConfig, OwnerId, Transaction, TransactionKind};

/// A utility for creating a test database for the JSON API server of finance_recorder.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    if output_path.extension().is_none_or(|extension| extension.is_empty()) {
        eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
        exit(1);
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let ledger = Ledger::new(Connection::open(output_path)?, LedgerConfig::default())?;

    println!("Creating test transactions for owner 1...");

    let owner = OwnerId::new(1);
    let now = OffsetDateTime::now_utc();
    ledger.set_limit(owner, "2000".parse()?).await?;

    let transactions = [
        (TransactionKind::Credit, "4500", "Bank Transfer", "Salary", 1),
        (TransactionKind::Debit, "1200", "Card", "Rent", 2),
        (TransactionKind::Debit, "86.40", "Card", "Groceries", 3),
        (TransactionKind::Withdrawal, "100", "Cash", "Other", 4),
    ];

    for (kind, amount, method, category, days_ago) in transactions {
        ledger
            .record_transaction(
                owner,
                Transaction::build(kind, amount.parse()?)
                    .method(method)
                    .category(category)
                    .occurred_at(now - Duration::days(days_ago)),
            )
            .await?;
    }

    println!("Success!");

    Ok(())
}
