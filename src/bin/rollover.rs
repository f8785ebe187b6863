use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use finance_recorder::{Ledger, LedgerConfig, PeriodLabel, Rollover, local_now};

/// Run a rollover by hand, e.g. after the server was down at the start of a month.
///
/// Owners that were already rolled over for the period are left unchanged.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The period to archive, formatted as YYYY-MM. Defaults to the month
    /// before the current month in `timezone`.
    #[arg(long)]
    period: Option<PeriodLabel>,

    /// The canonical timezone used to work out the default period.
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let period = match args.period {
        Some(period) => period,
        None => match local_now(&args.timezone) {
            Ok(now) => PeriodLabel::containing(now.date()).previous(),
            Err(error) => {
                tracing::error!("{error}");
                exit(1);
            }
        },
    };

    let ledger = match Connection::open(&args.db_path)
        .map_err(finance_recorder::Error::from)
        .and_then(|conn| Ledger::new(conn, LedgerConfig::default()))
    {
        Ok(ledger) => ledger,
        Err(error) => {
            tracing::error!("Could not open the database at {}: {error}", args.db_path);
            exit(1);
        }
    };

    match Rollover::new(ledger).run(period).await {
        Ok(report) if report.failed.is_empty() => {}
        Ok(report) => {
            for (owner, error) in &report.failed {
                tracing::error!("Owner {owner} was not rolled over: {error}");
            }
            exit(1);
        }
        Err(error) => {
            tracing::error!("Rollover for {period} did not run: {error}");
            exit(1);
        }
    }
}
