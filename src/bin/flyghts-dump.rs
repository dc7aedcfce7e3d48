//! Bulk flight dump CLI
//!
//! Fetches every movement (departures and arrivals, passenger and cargo)
//! at Hong Kong International Airport for a date window and writes CSV:
//! one file per date into a data directory, a single merged file, or
//! stdout.

use chrono::{Days, Local, NaiveDate};
use clap::{ArgGroup, Parser};
use flyghts_audit::{
    client::{ClientConfig, HkAirportClient},
    dump::{self, OutputTarget},
    storage,
    types::{DateFilter, Direction},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "flyghts-dump")]
#[command(about = "Dump all flight movements at Hong Kong International Airport to CSV", long_about = None)]
#[command(group(ArgGroup::new("window").args(["date", "days", "start"])))]
#[command(group(ArgGroup::new("target").args(["data_dir", "output"])))]
struct Cli {
    /// Single date (YYYY-MM-DD). Default: yesterday
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Past N days ending yesterday (inclusive)
    #[arg(short = 'n', long)]
    days: Option<u32>,

    /// Start of a date range (YYYY-MM-DD); requires --end
    #[arg(long, requires = "end")]
    start: Option<NaiveDate>,

    /// End of a date range (YYYY-MM-DD); requires --start
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,

    /// Write one YYYY-MM-DD.csv per date into this directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Write a single CSV file, merging with its existing content
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Exclude cargo flights (included by default)
    #[arg(long, overrides_with = "cargo")]
    no_cargo: bool,

    /// Include cargo flights (the default; negates an earlier --no-cargo)
    #[arg(long)]
    cargo: bool,

    /// Collapse records sharing (flight number, date, direction) before
    /// writing, keeping the first seen
    #[arg(long)]
    deduplicate: bool,

    /// Fetch one day raw, print the response structure to stderr, and exit
    #[arg(long)]
    debug: bool,

    /// Request timeout in seconds
    #[arg(long, env = "FLYGHTS_TIMEOUT", default_value = "30")]
    timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let dates = resolve_window(&cli)?;
    let include_cargo = !cli.no_cargo;

    let config = ClientConfig::new().with_timeout(Duration::from_secs(cli.timeout));
    let client = HkAirportClient::new(config)?;

    if cli.debug {
        return debug_response(&client, dates.start(), include_cargo).await;
    }

    let target = match (&cli.data_dir, &cli.output) {
        (Some(dir), None) => OutputTarget::DataDir(dir.clone()),
        (None, Some(path)) => OutputTarget::SingleFile(path.clone()),
        (None, None) => OutputTarget::Stdout,
        (Some(_), Some(_)) => unreachable!("clap rejects --data-dir with --output"),
    };

    let jobs = dump::plan_jobs(&dates, include_cargo);
    tracing::info!(%dates, batches = jobs.len(), include_cargo, "Starting dump");

    let progress = fetch_progress(jobs.len() as u64, matches!(target, OutputTarget::Stdout));
    let mut records = dump::fetch_jobs(Arc::new(client), &jobs, progress).await?;

    if cli.deduplicate {
        let before = records.len();
        records = storage::deduplicate(records);
        tracing::info!(removed = before - records.len(), "Deduplicated records");
    }

    let written = dump::write_output(records, &dates, &target)?;
    match &target {
        OutputTarget::DataDir(dir) => {
            eprintln!(
                "Wrote {} flights ({} days) to {}",
                written,
                dates.num_days(),
                dir.display()
            );
        }
        OutputTarget::SingleFile(path) => {
            eprintln!("Wrote {} flights to {}", written, path.display());
        }
        OutputTarget::Stdout => {}
    }
    Ok(())
}

/// Dump windows end yesterday: the past-movements feed is only complete
/// through the last finished day.
fn resolve_window(cli: &Cli) -> Result<DateFilter, Box<dyn std::error::Error>> {
    let yesterday = Local::now()
        .date_naive()
        .checked_sub_days(Days::new(1))
        .ok_or("date out of range")?;

    let dates = match (cli.date, cli.days, cli.start, cli.end) {
        (Some(date), ..) => DateFilter::single(date),
        (None, Some(days), ..) => DateFilter::past_days(days, yesterday)?,
        (None, None, Some(start), Some(end)) => DateFilter::range(start, end)?,
        _ => DateFilter::single(yesterday),
    };
    Ok(dates)
}

fn fetch_progress(len: u64, quiet: bool) -> ProgressBar {
    if quiet && !atty_stderr() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    bar.set_style(
        ProgressStyle::with_template("Fetching flights {bar:30} {pos}/{len} calls")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

fn atty_stderr() -> bool {
    use std::io::IsTerminal;
    std::io::stderr().is_terminal()
}

/// Fetch both directions for one day raw and print the response structure.
async fn debug_response(
    client: &HkAirportClient,
    date: NaiveDate,
    cargo: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    for direction in [Direction::Departure, Direction::Arrival] {
        let body = client.fetch_day_raw(date, direction, cargo).await?;
        eprintln!();
        eprintln!("=== {} {} (cargo={}) ===", date, direction, cargo);
        eprintln!("{}", dump::describe_response(&body));
    }
    Ok(())
}
