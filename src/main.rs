//! Flight audit CLI
//!
//! Queries past flight movements at Hong Kong International Airport for a
//! route and date window, prints them as a table, and optionally writes
//! CSV and a statistics summary.

use chrono::{Local, NaiveDate};
use clap::{ArgGroup, Parser};
use flyghts_audit::{
    audit::{AuditError, AuditService},
    client::{ClientConfig, HkAirportClient},
    reference, storage,
    types::{DateFilter, FlightRecord, RouteFilter},
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "flyghts-audit")]
#[command(about = "Audit past flight movements at Hong Kong International Airport", long_about = None)]
#[command(group(ArgGroup::new("window").required(true).args(["date", "days"])))]
struct Cli {
    /// Route as ORIGIN-DEST (e.g. HKG-TPE), or a single airport code to
    /// match either endpoint
    #[arg(short, long)]
    route: String,

    /// Single date (YYYY-MM-DD)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Past N days ending today (inclusive)
    #[arg(short = 'n', long)]
    days: Option<u32>,

    /// Include a statistics summary
    #[arg(short, long)]
    stats: bool,

    /// Also write the matching records to this CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Serve dates from per-date CSV files in this directory when present
    #[arg(long)]
    cache_dir: Option<PathBuf>,

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

    // Logs go to stderr so stdout stays machine-consumable.
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
    let route = RouteFilter::from_route_string(&cli.route)?;
    let dates = match (cli.date, cli.days) {
        (Some(date), _) => DateFilter::single(date),
        (None, Some(days)) => DateFilter::past_days(days, Local::now().date_naive())?,
        (None, None) => unreachable!("clap requires one of --date/--days"),
    };

    let config = ClientConfig::new().with_timeout(Duration::from_secs(cli.timeout));
    let client = HkAirportClient::new(config)?;
    let mut service = AuditService::new(client);
    if let Some(dir) = &cli.cache_dir {
        service = service.with_cache_dir(dir);
    }

    tracing::info!(%route, %dates, "Querying");

    let (result, partial_failure) = match service.query(route, dates).await {
        Ok(result) => (result, None),
        Err(AuditError::Partial(partial)) => {
            let message = partial.to_string();
            (partial.partial, Some(message))
        }
        Err(e) => return Err(e.into()),
    };

    if result.is_empty() {
        eprintln!("No flights found for {} on {}.", result.query.route, result.query.dates);
    } else {
        print_table(&result.records);
        println!();
        println!(
            "{} flights, {} ({})",
            result.len(),
            result.query.route,
            result.query.dates
        );
    }

    if cli.stats {
        let stats = service.statistics(&result.records);
        print_stats(&stats);
    }

    if let Some(path) = &cli.output {
        if result.is_empty() {
            eprintln!("Nothing to write to {}.", path.display());
        } else {
            storage::write_csv_file(path, &result.records)?;
            eprintln!("Wrote {} rows to {}", result.len(), path.display());
        }
    }

    // A partial fetch still shows what it got, but exits nonzero.
    match partial_failure {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}

fn print_table(records: &[FlightRecord]) {
    println!(
        "{:<12} {:<6} {:<10} {:<24} {:<5} {:<5} {}",
        "DATE", "TIME", "FLIGHT", "AIRLINE", "FROM", "TO", "STATUS"
    );
    for record in records {
        let time = record
            .scheduled_time
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());
        println!(
            "{:<12} {:<6} {:<10} {:<24} {:<5} {:<5} {}",
            record.date,
            time,
            record.flight_no,
            reference::describe_airline(&record.airline),
            record.origin,
            record.destination,
            record.status.as_deref().unwrap_or("-"),
        );
    }
}

fn print_stats(stats: &flyghts_audit::stats::FlightStats) {
    println!();
    println!("Total flights: {}", stats.total_flights);

    let top_airlines = stats.top_airlines(10);
    if !top_airlines.is_empty() {
        println!();
        println!("Top airlines:");
        for (code, count) in top_airlines {
            println!("  {:<24} {}", reference::describe_airline(&code), count);
        }
    }

    let top_destinations = stats.top_destinations(10);
    if !top_destinations.is_empty() {
        println!();
        println!("Top destinations:");
        for (code, count) in top_destinations {
            println!("  {:<32} {}", reference::describe_airport(&code), count);
        }
    }

    if !stats.by_route.is_empty() {
        println!();
        println!("By route:");
        for (route, count) in &stats.by_route {
            println!("  {route}: {count}");
        }
    }

    if !stats.by_date.is_empty() {
        println!();
        println!("By date:");
        for (date, count) in &stats.by_date {
            println!("  {date}: {count}");
        }
    }

    if !stats.status_kinds.is_empty() {
        println!();
        println!("Status summary:");
        for (kind, count) in &stats.status_kinds {
            println!("  {kind}: {count}");
        }
    }
}
