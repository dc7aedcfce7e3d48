//! Bulk dump orchestration.
//!
//! A dump covers a date window and pulls every movement batch the window
//! needs: departures and arrivals per day, passenger plus freighter unless
//! cargo is excluded. Batches are fetched concurrently under a small cap
//! and reassembled in plan order, so the output never depends on which
//! request happened to finish first. Unlike the audit query, a dump aborts
//! on the first failed batch — an archival file with silent holes is worse
//! than no file.

use crate::source::{FlightSource, SourceError};
use crate::storage::{self, StorageError};
use crate::types::{DateFilter, Direction, FlightRecord};
use chrono::NaiveDate;
use indicatif::ProgressBar;
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Concurrent request cap; the feed rate-limits aggressive callers.
pub const MAX_CONCURRENT_FETCHES: usize = 3;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("fetch failed for {date} {direction} (cargo={cargo}): {source}")]
    Fetch {
        date: NaiveDate,
        direction: Direction,
        cargo: bool,
        #[source]
        source: SourceError,
    },
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("fetch task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One remote batch the dump needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpJob {
    pub date: NaiveDate,
    pub direction: Direction,
    pub cargo: bool,
}

/// Where the dumped records go.
#[derive(Debug, Clone)]
pub enum OutputTarget {
    /// One `YYYY-MM-DD.csv` per requested date inside this directory.
    DataDir(PathBuf),
    /// Single CSV, merged with any existing content.
    SingleFile(PathBuf),
    /// CSV on standard output.
    Stdout,
}

/// Batches for `dates` in output order: per day departures then arrivals,
/// passenger first and the freighter pair after when cargo is included.
pub fn plan_jobs(dates: &DateFilter, include_cargo: bool) -> Vec<DumpJob> {
    let mut jobs = Vec::new();
    for date in dates.iter_dates() {
        for cargo in [false, true] {
            if cargo && !include_cargo {
                continue;
            }
            for direction in [Direction::Departure, Direction::Arrival] {
                jobs.push(DumpJob {
                    date,
                    direction,
                    cargo,
                });
            }
        }
    }
    jobs
}

/// Fetch every job with at most [`MAX_CONCURRENT_FETCHES`] requests in
/// flight, returning the concatenated records in plan order. `progress`
/// ticks once per finished batch; pass [`ProgressBar::hidden`] to run
/// silently.
pub async fn fetch_jobs<S>(
    source: Arc<S>,
    jobs: &[DumpJob],
    progress: ProgressBar,
) -> Result<Vec<FlightRecord>, DumpError>
where
    S: FlightSource + 'static,
{
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));
    let mut handles = Vec::with_capacity(jobs.len());

    for job in jobs.iter().copied() {
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        let progress = progress.clone();
        handles.push(tokio::spawn(async move {
            // The semaphore is never closed while handles are pending.
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            let result = source.fetch_day(job.date, job.direction, job.cargo).await;
            progress.inc(1);
            (job, result)
        }));
    }

    // Handles are awaited in spawn order, which is plan order; completion
    // order does not matter.
    let mut records = Vec::new();
    for handle in handles {
        let (job, result) = handle.await?;
        match result {
            Ok(batch) => {
                tracing::debug!(
                    date = %job.date,
                    direction = %job.direction,
                    cargo = job.cargo,
                    count = batch.len(),
                    "Batch fetched"
                );
                records.extend(batch);
            }
            Err(source) => {
                progress.abandon();
                return Err(DumpError::Fetch {
                    date: job.date,
                    direction: job.direction,
                    cargo: job.cargo,
                    source,
                });
            }
        }
    }
    progress.finish_and_clear();
    Ok(records)
}

/// Route `records` to the chosen target. Returns the number of rows
/// written (after merging, for the single-file target).
///
/// The data-dir target writes exactly one file per date in `dates`, empty
/// days included; records for other dates are dropped so only the
/// requested window touches the filesystem.
pub fn write_output(
    records: Vec<FlightRecord>,
    dates: &DateFilter,
    target: &OutputTarget,
) -> Result<usize, DumpError> {
    match target {
        OutputTarget::DataDir(dir) => {
            let mut by_date: BTreeMap<NaiveDate, Vec<FlightRecord>> = BTreeMap::new();
            for record in records {
                if dates.contains(record.date) {
                    by_date.entry(record.date).or_default().push(record);
                } else {
                    tracing::warn!(
                        date = %record.date,
                        flight_no = %record.flight_no,
                        "Dropping record outside the requested window"
                    );
                }
            }
            let mut written = 0;
            static EMPTY: Vec<FlightRecord> = Vec::new();
            for date in dates.iter_dates() {
                let day_records = by_date.get(&date).unwrap_or(&EMPTY);
                storage::write_day_file(dir, date, day_records)?;
                written += day_records.len();
            }
            Ok(written)
        }
        OutputTarget::SingleFile(path) => {
            let merged = storage::merge_into_file(path, &records)?;
            Ok(merged.len())
        }
        OutputTarget::Stdout => {
            let count = records.len();
            storage::write_csv(io::stdout().lock(), &records)?;
            Ok(count)
        }
    }
}

/// Human-readable summary of a raw API response body, for `--debug`.
pub fn describe_response(body: &str) -> String {
    const SAMPLE_LIMIT: usize = 2000;

    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(err) => return format!("Body is not valid JSON ({err})"),
    };

    let mut out = String::new();
    match &value {
        serde_json::Value::Array(items) => {
            out.push_str(&format!("Response type: array, length {}\n", items.len()));
            if let Some(first) = items.first() {
                describe_item(first, &mut out);
            }
        }
        serde_json::Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            out.push_str(&format!("Response type: object, keys {:?}\n", keys));
            if let Some(list) = map.get("list").or_else(|| map.get("List")) {
                if let Some(items) = list.as_array() {
                    out.push_str(&format!("List length: {}\n", items.len()));
                    if let Some(first) = items.first() {
                        describe_item(first, &mut out);
                    }
                }
            }
        }
        other => {
            out.push_str(&format!("Response type: {}\n", json_type_name(other)));
        }
    }

    let sample = serde_json::to_string_pretty(&value).unwrap_or_default();
    let truncated: String = sample.chars().take(SAMPLE_LIMIT).collect();
    out.push_str("Sample:\n");
    out.push_str(&truncated);
    if sample.chars().count() > SAMPLE_LIMIT {
        out.push_str("\n... (truncated)");
    }
    out
}

fn describe_item(item: &serde_json::Value, out: &mut String) {
    match item {
        serde_json::Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            out.push_str(&format!("First item keys: {:?}\n", keys));
        }
        other => {
            out.push_str(&format!("First item type: {}\n", json_type_name(other)));
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
