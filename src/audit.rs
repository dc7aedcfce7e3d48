//! Audit service: fetch, filter, and aggregate flight movements.
//!
//! Drives a [`FlightSource`] over a date range, applies the route filter,
//! and returns the matches in chronological order. A failing day does not
//! sink the whole range: the service gathers what it can and reports the
//! failed dates alongside the partial result.

use crate::source::{FlightSource, SourceError};
use crate::stats::FlightStats;
use crate::storage;
use crate::types::{
    AuditQuery, DateFilter, Direction, FlightRecord, QueryResult, RouteFilter, ValidationError,
};
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// A range query where at least one date could not be fetched.
///
/// Carries the records that were gathered for the other dates, so callers
/// can still report on the partial result.
#[derive(Debug, Error)]
#[error("fetch failed for {} of {} dates: {}", failures.len(), attempted, failed_dates_summary(failures))]
pub struct PartialFetchError {
    /// Dates that failed, with the error for each.
    pub failures: Vec<(NaiveDate, SourceError)>,
    /// Total dates the query covered.
    pub attempted: usize,
    /// Records gathered for the dates that succeeded.
    pub partial: QueryResult,
}

fn failed_dates_summary(failures: &[(NaiveDate, SourceError)]) -> String {
    failures
        .iter()
        .map(|(date, _)| date.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Partial(#[from] PartialFetchError),
}

/// Orchestrates fetching, filtering, and statistics over a flight source.
pub struct AuditService<S: FlightSource> {
    source: S,
    cache_dir: Option<PathBuf>,
}

impl<S: FlightSource> AuditService<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache_dir: None,
        }
    }

    /// Serve dates from per-date CSV files in `dir` when present, instead
    /// of fetching. A cache file that fails to parse falls back to the
    /// network.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch and filter passenger movements for every date the filter
    /// covers, chronologically ordered.
    ///
    /// Dates that fail are collected rather than aborting the range; when
    /// any date failed the result comes back as [`AuditError::Partial`]
    /// carrying both the failures and the records gathered for the rest.
    pub async fn query(
        &self,
        route: RouteFilter,
        dates: DateFilter,
    ) -> Result<QueryResult, AuditError> {
        let mut records = Vec::new();
        let mut failures = Vec::new();
        let mut attempted = 0usize;

        for date in dates.iter_dates() {
            attempted += 1;
            match self.gather_day(date).await {
                Ok(day_records) => {
                    records.extend(day_records.into_iter().filter(|r| route.matches(r)));
                }
                Err(err) => {
                    tracing::warn!(%date, error = %err, "Date failed, continuing with the rest");
                    failures.push((date, err));
                }
            }
        }

        records.sort_by(|a, b| a.chronological_key().cmp(&b.chronological_key()));
        let result = QueryResult {
            query: AuditQuery { route, dates },
            records,
        };

        if failures.is_empty() {
            tracing::info!(
                matches = result.len(),
                dates = attempted,
                "Query complete"
            );
            Ok(result)
        } else {
            Err(AuditError::Partial(PartialFetchError {
                failures,
                attempted,
                partial: result,
            }))
        }
    }

    /// Aggregate statistics over `records`, relative to the source's home
    /// airport. Pure; an empty slice yields all-zero counters.
    pub fn statistics(&self, records: &[FlightRecord]) -> FlightStats {
        FlightStats::compute(records, self.source.home_airport())
    }

    /// One day of passenger movements, both directions, cache-first.
    async fn gather_day(&self, date: NaiveDate) -> Result<Vec<FlightRecord>, SourceError> {
        if let Some(dir) = &self.cache_dir {
            match storage::read_day_file(dir, date) {
                Ok(cached) => {
                    // Dump files carry freighters; the audit surface is
                    // passenger-only, same as the network path.
                    let passengers: Vec<FlightRecord> =
                        cached.into_iter().filter(|r| !r.cargo).collect();
                    tracing::debug!(%date, count = passengers.len(), "Serving date from cache");
                    return Ok(passengers);
                }
                Err(err) => {
                    tracing::debug!(%date, error = %err, "Cache miss, fetching");
                }
            }
        }

        let mut records = self
            .source
            .fetch_day(date, Direction::Departure, false)
            .await?;
        records.extend(self.source.fetch_day(date, Direction::Arrival, false).await?);
        Ok(records)
    }
}
