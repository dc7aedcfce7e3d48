//! Pluggable flight data sources.
//!
//! The audit service talks to a [`FlightSource`] rather than the HTTP
//! client directly, so tests can stand in a canned source and another
//! airport's feed can slot in behind the same seam.

use crate::client::{FetchError, HkAirportClient};
use crate::protocol::{self, ParseError, HOME_AIRPORT};
use crate::types::{Direction, FlightRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Failure of a single-day fetch from a source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("response parse failed: {0}")]
    Parse(#[from] ParseError),
}

/// One day's worth of normalized movements from some backend.
#[async_trait]
pub trait FlightSource: Send + Sync {
    /// All movements for `date` in one direction. `cargo` selects the
    /// freighter schedule instead of the passenger one.
    async fn fetch_day(
        &self,
        date: NaiveDate,
        direction: Direction,
        cargo: bool,
    ) -> Result<Vec<FlightRecord>, SourceError>;

    /// IATA code of the airport this source covers.
    fn home_airport(&self) -> &str;
}

#[async_trait]
impl FlightSource for HkAirportClient {
    async fn fetch_day(
        &self,
        date: NaiveDate,
        direction: Direction,
        cargo: bool,
    ) -> Result<Vec<FlightRecord>, SourceError> {
        let body = self.fetch_day_raw(date, direction, cargo).await?;
        let records = protocol::parse_response(&body, date, direction, cargo)?;
        tracing::debug!(%date, %direction, cargo, count = records.len(), "Fetched day batch");
        Ok(records)
    }

    fn home_airport(&self) -> &str {
        HOME_AIRPORT
    }
}
