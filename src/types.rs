//! Core data types for flight movement auditing.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Movement direction relative to the home airport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Arrival,
    Departure,
}

impl Direction {
    pub const fn is_arrival(self) -> bool {
        matches!(self, Self::Arrival)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arrival => "arrival",
            Self::Departure => "departure",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single flight movement at the home airport, normalized from the API.
///
/// Field order matches the CSV column order used by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Calendar date of the scheduled movement.
    pub date: NaiveDate,
    /// Marketing flight number, e.g. "CX 450".
    pub flight_no: String,
    /// Operating airline code as reported by the API.
    pub airline: String,
    /// Origin airport IATA code.
    pub origin: String,
    /// Destination airport IATA code.
    pub destination: String,
    /// Scheduled local time, when the API provided one.
    #[serde(with = "hhmm")]
    pub scheduled_time: Option<NaiveTime>,
    /// Raw status remark, e.g. "Dep 08:32" or "Cancelled".
    pub status: Option<String>,
    /// Arrival into or departure from the home airport.
    pub direction: Direction,
    /// Freight-only movement.
    pub cargo: bool,
}

impl FlightRecord {
    /// Route as ORIGIN-DESTINATION.
    pub fn route(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }

    /// Scheduled date and time combined, when the time is known.
    pub fn scheduled_datetime(&self) -> Option<NaiveDateTime> {
        self.scheduled_time.map(|t| self.date.and_time(t))
    }

    /// Sort key for chronological listings: date, then scheduled time with
    /// unknown times first, then flight number.
    pub fn chronological_key(&self) -> (NaiveDate, Option<NaiveTime>, &str) {
        (self.date, self.scheduled_time, self.flight_no.as_str())
    }
}

/// Serde helper for the `scheduled_time` CSV column: HH:MM, empty when
/// unknown. Accepts HH:MM:SS on read for older dumps.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => serializer.serialize_str(&t.format("%H:%M").to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(None);
        }
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

/// Raised when filter construction is handed malformed input.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid airport code '{0}': expected three ASCII letters or digits")]
    InvalidAirportCode(String),
    #[error("invalid route '{0}': expected ORIGIN-DEST like HKG-TPE, or a single airport code")]
    InvalidRoute(String),
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("day count must be at least 1, got {0}")]
    InvalidDayCount(u32),
}

fn normalize_airport_code(raw: &str) -> Result<String, ValidationError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(code)
    } else {
        Err(ValidationError::InvalidAirportCode(raw.trim().to_string()))
    }
}

/// Route predicate over flight records.
///
/// A two-sided route matches in either direction: departures to the far
/// airport and arrivals from it both belong to the same corridor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteFilter {
    Pair { origin: String, destination: String },
    AnyDirection { airport: String },
}

impl RouteFilter {
    pub fn pair(origin: &str, destination: &str) -> Result<Self, ValidationError> {
        Ok(Self::Pair {
            origin: normalize_airport_code(origin)?,
            destination: normalize_airport_code(destination)?,
        })
    }

    pub fn any_direction(airport: &str) -> Result<Self, ValidationError> {
        Ok(Self::AnyDirection {
            airport: normalize_airport_code(airport)?,
        })
    }

    /// Parse "HKG-TPE" into a two-sided route, or a bare code like "TPE"
    /// into the any-direction form.
    pub fn from_route_string(route: &str) -> Result<Self, ValidationError> {
        let trimmed = route.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidRoute(route.to_string()));
        }
        let parts: Vec<&str> = trimmed.split('-').collect();
        match parts.as_slice() {
            [airport] => Self::any_direction(airport),
            [origin, destination] => {
                if origin.trim().is_empty() || destination.trim().is_empty() {
                    return Err(ValidationError::InvalidRoute(route.to_string()));
                }
                Self::pair(origin, destination)
            }
            _ => Err(ValidationError::InvalidRoute(route.to_string())),
        }
    }

    pub fn origin(&self) -> Option<&str> {
        match self {
            Self::Pair { origin, .. } => Some(origin),
            Self::AnyDirection { airport } => Some(airport),
        }
    }

    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::Pair { destination, .. } => Some(destination),
            Self::AnyDirection { .. } => None,
        }
    }

    pub fn matches(&self, record: &FlightRecord) -> bool {
        match self {
            Self::Pair {
                origin,
                destination,
            } => {
                (record.origin == *origin && record.destination == *destination)
                    || (record.origin == *destination && record.destination == *origin)
            }
            Self::AnyDirection { airport } => {
                record.origin == *airport || record.destination == *airport
            }
        }
    }
}

impl fmt::Display for RouteFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pair {
                origin,
                destination,
            } => write!(f, "{}-{}", origin, destination),
            Self::AnyDirection { airport } => write!(f, "{} (any direction)", airport),
        }
    }
}

/// Inclusive date range predicate. A single date is a one-day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFilter {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateFilter {
    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn range(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days`-day window ending at `until`, inclusive. `past_days(1, d)`
    /// covers exactly `d`.
    pub fn past_days(days: u32, until: NaiveDate) -> Result<Self, ValidationError> {
        if days == 0 {
            return Err(ValidationError::InvalidDayCount(days));
        }
        let start = until
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or(ValidationError::InvalidDayCount(days))?;
        Ok(Self { start, end: until })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn matches(&self, record: &FlightRecord) -> bool {
        self.contains(record.date)
    }

    /// Every date in the range, ascending.
    pub fn iter_dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{} to {}", self.start, self.end)
        }
    }
}

/// Route and date filters of one query, kept for reporting.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    pub route: RouteFilter,
    pub dates: DateFilter,
}

/// Chronologically ordered records matching a query.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub query: AuditQuery,
    pub records: Vec<FlightRecord>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
