//! Aggregate statistics over flight records.
//!
//! Pure counting: a [`FlightStats`] is a function of its input records and
//! carries no state of its own. Maps are keyed in sorted order so reports
//! render deterministically.

use crate::reference;
use crate::status::parse_status;
use crate::types::FlightRecord;
use std::collections::BTreeMap;

/// Counters derived from one batch of records.
#[derive(Debug, Clone, Default)]
pub struct FlightStats {
    pub total_flights: usize,
    /// Count per airline code; records without an airline are skipped.
    pub by_airline: BTreeMap<String, usize>,
    /// Count per far-side airport, the non-home endpoint of each record.
    pub by_destination: BTreeMap<String, usize>,
    pub by_date: BTreeMap<chrono::NaiveDate, usize>,
    pub by_route: BTreeMap<String, usize>,
    /// Count per scheduled hour; records without a time are skipped.
    pub by_hour: BTreeMap<u32, usize>,
    /// Count per raw status remark, with missing status under "Unknown".
    pub status_summary: BTreeMap<String, usize>,
    /// Count per parsed status class (departed, cancelled, ...).
    pub status_kinds: BTreeMap<&'static str, usize>,
}

impl FlightStats {
    /// Count `records` relative to `home_airport`.
    pub fn compute(records: &[FlightRecord], home_airport: &str) -> Self {
        let mut stats = Self {
            total_flights: records.len(),
            ..Self::default()
        };

        for record in records {
            if !record.airline.is_empty() {
                *stats.by_airline.entry(record.airline.clone()).or_default() += 1;
            }

            for far in far_sides(record, home_airport) {
                *stats.by_destination.entry(far.to_string()).or_default() += 1;
            }

            *stats.by_date.entry(record.date).or_default() += 1;
            *stats.by_route.entry(record.route()).or_default() += 1;

            if let Some(time) = record.scheduled_time {
                use chrono::Timelike;
                *stats.by_hour.entry(time.hour()).or_default() += 1;
            }

            let status = record
                .status
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("Unknown");
            *stats.status_summary.entry(status.to_string()).or_default() += 1;

            let kind = parse_status(record.status.as_deref()).kind;
            *stats.status_kinds.entry(kind.as_str()).or_default() += 1;
        }

        stats
    }

    /// Airlines ranked by descending count, ties by code ascending.
    pub fn top_airlines(&self, n: usize) -> Vec<(String, usize)> {
        ranked(&self.by_airline, n)
    }

    /// Far-side airports ranked by descending count, ties by code ascending.
    pub fn top_destinations(&self, n: usize) -> Vec<(String, usize)> {
        ranked(&self.by_destination, n)
    }

    /// Far-side counts rolled up to cities via the reference table, with
    /// unknown codes kept under the bare code.
    pub fn destinations_by_city(&self) -> BTreeMap<String, usize> {
        roll_up(&self.by_destination, |code| {
            reference::airport(code)
                .filter(|info| !info.city.is_empty())
                .map(|info| info.city.clone())
        })
    }

    /// Far-side counts rolled up to countries via the reference table.
    pub fn destinations_by_country(&self) -> BTreeMap<String, usize> {
        roll_up(&self.by_destination, |code| {
            reference::airport(code)
                .filter(|info| !info.country.is_empty())
                .map(|info| info.country.clone())
        })
    }
}

/// The endpoints of `record` that are not the home airport. A record
/// between two foreign airports contributes both ends.
fn far_sides<'a>(record: &'a FlightRecord, home_airport: &str) -> Vec<&'a str> {
    match (
        record.origin == home_airport,
        record.destination == home_airport,
    ) {
        (true, false) => vec![record.destination.as_str()],
        (false, true) => vec![record.origin.as_str()],
        (false, false) => vec![record.origin.as_str(), record.destination.as_str()],
        (true, true) => Vec::new(),
    }
}

fn ranked(map: &BTreeMap<String, usize>, n: usize) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> =
        map.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(n);
    entries
}

fn roll_up<F>(map: &BTreeMap<String, usize>, label: F) -> BTreeMap<String, usize>
where
    F: Fn(&str) -> Option<String>,
{
    let mut rolled = BTreeMap::new();
    for (code, count) in map {
        let key = label(code).unwrap_or_else(|| code.clone());
        *rolled.entry(key).or_default() += count;
    }
    rolled
}
