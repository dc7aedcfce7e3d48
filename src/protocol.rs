//! Parser for the HK Airport flight information API responses.
//!
//! The endpoint has gone through three response generations, all of which
//! are still observed in the wild:
//!
//! - current: an array of day blocks `[{"date", "list": [...]}, ...]`,
//!   with `destination`/`origin` given as arrays of port codes and the
//!   flight numbers nested under `flight`;
//! - legacy: a single object `{"Date", "List": [...]}` with capitalized
//!   keys and plain string ports;
//! - oldest: a bare array of flight items.
//!
//! `parse_response` accepts all three and normalizes into [`FlightRecord`]s
//! for the requested date. Anything else is a [`ParseError`], never a
//! silently empty result. One item expands into one record per code-share
//! flight number.

use crate::types::{Direction, FlightRecord};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use thiserror::Error;

/// The only airport this feed covers.
pub const HOME_AIRPORT: &str = "HKG";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("response body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unrecognized response shape: {0}")]
    UnrecognizedShape(String),
    #[error("day block carries unparseable date '{0}'")]
    BadDate(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiResponse {
    DayBlocks(Vec<DayBlock>),
    Single(DayBlock),
    Items(Vec<FlightItem>),
}

/// One calendar day of movements. The `list` key (any casing) is what
/// distinguishes a day block from a bare flight item.
#[derive(Debug, Deserialize)]
struct DayBlock {
    #[serde(alias = "Date", default)]
    date: Option<String>,
    #[serde(alias = "List", deserialize_with = "null_as_empty")]
    list: Vec<FlightItem>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<FlightItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let items = Option::<Vec<FlightItem>>::deserialize(deserializer)?;
    Ok(items.unwrap_or_default())
}

/// One movement slot. Every key spelling the feed has used is aliased
/// here; unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FlightItem {
    #[serde(alias = "Time", alias = "ScheduledTime", alias = "scheduledTime")]
    time: Option<String>,
    #[serde(alias = "Status")]
    status: Option<String>,
    #[serde(
        alias = "Flight number list",
        alias = "flightNumberList",
        alias = "flightNumbers",
        alias = "flights"
    )]
    flight: Option<FlightNumbers>,
    #[serde(
        alias = "Origin",
        alias = "Port of origin",
        alias = "portOfOrigin",
        alias = "From",
        alias = "from",
        alias = "dep_iata",
        alias = "dep"
    )]
    origin: Option<Ports>,
    #[serde(
        alias = "Destination",
        alias = "Port of destination",
        alias = "portOfDestination",
        alias = "To",
        alias = "to",
        alias = "arr_iata",
        alias = "arr"
    )]
    destination: Option<Ports>,
    // Oldest generation put the flight identity directly on the item.
    #[serde(
        alias = "No",
        alias = "FlightNo",
        alias = "flightNo",
        alias = "number",
        alias = "flight_number"
    )]
    no: Option<String>,
    #[serde(alias = "Airline", alias = "carrier", alias = "Carrier")]
    airline: Option<String>,
}

/// Flight numbers come as an array of code-shares or a single object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlightNumbers {
    Many(Vec<FlightNumber>),
    One(FlightNumber),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FlightNumber {
    #[serde(
        alias = "No",
        alias = "FlightNo",
        alias = "flightNo",
        alias = "number",
        alias = "flight_number"
    )]
    no: Option<String>,
    #[serde(alias = "Airline", alias = "carrier", alias = "Carrier")]
    airline: Option<String>,
}

impl FlightNumber {
    /// Flight number and airline, when at least one is present.
    fn identity(&self) -> Option<(String, String)> {
        let no = self.no.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let airline = self
            .airline
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if no.is_none() && airline.is_none() {
            return None;
        }
        Some((
            no.unwrap_or_default().to_string(),
            airline.unwrap_or_default().to_string(),
        ))
    }
}

/// Port codes appear as a plain string or an array of codes; multi-leg
/// flights list every port and the first one is the far endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Ports {
    One(String),
    Many(Vec<String>),
}

impl Ports {
    fn first(&self) -> Option<&str> {
        let raw = match self {
            Self::One(code) => code.as_str(),
            Self::Many(codes) => codes.first().map(String::as_str)?,
        };
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Parse an API response body into records for `requested_date`.
///
/// Day blocks for neighbouring dates (the endpoint pads the requested day
/// on both sides) are dropped so callers always get a pure single-date
/// batch. The `cargo` flag is not echoed per item and is carried through
/// from the request.
pub fn parse_response(
    body: &str,
    requested_date: NaiveDate,
    direction: Direction,
    cargo: bool,
) -> Result<Vec<FlightRecord>, ParseError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let response: ApiResponse = serde_json::from_value(value)
        .map_err(|e| ParseError::UnrecognizedShape(e.to_string()))?;

    let blocks = match response {
        ApiResponse::DayBlocks(blocks) => blocks,
        ApiResponse::Single(block) => vec![block],
        ApiResponse::Items(items) => vec![DayBlock {
            date: None,
            list: items,
        }],
    };

    let mut records = Vec::new();
    for block in blocks {
        let block_date = match &block.date {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|_| ParseError::BadDate(raw.clone()))?,
            None => requested_date,
        };
        if block_date != requested_date {
            tracing::debug!(
                %block_date,
                %requested_date,
                items = block.list.len(),
                "dropping day block outside the requested date"
            );
            continue;
        }
        for item in &block.list {
            expand_item(item, block_date, direction, cargo, &mut records);
        }
    }
    Ok(records)
}

/// Append one record per flight number carried by `item`.
fn expand_item(
    item: &FlightItem,
    date: NaiveDate,
    direction: Direction,
    cargo: bool,
    out: &mut Vec<FlightRecord>,
) {
    let far_port = match direction {
        Direction::Arrival => item.origin.as_ref().and_then(Ports::first),
        Direction::Departure => item.destination.as_ref().and_then(Ports::first),
    };
    let Some(far) = far_port else {
        tracing::warn!(%date, %direction, "skipping flight item without a far-side port");
        return;
    };
    let (origin, destination) = match direction {
        Direction::Arrival => (far.to_string(), HOME_AIRPORT.to_string()),
        Direction::Departure => (HOME_AIRPORT.to_string(), far.to_string()),
    };
    let scheduled_time = item.time.as_deref().and_then(parse_time);
    let status = item
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let numbers: Vec<&FlightNumber> = match &item.flight {
        Some(FlightNumbers::Many(many)) => many.iter().collect(),
        Some(FlightNumbers::One(one)) => vec![one],
        None => Vec::new(),
    };

    let mut expanded = false;
    for number in numbers {
        if let Some((flight_no, airline)) = number.identity() {
            out.push(FlightRecord {
                date,
                flight_no,
                airline,
                origin: origin.clone(),
                destination: destination.clone(),
                scheduled_time,
                status: status.clone(),
                direction,
                cargo,
            });
            expanded = true;
        }
    }

    if !expanded {
        // Oldest generation: identity directly on the item.
        let direct = FlightNumber {
            no: item.no.clone(),
            airline: item.airline.clone(),
        };
        match direct.identity() {
            Some((flight_no, airline)) => out.push(FlightRecord {
                date,
                flight_no,
                airline,
                origin,
                destination,
                scheduled_time,
                status,
                direction,
                cargo,
            }),
            None => {
                tracing::warn!(%date, %direction, "skipping flight item without a flight identity");
            }
        }
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_block_departures() {
        let body = json!([
            {
                "date": "2026-02-20",
                "arrival": false,
                "cargo": false,
                "list": [
                    {
                        "time": "23:20",
                        "flight": [{"no": "CX 271", "airline": "CPA"}],
                        "status": "Dep 01:21",
                        "destination": ["AMS"],
                        "terminal": "T1",
                        "gate": "29"
                    }
                ]
            }
        ]);
        let records = parse_response(
            &body.to_string(),
            date(2026, 2, 20),
            Direction::Departure,
            false,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.origin, "HKG");
        assert_eq!(r.destination, "AMS");
        assert_eq!(r.flight_no, "CX 271");
        assert_eq!(r.airline, "CPA");
        assert_eq!(r.scheduled_time, NaiveTime::from_hms_opt(23, 20, 0));
        assert_eq!(r.status.as_deref(), Some("Dep 01:21"));
        assert_eq!(r.direction, Direction::Departure);
        assert!(!r.cargo);
    }

    #[test]
    fn test_day_block_arrivals() {
        let body = json!([
            {
                "date": "2026-02-20",
                "arrival": true,
                "cargo": false,
                "list": [
                    {
                        "time": "23:55",
                        "flight": [{"no": "CX 587", "airline": "CPA"}],
                        "status": "At gate",
                        "origin": ["CTS"]
                    }
                ]
            }
        ]);
        let records = parse_response(
            &body.to_string(),
            date(2026, 2, 20),
            Direction::Arrival,
            false,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].origin, "CTS");
        assert_eq!(records[0].destination, "HKG");
        assert_eq!(records[0].flight_no, "CX 587");
    }

    #[test]
    fn test_legacy_single_object() {
        let body = json!({
            "Date": "2025-02-17",
            "Arrival": false,
            "Cargo": false,
            "List": [
                {
                    "Destination": "TPE",
                    "Terminal": "1",
                    "Time": "08:30",
                    "Gate": "23",
                    "Flight number list": [{"No": "CX421", "Airline": "CX"}],
                    "Status": "Departed"
                }
            ]
        });
        let records = parse_response(
            &body.to_string(),
            date(2025, 2, 17),
            Direction::Departure,
            false,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.origin, "HKG");
        assert_eq!(r.destination, "TPE");
        assert_eq!(r.flight_no, "CX421");
        assert_eq!(r.airline, "CX");
        assert_eq!(r.scheduled_time, NaiveTime::from_hms_opt(8, 30, 0));
        assert_eq!(r.date, date(2025, 2, 17));
    }

    #[test]
    fn test_bare_item_array() {
        let body = json!([
            {
                "Destination": "TPE",
                "Time": "08:30",
                "Flight number list": [{"No": "CX421", "Airline": "CX"}],
                "Status": "Departed"
            }
        ]);
        let records = parse_response(
            &body.to_string(),
            date(2025, 2, 17),
            Direction::Departure,
            false,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].destination, "TPE");
        assert_eq!(records[0].date, date(2025, 2, 17));
    }

    #[test]
    fn test_code_share_expansion() {
        let body = json!({
            "Date": "2025-02-17",
            "List": [
                {
                    "Destination": "TPE",
                    "Time": "08:30",
                    "Flight number list": [
                        {"No": "CX421", "Airline": "CX"},
                        {"No": "KA4871", "Airline": "KA"}
                    ]
                }
            ]
        });
        let records = parse_response(
            &body.to_string(),
            date(2025, 2, 17),
            Direction::Departure,
            false,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].flight_no, "CX421");
        assert_eq!(records[0].airline, "CX");
        assert_eq!(records[1].flight_no, "KA4871");
        assert_eq!(records[1].airline, "KA");
        assert_eq!(records[0].scheduled_time, records[1].scheduled_time);
    }

    #[test]
    fn test_neighbouring_day_blocks_dropped() {
        let body = json!([
            {
                "date": "2026-02-19",
                "list": [
                    {"time": "23:50", "flight": [{"no": "CX 880", "airline": "CPA"}], "destination": ["LAX"]}
                ]
            },
            {
                "date": "2026-02-20",
                "list": [
                    {"time": "00:35", "flight": [{"no": "CX 883", "airline": "CPA"}], "destination": ["LAX"]}
                ]
            }
        ]);
        let records = parse_response(
            &body.to_string(),
            date(2026, 2, 20),
            Direction::Departure,
            false,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].flight_no, "CX 883");
        assert_eq!(records[0].date, date(2026, 2, 20));
    }

    #[test]
    fn test_empty_list_yields_no_records() {
        let body = json!({"Date": "2025-02-17", "List": []});
        let records = parse_response(
            &body.to_string(),
            date(2025, 2, 17),
            Direction::Departure,
            false,
        )
        .unwrap();
        assert!(records.is_empty());

        let null_list = json!({"Date": "2025-02-17", "List": null});
        let records = parse_response(
            &null_list.to_string(),
            date(2025, 2, 17),
            Direction::Departure,
            false,
        )
        .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_item_without_port_is_skipped() {
        let body = json!({
            "Date": "2025-02-17",
            "List": [
                {"Time": "08:30", "Flight number list": [{"No": "CX421", "Airline": "CX"}]},
                {"Destination": "TPE", "Time": "09:40", "Flight number list": [{"No": "CI910", "Airline": "CI"}]}
            ]
        });
        let records = parse_response(
            &body.to_string(),
            date(2025, 2, 17),
            Direction::Departure,
            false,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].flight_no, "CI910");
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_response("not json", date(2025, 2, 17), Direction::Departure, false)
            .unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn test_unrecognized_shape_is_parse_error() {
        let body = json!({"unexpected": "document"});
        let err = parse_response(
            &body.to_string(),
            date(2025, 2, 17),
            Direction::Departure,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedShape(_)));

        let scalar = json!(42);
        let err = parse_response(
            &scalar.to_string(),
            date(2025, 2, 17),
            Direction::Departure,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedShape(_)));
    }

    #[test]
    fn test_bad_block_date_is_parse_error() {
        let body = json!([{"date": "20/02/2026", "list": []}]);
        let err = parse_response(
            &body.to_string(),
            date(2026, 2, 20),
            Direction::Departure,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::BadDate(_)));
    }

    #[test]
    fn test_seconds_in_scheduled_time() {
        let body = json!({
            "Date": "2025-02-17",
            "List": [
                {
                    "Destination": "TPE",
                    "Time": "08:30:00",
                    "Flight number list": [{"No": "CX421", "Airline": "CX"}]
                }
            ]
        });
        let records = parse_response(
            &body.to_string(),
            date(2025, 2, 17),
            Direction::Departure,
            false,
        )
        .unwrap();
        assert_eq!(records[0].scheduled_time, NaiveTime::from_hms_opt(8, 30, 0));
    }

    #[test]
    fn test_cargo_flag_carried_through() {
        let body = json!([
            {
                "date": "2026-02-20",
                "cargo": true,
                "list": [
                    {"time": "04:10", "flight": [{"no": "LD 085", "airline": "AHK"}], "destination": ["NRT"]}
                ]
            }
        ]);
        let records = parse_response(
            &body.to_string(),
            date(2026, 2, 20),
            Direction::Departure,
            true,
        )
        .unwrap();
        assert!(records[0].cargo);
    }
}
