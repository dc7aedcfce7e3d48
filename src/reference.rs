//! Embedded airport and airline reference tables.
//!
//! Compiled-in subsets of the OpenFlights data, keyed by IATA airport code
//! and ICAO airline code. Lookups are case-insensitive and return `None`
//! for codes outside the tables.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Airport details from the embedded reference table.
#[derive(Debug, Clone, Deserialize)]
pub struct AirportInfo {
    pub iata: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Airline details from the embedded reference table.
#[derive(Debug, Clone, Deserialize)]
pub struct AirlineInfo {
    pub icao: String,
    pub name: String,
    pub country: String,
}

static AIRPORTS: OnceLock<HashMap<String, AirportInfo>> = OnceLock::new();
static AIRLINES: OnceLock<HashMap<String, AirlineInfo>> = OnceLock::new();

fn airports() -> &'static HashMap<String, AirportInfo> {
    AIRPORTS.get_or_init(|| {
        serde_json::from_str(include_str!("data/airports.json")).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "embedded airport table failed to parse");
            HashMap::new()
        })
    })
}

fn airlines() -> &'static HashMap<String, AirlineInfo> {
    AIRLINES.get_or_init(|| {
        serde_json::from_str(include_str!("data/airlines.json")).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "embedded airline table failed to parse");
            HashMap::new()
        })
    })
}

/// Look up an airport by IATA code.
pub fn airport(iata: &str) -> Option<&'static AirportInfo> {
    airports().get(&iata.trim().to_ascii_uppercase())
}

/// Look up an airline by ICAO code.
pub fn airline(icao: &str) -> Option<&'static AirlineInfo> {
    airlines().get(&icao.trim().to_ascii_uppercase())
}

/// "TPE (Taipei, Taiwan)" style label, falling back to the bare code.
pub fn describe_airport(iata: &str) -> String {
    match airport(iata) {
        Some(info) => format!("{} ({}, {})", info.iata, info.city, info.country),
        None => iata.trim().to_ascii_uppercase(),
    }
}

/// Airline display name, falling back to the bare code.
pub fn describe_airline(icao: &str) -> String {
    match airline(icao) {
        Some(info) => info.name.clone(),
        None => icao.trim().to_ascii_uppercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_parse() {
        assert!(!airports().is_empty());
        assert!(!airlines().is_empty());
    }

    #[test]
    fn test_airport_lookup_case_insensitive() {
        let home = airport("hkg").unwrap();
        assert_eq!(home.iata, "HKG");
        assert_eq!(home.city, "Hong Kong");
        assert!(airport(" TPE ").is_some());
    }

    #[test]
    fn test_airline_lookup() {
        let cathay = airline("CPA").unwrap();
        assert_eq!(cathay.name, "Cathay Pacific");
        assert_eq!(cathay.country, "Hong Kong");
    }

    #[test]
    fn test_unknown_codes_return_none() {
        assert!(airport("ZZZ").is_none());
        assert!(airline("ZZZZ").is_none());
        assert!(airport("").is_none());
    }

    #[test]
    fn test_describe_falls_back_to_code() {
        assert_eq!(describe_airport("TPE"), "TPE (Taipei, Taiwan)");
        assert_eq!(describe_airport("zzz"), "ZZZ");
        assert_eq!(describe_airline("CPA"), "Cathay Pacific");
        assert_eq!(describe_airline("zzzz"), "ZZZZ");
    }
}
