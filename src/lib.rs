//! Flight movement fetching, filtering, and auditing for Hong Kong
//! International Airport.
//!
//! This library provides functionality to:
//! - Fetch past flight movements from the HK Airport open-data API
//! - Parse the API's JSON response generations into a uniform record shape
//! - Filter records by route and date range and compute statistics
//! - Persist records as per-date or merged CSV files
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌──────────────┐
//! │   Client    │───▶│  Protocol   │───▶│    Audit     │
//! │   (HTTP)    │    │  (Parser)   │    │ (Query/Stats)│
//! └─────────────┘    └─────────────┘    └──────────────┘
//!        │                                     │
//!        └─────────────┬───────────────────────┘
//!                      ▼
//!              ┌─────────────┐
//!              │   Storage   │
//!              │    (CSV)    │
//!              └─────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use flyghts_audit::{
//!     audit::AuditService,
//!     client::{ClientConfig, HkAirportClient},
//!     types::{DateFilter, RouteFilter},
//! };
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HkAirportClient::new(ClientConfig::new())?;
//!     let service = AuditService::new(client);
//!
//!     let route = RouteFilter::from_route_string("HKG-TPE")?;
//!     let date = NaiveDate::from_ymd_opt(2025, 2, 17).unwrap();
//!     let result = service.query(route, DateFilter::single(date)).await?;
//!
//!     let stats = service.statistics(&result.records);
//!     for (airline, count) in stats.top_airlines(5) {
//!         println!("{airline}: {count}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod client;
pub mod dump;
pub mod protocol;
pub mod reference;
pub mod source;
pub mod stats;
pub mod status;
pub mod storage;
pub mod types;

pub use audit::{AuditError, AuditService, PartialFetchError};
pub use client::{ClientConfig, FetchError, HkAirportClient};
pub use protocol::{parse_response, ParseError, HOME_AIRPORT};
pub use source::{FlightSource, SourceError};
pub use stats::FlightStats;
pub use types::{
    AuditQuery, DateFilter, Direction, FlightRecord, QueryResult, RouteFilter, ValidationError,
};
