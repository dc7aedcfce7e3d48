//! Parser for the raw status remarks attached to flight records.
//!
//! The feed reports outcomes as short English phrases: "Dep 00:27",
//! "Arr 23:58 (17/02/2025)", "At gate 08:12", "Cancelled". The trailing
//! date appears only when the actual movement happened on a different
//! calendar day than the scheduled one.

use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

/// Outcome class extracted from a status remark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Departed,
    Arrived,
    AtGate,
    Cancelled,
    Delayed,
    Unknown,
}

impl StatusKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Departed => "departed",
            Self::Arrived => "arrived",
            Self::AtGate => "at_gate",
            Self::Cancelled => "cancelled",
            Self::Delayed => "delayed",
            Self::Unknown => "unknown",
        }
    }
}

/// Structured view of one status remark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedStatus {
    pub kind: StatusKind,
    pub actual_time: Option<NaiveTime>,
    pub actual_date: Option<NaiveDate>,
}

impl ParsedStatus {
    const fn unknown() -> Self {
        Self {
            kind: StatusKind::Unknown,
            actual_time: None,
            actual_date: None,
        }
    }
}

fn status_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // (Dep|Arr|At gate) HH:MM, optionally followed by (DD/MM/YYYY)
        Regex::new(r"(?i)^(Dep|Arr|At gate)\s+(\d{1,2}:\d{2})(?:\s+\((\d{1,2})/(\d{1,2})/(\d{4})\))?\s*$")
            .unwrap()
    })
}

/// Parse a raw status remark. Anything outside the known shapes comes back
/// as `StatusKind::Unknown` with no time or date.
pub fn parse_status(status: Option<&str>) -> ParsedStatus {
    let Some(raw) = status else {
        return ParsedStatus::unknown();
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return ParsedStatus::unknown();
    }

    if trimmed.eq_ignore_ascii_case("cancelled") {
        return ParsedStatus {
            kind: StatusKind::Cancelled,
            actual_time: None,
            actual_date: None,
        };
    }
    if trimmed.eq_ignore_ascii_case("delayed") {
        return ParsedStatus {
            kind: StatusKind::Delayed,
            actual_time: None,
            actual_date: None,
        };
    }

    let Some(caps) = status_re().captures(trimmed) else {
        return ParsedStatus::unknown();
    };

    let kind = match caps[1].to_ascii_lowercase().as_str() {
        "dep" => StatusKind::Departed,
        "arr" => StatusKind::Arrived,
        "at gate" => StatusKind::AtGate,
        _ => StatusKind::Unknown,
    };
    let actual_time = NaiveTime::parse_from_str(&caps[2], "%H:%M").ok();
    let actual_date = match (caps.get(3), caps.get(4), caps.get(5)) {
        (Some(day), Some(month), Some(year)) => {
            match (
                day.as_str().parse(),
                month.as_str().parse(),
                year.as_str().parse(),
            ) {
                (Ok(d), Ok(m), Ok(y)) => NaiveDate::from_ymd_opt(y, m, d),
                _ => None,
            }
        }
        _ => None,
    };

    ParsedStatus {
        kind,
        actual_time,
        actual_date,
    }
}
