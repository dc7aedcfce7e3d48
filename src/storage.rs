//! CSV persistence for flight records.
//!
//! Two layouts share one schema
//! (`date,flight_no,airline,origin,destination,scheduled_time,status,direction,cargo`):
//!
//! - **per-date files**: `<dir>/YYYY-MM-DD.csv`, one file per calendar day,
//!   always rewritten wholesale. Serialization is deterministic, so
//!   re-dumping unchanged upstream data leaves the file byte-identical —
//!   which keeps diffs quiet when the data directory lives in version
//!   control.
//! - **single file**: one CSV holding many days, refreshed with
//!   [`merge_into_file`]. A refetched day replaces every prior row for that
//!   day; untouched days are carried over as-is.

use crate::types::{Direction, FlightRecord};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV format error: {0}")]
    Csv(#[from] csv::Error),
}

/// Duplicate-detection key for single-file merges. The date is part of
/// the key: scheduled service repeats the same flight number and time
/// every day, and each day's movement is a distinct row.
type MergeKey = (NaiveDate, String, Option<chrono::NaiveTime>, Direction);

fn merge_key(record: &FlightRecord) -> MergeKey {
    (
        record.date,
        record.flight_no.clone(),
        record.scheduled_time,
        record.direction,
    )
}

/// Path of the per-date file for `date` inside `dir`.
pub fn day_file_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}.csv", date.format("%Y-%m-%d")))
}

/// Serialize `records` as CSV with a header row.
pub fn write_csv<W: Write>(writer: W, records: &[FlightRecord]) -> Result<(), StorageError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write `records` to `path`, replacing any existing file.
pub fn write_csv_file(path: &Path, records: &[FlightRecord]) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    write_csv(io::BufWriter::new(file), records)
}

/// Read a whole CSV file of flight records.
pub fn read_csv_file(path: &Path) -> Result<Vec<FlightRecord>, StorageError> {
    let file = fs::File::open(path)?;
    let mut reader = csv::Reader::from_reader(io::BufReader::new(file));
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Overwrite the per-date file for `date` with `records`, creating `dir`
/// if needed. Returns the path written.
pub fn write_day_file(
    dir: &Path,
    date: NaiveDate,
    records: &[FlightRecord],
) -> Result<PathBuf, StorageError> {
    fs::create_dir_all(dir)?;
    let path = day_file_path(dir, date);
    write_csv_file(&path, records)?;
    tracing::debug!(path = %path.display(), count = records.len(), "Wrote day file");
    Ok(path)
}

/// Read the per-date file for `date` from `dir`.
pub fn read_day_file(dir: &Path, date: NaiveDate) -> Result<Vec<FlightRecord>, StorageError> {
    read_csv_file(&day_file_path(dir, date))
}

/// Merge `new_records` into the single-file CSV at `path`.
///
/// Every existing row whose date appears in the new batch is dropped (a
/// refetched day is replaced wholesale, never patched row-by-row). Rows for
/// other days are kept, and a new record that exactly matches a kept row's
/// (date, flight number, scheduled time, direction) key is not duplicated. The
/// result is written back sorted by date ascending, stable within a day,
/// and also returned.
pub fn merge_into_file(
    path: &Path,
    new_records: &[FlightRecord],
) -> Result<Vec<FlightRecord>, StorageError> {
    let new_dates: HashSet<NaiveDate> = new_records.iter().map(|r| r.date).collect();

    let mut merged: Vec<FlightRecord> = if path.exists() {
        read_csv_file(path)?
            .into_iter()
            .filter(|r| !new_dates.contains(&r.date))
            .collect()
    } else {
        Vec::new()
    };

    let kept_keys: HashSet<MergeKey> = merged.iter().map(merge_key).collect();
    for record in new_records {
        if kept_keys.contains(&merge_key(record)) {
            tracing::debug!(
                flight_no = %record.flight_no,
                date = %record.date,
                "Skipping record already present in merged file"
            );
            continue;
        }
        merged.push(record.clone());
    }

    merged.sort_by_key(|r| r.date);
    write_csv_file(path, &merged)?;
    tracing::info!(
        path = %path.display(),
        total = merged.len(),
        refreshed_days = new_dates.len(),
        "Merged records into file"
    );
    Ok(merged)
}

/// Collapse records sharing (flight number, date, direction), keeping the
/// first seen. Order of the survivors is preserved.
pub fn deduplicate(records: Vec<FlightRecord>) -> Vec<FlightRecord> {
    let mut seen: HashSet<(String, NaiveDate, Direction)> = HashSet::new();
    records
        .into_iter()
        .filter(|r| seen.insert((r.flight_no.clone(), r.date, r.direction)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use tempfile::TempDir;

    fn record(flight_no: &str, date: NaiveDate, direction: Direction) -> FlightRecord {
        FlightRecord {
            date,
            flight_no: flight_no.to_string(),
            airline: "CPA".to_string(),
            origin: if direction == Direction::Departure {
                "HKG".to_string()
            } else {
                "TPE".to_string()
            },
            destination: if direction == Direction::Departure {
                "TPE".to_string()
            } else {
                "HKG".to_string()
            },
            scheduled_time: NaiveTime::from_hms_opt(8, 30, 0),
            status: Some("Dep 08:32".to_string()),
            direction,
            cargo: false,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = TempDir::new().unwrap();
        let d = date(2025, 2, 17);
        let records = vec![
            record("CX 450", d, Direction::Departure),
            record("CX 451", d, Direction::Arrival),
        ];

        let path = write_day_file(dir.path(), d, &records).unwrap();
        assert_eq!(path.file_name().unwrap(), "2025-02-17.csv");

        let read_back = read_day_file(dir.path(), d).unwrap();
        assert_eq!(read_back, records);
    }

    #[test]
    fn test_csv_header_and_columns() {
        let mut buf = Vec::new();
        let records = vec![record("CX 450", date(2025, 2, 17), Direction::Departure)];
        write_csv(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "date,flight_no,airline,origin,destination,scheduled_time,status,direction,cargo"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2025-02-17,CX 450,CPA,HKG,TPE,08:30,Dep 08:32,departure,false"
        );
    }

    #[test]
    fn test_missing_time_and_status_round_trip() {
        let dir = TempDir::new().unwrap();
        let d = date(2025, 2, 17);
        let mut r = record("CX 450", d, Direction::Departure);
        r.scheduled_time = None;
        r.status = None;

        write_day_file(dir.path(), d, &[r.clone()]).unwrap();
        let read_back = read_day_file(dir.path(), d).unwrap();
        assert_eq!(read_back, vec![r]);
    }

    #[test]
    fn test_day_file_rewrite_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let d = date(2025, 2, 17);
        let records = vec![
            record("CX 450", d, Direction::Departure),
            record("CX 451", d, Direction::Arrival),
        ];

        let path = write_day_file(dir.path(), d, &records).unwrap();
        let first = fs::read(&path).unwrap();
        write_day_file(dir.path(), d, &records).unwrap();
        let second = fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_merge_creates_file_when_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flights.csv");
        let d = date(2025, 2, 17);
        let records = vec![record("CX 450", d, Direction::Departure)];

        let merged = merge_into_file(&path, &records).unwrap();
        assert_eq!(merged, records);
        assert_eq!(read_csv_file(&path).unwrap(), records);
    }

    #[test]
    fn test_merge_replaces_refetched_day_wholesale() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flights.csv");
        let d = date(2025, 2, 17);

        let first_fetch = vec![
            record("CX 450", d, Direction::Departure),
            record("CX 999", d, Direction::Departure),
        ];
        merge_into_file(&path, &first_fetch).unwrap();

        // Second fetch for the same day: CX 999 no longer reported.
        let second_fetch = vec![record("CX 450", d, Direction::Departure)];
        let merged = merge_into_file(&path, &second_fetch).unwrap();

        assert_eq!(merged, second_fetch);
        assert_eq!(read_csv_file(&path).unwrap(), second_fetch);
    }

    #[test]
    fn test_merge_keeps_untouched_days_sorted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flights.csv");
        let d1 = date(2025, 2, 17);
        let d2 = date(2025, 2, 18);

        merge_into_file(&path, &[record("CX 450", d2, Direction::Departure)]).unwrap();
        let merged =
            merge_into_file(&path, &[record("CX 440", d1, Direction::Departure)]).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].date, d1);
        assert_eq!(merged[1].date, d2);
    }

    #[test]
    fn test_merge_keeps_daily_recurring_flight_on_every_day() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flights.csv");
        let d1 = date(2025, 2, 17);
        let d2 = date(2025, 2, 18);

        // Same flight number, time, and direction on consecutive days, as
        // scheduled service normally is.
        merge_into_file(&path, &[record("CX 450", d1, Direction::Departure)]).unwrap();
        let merged =
            merge_into_file(&path, &[record("CX 450", d2, Direction::Departure)]).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].date, d1);
        assert_eq!(merged[1].date, d2);
        assert_eq!(merged[0].flight_no, merged[1].flight_no);
    }

    #[test]
    fn test_merge_twice_no_duplication() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flights.csv");
        let d = date(2025, 2, 17);
        let records = vec![
            record("CX 450", d, Direction::Departure),
            record("CX 451", d, Direction::Arrival),
        ];

        merge_into_file(&path, &records).unwrap();
        let merged = merge_into_file(&path, &records).unwrap();
        assert_eq!(merged, records);
    }

    #[test]
    fn test_deduplicate_keeps_first_seen() {
        let d = date(2025, 2, 17);
        let mut duplicate = record("CX 450", d, Direction::Departure);
        duplicate.status = Some("Dep 08:40".to_string());
        let records = vec![
            record("CX 450", d, Direction::Departure),
            duplicate,
            record("CX 451", d, Direction::Arrival),
        ];

        let deduped = deduplicate(records);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].flight_no, "CX 450");
        assert_eq!(deduped[0].status.as_deref(), Some("Dep 08:32"));
        assert_eq!(deduped[1].flight_no, "CX 451");
    }

    #[test]
    fn test_deduplicate_distinguishes_date_and_direction() {
        let d1 = date(2025, 2, 17);
        let d2 = date(2025, 2, 18);
        let records = vec![
            record("CX 450", d1, Direction::Departure),
            record("CX 450", d2, Direction::Departure),
            record("CX 450", d1, Direction::Arrival),
        ];
        assert_eq!(deduplicate(records).len(), 3);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = read_day_file(dir.path(), date(2025, 2, 17)).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[test]
    fn test_read_malformed_file_is_csv_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("2025-02-17.csv");
        fs::write(
            &path,
            "date,flight_no,airline,origin,destination,scheduled_time,status,direction,cargo\n\
             not-a-date,CX 450,CPA,HKG,TPE,08:30,,departure,false\n",
        )
        .unwrap();
        let err = read_day_file(dir.path(), date(2025, 2, 17)).unwrap_err();
        assert!(matches!(err, StorageError::Csv(_)));
    }
}
