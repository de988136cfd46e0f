//! Persistence for vendor summaries.
//!
//! One CSV per processed source file, header row first, one row per vendor.

use std::path::Path;

use csv::WriterBuilder;
use tracing::debug;

use crate::error::{Result, TripDataError};
use crate::summary::types::{SUMMARY_HEADERS, VendorAggregate};

/// Writes `rows` to `path` as CSV, replacing any existing file.
///
/// The header is always written, so an empty summary still yields a file
/// with a header line.
pub fn write_summary(path: &Path, rows: &[VendorAggregate]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing summary CSV");

    let write_err = |source: csv::Error| TripDataError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(write_err)?;

    writer.write_record(SUMMARY_HEADERS).map_err(write_err)?;
    for row in rows {
        writer.serialize(row).map_err(write_err)?;
    }
    writer.flush().map_err(|e| write_err(e.into()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn row(vendor_id: i64) -> VendorAggregate {
        VendorAggregate {
            vendor_id,
            trip_count: 2,
            sum_passengers: 3,
            total_trip_duration_minutes: 15,
            mode_pickup_zone: Some(132),
            mode_dropoff_zone: None,
            sum_trip_distance: 8.0,
            sum_fare_amount: 30.5,
            mean_tip_amount: 2.0,
        }
    }

    #[test]
    fn test_write_summary_header_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("processed_yellow_tripdata_2023-01.csv");

        write_summary(&path, &[row(1), row(2)]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "VendorID,trip_count,sum_passenger,total_trip_duration (min),mode_PULocationID,mode_DOLocationID,sum_distance (km),sum_fare_amount,mean_tipAmount",
                "1,2,3,15,132,,8.0,30.5,2.0",
                "2,2,3,15,132,,8.0,30.5,2.0",
            ]
        );
    }

    #[test]
    fn test_empty_summary_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");

        write_summary(&path, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.starts_with("VendorID,"));
    }

    #[test]
    fn test_write_summary_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        write_summary(&path, &[row(1), row(2)]).unwrap();
        write_summary(&path, &[row(7)]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\n7,"));
    }

    #[test]
    fn test_unwritable_path_is_write_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing_dir").join("out.csv");

        let err = write_summary(&path, &[row(1)]).unwrap_err();
        assert_eq!(err.kind(), "write_error");
    }
}
