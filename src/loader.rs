//! Parquet loading for monthly trip files.

use std::fs::File;
use std::path::Path;

use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tracing::{debug, warn};

use crate::catalog::Variant;
use crate::error::{Result, TripDataError};
use crate::schema::{NormalizedTrip, SourceSchema, normalize_batch};

/// Reads a trip file and normalizes it onto the canonical field set.
///
/// The layout is detected from the file's schema before any rows are decoded,
/// and only the canonical columns are read. `expected` is the variant named by
/// the file; a mismatch with the detected layout is logged, not rejected.
pub fn load_trips(path: &Path, expected: Variant) -> Result<Vec<NormalizedTrip>> {
    if !path.exists() {
        return Err(TripDataError::MissingInput {
            path: path.to_path_buf(),
        });
    }

    let read_err = |reason: String| TripDataError::Read {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|e| read_err(e.to_string()))?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).map_err(|e| read_err(e.to_string()))?;

    let source = SourceSchema::detect(builder.schema())?;
    if source.variant != expected {
        warn!(
            detected = %source.variant,
            expected = %expected,
            "Column layout does not match file variant"
        );
    }

    let projection = source.projection(builder.schema())?;
    let mask = ProjectionMask::roots(builder.parquet_schema(), projection);
    let reader = builder
        .with_projection(mask)
        .build()
        .map_err(|e| read_err(e.to_string()))?;

    let mut trips = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| read_err(e.to_string()))?;
        trips.extend(normalize_batch(&batch, source)?);
    }

    debug!(rows = trips.len(), layout = %source.variant, "Trips loaded");
    Ok(trips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_missing_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("green_tripdata_2023-01.parquet");

        let err = load_trips(&path, Variant::Green).unwrap_err();
        assert_eq!(err.kind(), "missing_input");
    }

    #[test]
    fn test_corrupt_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("yellow_tripdata_2023-01.parquet");
        fs::write(&path, b"definitely not parquet").unwrap();

        let err = load_trips(&path, Variant::Yellow).unwrap_err();
        assert_eq!(err.kind(), "read_error");
        assert!(err.to_string().contains("yellow_tripdata_2023-01.parquet"));
    }
}
