//! Error taxonomy for the transform pipeline.
//!
//! Every variant is local to one processing unit: the orchestrator records it
//! against the unit's source file and keeps going with the rest of the batch.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TripDataError {
    /// The source file for a unit is not on disk (yet).
    #[error("source file '{}' does not exist", path.display())]
    MissingInput { path: PathBuf },

    /// Neither known column layout matches, or a canonical column is unusable.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("malformed timestamp in column '{column}': {value:?}")]
    MalformedTimestamp { column: &'static str, value: String },

    #[error("failed to read '{}': {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl TripDataError {
    /// Short, stable name of the error kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            TripDataError::MissingInput { .. } => "missing_input",
            TripDataError::SchemaMismatch(_) => "schema_mismatch",
            TripDataError::MalformedTimestamp { .. } => "malformed_timestamp",
            TripDataError::Read { .. } => "read_error",
            TripDataError::Write { .. } => "write_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, TripDataError>;

/// A processing unit that did not produce its output.
#[derive(Debug, Error)]
#[error("processing '{}' failed ({kind}): {message}", input.display())]
pub struct UnitFailure {
    pub input: PathBuf,
    pub kind: &'static str,
    pub message: String,
}

impl UnitFailure {
    pub fn new(input: PathBuf, error: &TripDataError) -> Self {
        Self {
            input,
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    /// The unit's task died before returning a result.
    pub fn aborted(input: PathBuf, message: impl Into<String>) -> Self {
        Self {
            input,
            kind: "aborted",
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_message_names_file() {
        let err = TripDataError::MissingInput {
            path: PathBuf::from("input/2023/green_tripdata_2023-01.parquet"),
        };
        assert!(err.to_string().contains("green_tripdata_2023-01.parquet"));
        assert_eq!(err.kind(), "missing_input");
    }

    #[test]
    fn test_unit_failure_names_file_and_kind() {
        let err = TripDataError::SchemaMismatch("no pickup column".to_string());
        let input = PathBuf::from("input/2023/yellow_tripdata_2023-04.parquet");
        let failure = UnitFailure::new(input, &err);
        let msg = failure.to_string();
        assert!(msg.contains("yellow_tripdata_2023-04.parquet"));
        assert!(msg.contains("schema_mismatch"));
        assert!(msg.contains("no pickup column"));
    }

    #[test]
    fn test_malformed_timestamp_message() {
        let err = TripDataError::MalformedTimestamp {
            column: "pickup_datetime",
            value: "yesterday".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("pickup_datetime"));
        assert!(msg.contains("yesterday"));
    }
}
