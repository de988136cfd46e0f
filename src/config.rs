//! Runtime settings, read from the environment (and `.env`).
//!
//! | Variable               | Default                         |
//! |------------------------|---------------------------------|
//! | `TRIPDATA_INPUT_DIR`   | `input`                         |
//! | `TRIPDATA_OUTPUT_DIR`  | `output`                        |
//! | `TRIPDATA_BASE_URL`    | [`crate::fetch::DEFAULT_BASE_URL`] |
//! | `TRIPDATA_CONCURRENCY` | `4`                             |

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::catalog::DataLayout;
use crate::fetch::DEFAULT_BASE_URL;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct Settings {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub base_url: String,
    /// Upper bound on units processed at the same time.
    pub concurrency: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let concurrency = match get("TRIPDATA_CONCURRENCY") {
            Some(raw) => raw.trim().parse::<usize>().with_context(|| {
                format!("TRIPDATA_CONCURRENCY must be a number, got '{raw}'")
            })?,
            None => DEFAULT_CONCURRENCY,
        };

        Ok(Self {
            input_root: get("TRIPDATA_INPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("input")),
            output_root: get("TRIPDATA_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            base_url: get("TRIPDATA_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            concurrency: concurrency.max(1),
        })
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.input_root, &self.output_root)
    }
}
