//! Fetch-if-missing downloader for monthly trip files.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use tracing::{Instrument, error, info};

use crate::catalog::{DataLayout, ProcessingUnit, next_missing_month};

/// Public distribution point of the monthly trip files.
pub const DEFAULT_BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net/trip-data/";

/// GETs `url` and returns the body. Non-success statuses are errors.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?)
}

/// Remote location of `unit`'s input file under `base_url`.
pub fn source_url(base_url: &str, unit: &ProcessingUnit) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        unit.input_file_name()
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Downloaded(PathBuf),
    AlreadyPresent(PathBuf),
}

/// Downloads `unit`'s input file unless it is already on disk.
///
/// The body is written next to the target with a `.part` suffix and renamed
/// into place, so an interrupted download never looks like an input file.
pub async fn download_if_missing<C: HttpClient + ?Sized>(
    client: &C,
    base_url: &str,
    unit: &ProcessingUnit,
    layout: &DataLayout,
) -> Result<DownloadOutcome> {
    let target = unit.input_path(layout);
    if target.exists() {
        info!(file = %unit.input_file_name(), "Source file already exists");
        return Ok(DownloadOutcome::AlreadyPresent(target));
    }

    let url = source_url(base_url, unit);
    info!(file = %unit.input_file_name(), %url, "Downloading");

    let body = fetch_bytes(client, &url)
        .await
        .with_context(|| format!("download of '{url}' failed"))?;

    let partial = target.with_extension("parquet.part");
    tokio::fs::write(&partial, &body)
        .await
        .with_context(|| format!("failed to write '{}'", partial.display()))?;
    tokio::fs::rename(&partial, &target)
        .await
        .with_context(|| format!("failed to move '{}' into place", partial.display()))?;

    info!(file = %unit.input_file_name(), bytes = body.len(), "Downloaded");
    Ok(DownloadOutcome::Downloaded(target))
}

/// Downloads both variants of the earliest month of `year` that is not yet
/// fully on disk.
///
/// The two downloads run concurrently; a failed download is logged and left
/// out of the result without cancelling the other. Returns an empty list when
/// every month is already present.
pub async fn download_next_month<C: HttpClient + 'static>(
    client: Arc<C>,
    base_url: &str,
    layout: &DataLayout,
    year: i32,
) -> Vec<DownloadOutcome> {
    let Some(units) = next_missing_month(layout, year) else {
        info!(year, "No more data to be downloaded");
        return Vec::new();
    };

    let mut tasks = vec![];

    for unit in units {
        let client = client.clone();
        let base_url = base_url.to_string();
        let layout = layout.clone();

        let unit_span = tracing::info_span!(
            "download",
            variant = %unit.variant,
            year = unit.year,
            month = unit.month,
        );

        let task = tokio::spawn(
            async move {
                match download_if_missing(client.as_ref(), &base_url, &unit, &layout).await {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        error!(error = %e, "Download failed");
                        None
                    }
                }
            }
            .instrument(unit_span),
        );

        tasks.push(task);
    }

    let mut outcomes = Vec::new();
    for task in tasks {
        match task.await {
            Ok(Some(outcome)) => outcomes.push(outcome),
            Ok(None) => {}
            Err(e) => error!(error = %e, "Download task aborted"),
        }
    }

    outcomes
}
