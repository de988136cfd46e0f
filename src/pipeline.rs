//! Per-file pipeline and the batch orchestrator that fans it out.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{Instrument, Span, error, info};

use crate::catalog::{DataLayout, ProcessingUnit};
use crate::clean::clean;
use crate::error::{Result, UnitFailure};
use crate::loader::load_trips;
use crate::output::write_summary;
use crate::summary::aggregate::aggregate_by_vendor;

/// Runs normalize, clean, aggregate and write for one unit, sequentially.
///
/// Returns the path of the summary that was written.
pub fn process_unit(unit: &ProcessingUnit, layout: &DataLayout) -> Result<PathBuf> {
    let input = unit.input_path(layout);
    let output = unit.output_path(layout);

    let trips = load_trips(&input, unit.variant)?;
    let trips = clean(trips)?;
    let rows = aggregate_by_vendor(&trips);
    write_summary(&output, &rows)?;

    Ok(output)
}

/// Outcome of a batch: every unit ends up in exactly one of the two lists.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<PathBuf>,
    pub failed: Vec<UnitFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Processes `units` concurrently and waits for all of them.
///
/// At most `concurrency` units run at once (a cap of 0 is treated as 1).
/// Units share nothing but the filesystem and write distinct outputs, so a
/// failing unit is recorded in the report and never stops its siblings.
pub async fn run_batch(
    units: Vec<ProcessingUnit>,
    layout: DataLayout,
    concurrency: usize,
) -> BatchReport {
    let layout = Arc::new(layout);
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let mut tasks = Vec::with_capacity(units.len());

    for unit in units {
        let sem = semaphore.clone();
        let layout = layout.clone();
        let input = unit.input_path(&layout);

        let unit_span = tracing::info_span!(
            "process_unit",
            variant = %unit.variant,
            year = unit.year,
            month = unit.month,
        );

        let task = tokio::spawn(
            async move {
                // the semaphore is never closed
                let _permit = sem.acquire_owned().await.ok();
                info!(file = %unit.stem(), "Transforming data");

                let span = Span::current();
                let unit_layout = layout.clone();
                let result = tokio::task::spawn_blocking(move || {
                    span.in_scope(|| process_unit(&unit, &unit_layout))
                })
                .await;

                match result {
                    Ok(Ok(output)) => {
                        info!(
                            file = %unit.stem(),
                            output = %output.display(),
                            "Data transformed"
                        );
                        Ok(output)
                    }
                    Ok(Err(e)) => {
                        error!(
                            file = %unit.stem(),
                            kind = e.kind(),
                            error = %e,
                            "Transform failed"
                        );
                        Err(UnitFailure::new(unit.input_path(&layout), &e))
                    }
                    Err(e) => {
                        error!(file = %unit.stem(), error = %e, "Transform task aborted");
                        Err(UnitFailure::aborted(unit.input_path(&layout), e.to_string()))
                    }
                }
            }
            .instrument(unit_span),
        );

        tasks.push((input, task));
    }

    let mut report = BatchReport::default();

    // Wait for all tasks to complete
    for (input, task) in tasks {
        match task.await {
            Ok(Ok(output)) => report.completed.push(output),
            Ok(Err(failure)) => report.failed.push(failure),
            Err(e) => report.failed.push(UnitFailure::aborted(input, e.to_string())),
        }
    }

    info!(
        completed = report.completed.len(),
        failed = report.failed.len(),
        "Batch finished"
    );
    report
}
