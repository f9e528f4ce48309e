//! Persistence of a run's output.
//!
//! Local files are the record of truth: the raw batch, the processed batch
//! and its CSV rendering are written to the output directory, and any write
//! failure fails the run. The warehouse load that follows is a best-effort
//! mirror. Its outcome is reported in [`PersistResult`] and logged, but never
//! turned into an error.

use crate::errors::PipelineError;
use crate::models::ProcessedArticle;
use crate::outputs::{PROCESSED_CSV, PROCESSED_JSON, RAW_JSON, csv, json};
use crate::warehouse::{Warehouse, load_processed};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

/// Warehouse table the processed rows are appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseTarget {
    pub dataset: String,
    pub table: String,
}

/// Where a run's output goes.
#[derive(Debug, Clone)]
pub struct Destination {
    pub output_dir: PathBuf,
    /// `None` disables the warehouse load.
    pub warehouse: Option<WarehouseTarget>,
}

/// How the warehouse load went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarehouseOutcome {
    /// Not attempted: no warehouse configured, or nothing to load.
    Skipped,
    Loaded { rows: usize },
    Failed { reason: String },
}

/// Files written and the warehouse outcome of one persist call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistResult {
    pub files: Vec<PathBuf>,
    pub warehouse: WarehouseOutcome,
}

fn local_failure(path: &Path, cause: impl ToString) -> PipelineError {
    PipelineError::LocalPersistence {
        path: path.display().to_string(),
        cause: cause.to_string(),
    }
}

async fn create_output_dir(dir: &Path) -> Result<(), PipelineError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| local_failure(dir, e))
}

/// Write `raw` and `processed` to the output directory, then mirror
/// `processed` into the warehouse when one is configured.
///
/// # Errors
///
/// Returns [`PipelineError::LocalPersistence`] when the directory or any of
/// the three files cannot be written. Warehouse failures are not errors.
#[instrument(level = "info", skip_all, fields(
    output_dir = %destination.output_dir.display(),
    count = processed.len()
))]
pub async fn persist<R, W>(
    raw: &R,
    processed: &[ProcessedArticle],
    destination: &Destination,
    warehouse: Option<&W>,
) -> Result<PersistResult, PipelineError>
where
    R: Serialize + ?Sized,
    W: Warehouse,
{
    let dir = &destination.output_dir;
    create_output_dir(dir).await?;

    let raw_path = dir.join(RAW_JSON);
    json::write_json(&raw_path, raw)
        .await
        .map_err(|e| local_failure(&raw_path, e))?;

    let processed_path = dir.join(PROCESSED_JSON);
    json::write_json(&processed_path, processed)
        .await
        .map_err(|e| local_failure(&processed_path, e))?;

    let csv_path = dir.join(PROCESSED_CSV);
    csv::write_processed_csv(&csv_path, processed)
        .await
        .map_err(|e| local_failure(&csv_path, e))?;

    let files = vec![raw_path, processed_path, csv_path];
    info!(files = files.len(), "Local output written");

    let warehouse = mirror_to_warehouse(processed, destination.warehouse.as_ref(), warehouse).await;
    Ok(PersistResult { files, warehouse })
}

async fn mirror_to_warehouse<W: Warehouse>(
    processed: &[ProcessedArticle],
    target: Option<&WarehouseTarget>,
    warehouse: Option<&W>,
) -> WarehouseOutcome {
    let Some(target) = target else {
        info!("Warehouse not configured; skipping load");
        return WarehouseOutcome::Skipped;
    };
    let Some(warehouse) = warehouse else {
        error!(
            dataset = %target.dataset,
            table = %target.table,
            "Warehouse configured but no client is connected; local files remain the record"
        );
        return WarehouseOutcome::Failed {
            reason: "warehouse client unavailable".to_string(),
        };
    };
    if processed.is_empty() {
        warn!("No processed rows; skipping warehouse load");
        return WarehouseOutcome::Skipped;
    }

    match load_processed(warehouse, &target.dataset, &target.table, processed).await {
        Ok(rows) => WarehouseOutcome::Loaded { rows },
        Err(e) => {
            error!(
                error = %e,
                dataset = %target.dataset,
                table = %target.table,
                "Warehouse load failed; local files remain the record"
            );
            WarehouseOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

/// Persist records that carried no title column.
///
/// The records are written unmodified as both the raw and the processed JSON.
/// There are no metric columns to tabulate or mirror, so the CSV and the
/// warehouse load are skipped.
#[instrument(level = "info", skip_all, fields(
    output_dir = %destination.output_dir.display(),
    count = records.len()
))]
pub async fn persist_pass_through(
    records: &[Value],
    destination: &Destination,
) -> Result<PersistResult, PipelineError> {
    let dir = &destination.output_dir;
    create_output_dir(dir).await?;

    let mut files = Vec::with_capacity(2);
    for name in [RAW_JSON, PROCESSED_JSON] {
        let path = dir.join(name);
        json::write_json(&path, records)
            .await
            .map_err(|e| local_failure(&path, e))?;
        files.push(path);
    }
    warn!("Records passed through without metrics; CSV and warehouse load skipped");
    Ok(PersistResult {
        files,
        warehouse: WarehouseOutcome::Skipped,
    })
}
