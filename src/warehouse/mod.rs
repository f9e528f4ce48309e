//! Analytics warehouse sink.
//!
//! The warehouse is an append-only mirror of the processed output. This
//! module defines what the pipeline needs from one ([`Warehouse`]), the
//! default table layout ([`default_schema`]) and the load sequence
//! ([`load_processed`]). [`bigquery`] implements the trait against the
//! BigQuery REST API.

pub mod bigquery;

use crate::errors::WarehouseError;
use crate::models::ProcessedArticle;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument};

/// Column type in the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Integer,
    Timestamp,
}

/// Column mode in the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    Required,
    Nullable,
    Repeated,
}

/// One column of a warehouse table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSchema {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub mode: FieldMode,
}

const fn field(name: &'static str, field_type: FieldType, mode: FieldMode) -> FieldSchema {
    FieldSchema {
        name,
        field_type,
        mode,
    }
}

/// Layout of the processed-articles table.
pub fn default_schema() -> Vec<FieldSchema> {
    use FieldMode::*;
    use FieldType::*;
    vec![
        field("title", String, Required),
        field("kicker", String, Nullable),
        field("image_url", String, Nullable),
        field("link", String, Nullable),
        field("title_word_count", Integer, Nullable),
        field("title_char_count", Integer, Nullable),
        field("title_capital_words", String, Repeated),
        field("ingestion_timestamp", Timestamp, Required),
    ]
}

/// Stable identifier of a row, used to deduplicate repeated appends.
pub fn insert_id(row: &ProcessedArticle) -> String {
    let mut hasher = Sha256::new();
    hasher.update(row.article.title.as_bytes());
    hasher.update([0u8]);
    hasher.update(row.article.link.as_bytes());
    hasher.update([0u8]);
    hasher.update(row.article.ingestion_timestamp.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The operations the pipeline needs from an analytics warehouse.
pub trait Warehouse {
    /// Create `dataset` unless it already exists.
    async fn ensure_dataset(&self, dataset: &str) -> Result<(), WarehouseError>;

    /// Create `dataset.table` with `schema` unless it already exists.
    async fn ensure_table(
        &self,
        dataset: &str,
        table: &str,
        schema: &[FieldSchema],
    ) -> Result<(), WarehouseError>;

    /// Append `rows` to `dataset.table`. Existing rows are never touched.
    ///
    /// Returns the number of rows accepted.
    async fn append_rows(
        &self,
        dataset: &str,
        table: &str,
        rows: &[ProcessedArticle],
    ) -> Result<usize, WarehouseError>;
}

/// Make sure the destination exists, then append `rows` to it.
#[instrument(level = "info", skip_all, fields(%dataset, %table, rows = rows.len()))]
pub async fn load_processed<W: Warehouse>(
    warehouse: &W,
    dataset: &str,
    table: &str,
    rows: &[ProcessedArticle],
) -> Result<usize, WarehouseError> {
    warehouse.ensure_dataset(dataset).await?;
    warehouse
        .ensure_table(dataset, table, &default_schema())
        .await?;
    let appended = warehouse.append_rows(dataset, table, rows).await?;
    info!(appended, "Warehouse load complete");
    Ok(appended)
}
