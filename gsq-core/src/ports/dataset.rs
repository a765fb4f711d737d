// gsq-core/src/ports/dataset.rs

use async_trait::async_trait;
use std::path::Path;

use crate::domain::table::Table;
use crate::error::GsqError;

/// Reads a tabular dataset (CSV, Parquet, JSON...) into memory.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn load(&self, location: &str) -> Result<Table, GsqError>;
}

/// Persists an emitted table. Overwrites whatever sits at `path`.
#[async_trait]
pub trait TableSink: Send + Sync {
    async fn write_table(&self, table: &Table, path: &Path) -> Result<(), GsqError>;
}
