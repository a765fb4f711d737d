// gsq-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use duckdb::types::Value;
use duckdb::{Config, Connection, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument};

// Imports Hexagonaux
use crate::domain::table::{Cell, Table};
use crate::error::GsqError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::dataset::{DatasetSource, TableSink};

const SOURCE_VIEW: &str = "gsq_source";
const SINK_TABLE: &str = "gsq_sink";

const INTEGER_TYPES: [&str; 8] = [
    "TINYINT", "SMALLINT", "INTEGER", "BIGINT", "UTINYINT", "USMALLINT", "UINTEGER", "BOOLEAN",
];

/// Embedded DuckDB used both to read datasets and to write artifacts.
pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbStore {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();
        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn in_memory() -> Result<Self, InfrastructureError> {
        Self::new(":memory:")
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, InfrastructureError> {
        self.conn
            .lock()
            .map_err(|_| InfrastructureError::Database(DatabaseError::Poisoned))
    }
}

/// DuckDB table function for a dataset path, chosen by extension.
fn reader_for(location: &str) -> Result<String, InfrastructureError> {
    let ext = Path::new(location)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let path = quote_literal(location);

    match ext.as_str() {
        "csv" | "tsv" => Ok(format!("read_csv_auto({}, header = true)", path)),
        "parquet" => Ok(format!("read_parquet({})", path)),
        "json" | "jsonl" | "ndjson" => Ok(format!("read_json_auto({})", path)),
        _ => Err(InfrastructureError::UnsupportedFormat(location.to_string())),
    }
}

fn quote_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

fn quote_ident(raw: &str) -> String {
    format!("\"{}\"", raw.replace('"', "\"\""))
}

fn is_integer_type(data_type: &str) -> bool {
    INTEGER_TYPES.contains(&data_type.to_ascii_uppercase().as_str())
}

/// A column is written as BIGINT only when every non-null cell is an integer.
fn column_is_integer(table: &Table, idx: usize) -> bool {
    let mut saw_int = false;
    for row in &table.rows {
        match row.get(idx) {
            Some(Cell::Int(_)) => saw_int = true,
            Some(Cell::Null) | None => {}
            Some(Cell::Text(_)) => return false,
        }
    }
    saw_int
}

fn to_value(cell: &Cell, integer_column: bool) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Int(v) if integer_column => Value::BigInt(*v),
        Cell::Int(v) => Value::Text(v.to_string()),
        Cell::Text(s) => Value::Text(s.clone()),
    }
}

#[async_trait]
impl DatasetSource for DuckDbStore {
    #[instrument(skip(self))]
    async fn load(&self, location: &str) -> Result<Table, GsqError> {
        if !Path::new(location).exists() {
            return Err(InfrastructureError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("dataset not found: {}", location),
            ))
            .into());
        }
        let source = reader_for(location)?;
        let conn = self.lock()?;

        conn.execute_batch(&format!(
            "CREATE OR REPLACE TEMP VIEW {} AS SELECT * FROM {}",
            SOURCE_VIEW, source
        ))
        .map_err(InfrastructureError::from)?;

        let schema: Vec<(String, String)> = {
            let mut stmt = conn
                .prepare(&format!("PRAGMA table_info('{}')", SOURCE_VIEW))
                .map_err(InfrastructureError::from)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get("name")?, row.get("type")?)))
                .map_err(InfrastructureError::from)?;
            rows.collect::<Result<_, _>>()
                .map_err(InfrastructureError::from)?
        };

        let projections: Vec<String> = schema
            .iter()
            .map(|(name, data_type)| {
                let target = if is_integer_type(data_type) { "BIGINT" } else { "VARCHAR" };
                format!("CAST({} AS {})", quote_ident(name), target)
            })
            .collect();

        let mut table = Table::new(schema.iter().map(|(name, _)| name.clone()));
        if projections.is_empty() {
            return Ok(table);
        }

        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM {}", projections.join(", "), SOURCE_VIEW))
            .map_err(InfrastructureError::from)?;
        let mut rows = stmt.query([]).map_err(InfrastructureError::from)?;

        while let Some(row) = rows.next().map_err(InfrastructureError::from)? {
            let mut cells = Vec::with_capacity(schema.len());
            for (i, (_, data_type)) in schema.iter().enumerate() {
                let cell = if is_integer_type(data_type) {
                    row.get::<_, Option<i64>>(i)
                        .map_err(InfrastructureError::from)?
                        .map(Cell::Int)
                        .unwrap_or(Cell::Null)
                } else {
                    Cell::from(row.get::<_, Option<String>>(i).map_err(InfrastructureError::from)?)
                };
                cells.push(cell);
            }
            table.push_row(cells)?;
        }

        debug!(rows = table.len(), columns = table.columns.len(), "Dataset loaded");
        Ok(table)
    }
}

#[async_trait]
impl TableSink for DuckDbStore {
    #[instrument(skip(self, table), fields(rows = table.len()))]
    async fn write_table(&self, table: &Table, path: &Path) -> Result<(), GsqError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => "FORMAT CSV, HEADER",
            Some("parquet") => "FORMAT PARQUET",
            _ => {
                return Err(
                    InfrastructureError::UnsupportedFormat(path.display().to_string()).into(),
                );
            }
        };

        let integer_columns: Vec<bool> = (0..table.columns.len())
            .map(|i| column_is_integer(table, i))
            .collect();

        let definitions: Vec<String> = table
            .columns
            .iter()
            .zip(&integer_columns)
            .map(|(name, is_int)| {
                format!("{} {}", quote_ident(name), if *is_int { "BIGINT" } else { "VARCHAR" })
            })
            .collect();

        let conn = self.lock()?;
        conn.execute_batch(&format!(
            "CREATE OR REPLACE TEMP TABLE {} ({})",
            SINK_TABLE,
            definitions.join(", ")
        ))
        .map_err(InfrastructureError::from)?;

        {
            let placeholders = vec!["?"; table.columns.len()].join(", ");
            let mut stmt = conn
                .prepare(&format!("INSERT INTO {} VALUES ({})", SINK_TABLE, placeholders))
                .map_err(InfrastructureError::from)?;
            for row in &table.rows {
                let values = row
                    .iter()
                    .zip(&integer_columns)
                    .map(|(cell, is_int)| to_value(cell, *is_int));
                stmt.execute(params_from_iter(values))
                    .map_err(InfrastructureError::from)?;
            }
        }

        conn.execute_batch(&format!(
            "COPY {} TO {} ({}); DROP TABLE {};",
            SINK_TABLE,
            quote_literal(&path.to_string_lossy()),
            format,
            SINK_TABLE
        ))
        .map_err(InfrastructureError::from)?;

        debug!(path = %path.display(), "Table written");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_csv_keeps_types() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("prod.csv");
        std::fs::write(&path, "id,prompt,completion\n7,hello,world\n8,it's,fine\n")?;

        let store = DuckDbStore::in_memory()?;
        let table = store.load(&path.to_string_lossy()).await?;

        assert_eq!(table.columns, vec!["id", "prompt", "completion"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "id"), Some(&Cell::Int(7)));
        assert_eq!(table.cell(1, "prompt"), Some(&Cell::from("it's")));
        Ok(())
    }

    #[tokio::test]
    async fn test_write_then_read_parquet() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out/histogram.parquet");

        let mut table = Table::new(["metric_name", "group", "metric_value", "threshold_value"]);
        table.push_row(vec![
            Cell::from("AcceptableFluencyScorePerInstance"),
            Cell::from("1"),
            Cell::Int(5),
            Cell::from("4"),
        ])?;
        table.push_row(vec![
            Cell::from("RowCount"),
            Cell::from("production_data"),
            Cell::Int(5),
            Cell::Null,
        ])?;

        let store = DuckDbStore::in_memory()?;
        store.write_table(&table, &path).await?;
        // second write overwrites
        store.write_table(&table, &path).await?;

        let back = store.load(&path.to_string_lossy()).await?;
        assert_eq!(back, table);
        Ok(())
    }

    #[tokio::test]
    async fn test_unsupported_format() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("data.xlsx");
        std::fs::write(&path, "x")?;

        let store = DuckDbStore::in_memory()?;
        let result = store.load(&path.to_string_lossy()).await;
        assert!(matches!(
            result,
            Err(GsqError::Infrastructure(InfrastructureError::UnsupportedFormat(_)))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_dataset() -> Result<()> {
        let store = DuckDbStore::in_memory()?;
        let result = store.load("/definitely/not/here.csv").await;
        assert!(result.is_err());
        Ok(())
    }
}
