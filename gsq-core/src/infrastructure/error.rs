// gsq-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(gsq::infra::database::duckdb),
        help("An error occurred inside the embedded SQL engine while reading or writing a table.")
    )]
    DuckDB(#[from] duckdb::Error),

    #[error("DuckDB Mutex Poisoned")]
    #[diagnostic(code(gsq::infra::database::poisoned))]
    Poisoned,
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Abstracted) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(gsq::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(gsq::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON Error: {0}")]
    #[diagnostic(code(gsq::infra::json))]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Configuration not found at '{0}'")]
    #[diagnostic(code(gsq::infra::config_missing))]
    ConfigNotFound(String),

    // --- NETWORK ---
    #[error("HTTP transport error for {url}: {reason}")]
    #[diagnostic(code(gsq::infra::http))]
    Http { url: String, reason: String },

    #[error("Unsupported dataset format: {0}")]
    #[diagnostic(
        code(gsq::infra::dataset_format),
        help("Supported extensions: .csv, .tsv, .parquet, .json, .jsonl")
    )]
    UnsupportedFormat(String),
}

// Manual implementation for shortcuts (e.g. `?` operator on duckdb calls)
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}

impl From<anyhow::Error> for InfrastructureError {
    fn from(err: anyhow::Error) -> Self {
        InfrastructureError::ConfigError(format!("{:#}", err))
    }
}
