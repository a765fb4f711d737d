// gsq-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Invalid metric name '{name}'")]
    #[diagnostic(
        code(gsq::domain::metric),
        help("metric_names must be a comma-separated subset of: {allowed}")
    )]
    InvalidMetric { name: String, allowed: String },

    #[error("No metric requested")]
    #[diagnostic(code(gsq::domain::metric_empty))]
    NoMetrics,

    #[error("Parameter out of range: {0}")]
    #[diagnostic(code(gsq::domain::parameter))]
    ParameterOutOfRange(String),

    #[error("Detected duplicate specified columns: {0}")]
    #[diagnostic(
        code(gsq::domain::duplicate_columns),
        help("prompt, completion, context and ground truth column names must all be distinct.")
    )]
    DuplicateColumns(String),

    #[error("Column '{0}' is not currently supported and cannot be used as a specified column")]
    #[diagnostic(code(gsq::domain::unsupported_column))]
    UnsupportedColumn(String),

    #[error("Column '{canonical}' already exists in production_dataset and would be shadowed by the mapped column '{source_column}'")]
    #[diagnostic(
        code(gsq::domain::ambiguous_column),
        help("Rename or drop the existing '{canonical}' column, or map it explicitly.")
    )]
    AmbiguousColumn {
        canonical: String,
        source_column: String,
    },

    #[error("production_dataset already has a column named '{0}', which is reserved for the metric rating")]
    #[diagnostic(
        code(gsq::domain::rating_column),
        help("Violation tables append the rating under the metric's compact name. Rename the dataset column.")
    )]
    RatingColumnClash(String),

    #[error("production_dataset must have column: {0}")]
    #[diagnostic(code(gsq::domain::missing_column))]
    MissingColumn(String),

    #[error("Rating {rating} for metric '{metric}' (row {index}) is outside the 1..=5 scale")]
    #[diagnostic(
        code(gsq::domain::rating_range),
        help("The evaluator broke the rating contract. Ratings are never clipped.")
    )]
    RatingOutOfRange {
        metric: String,
        index: i64,
        rating: i64,
    },

    #[error("Row {index} carries no rating for metric '{metric}'")]
    #[diagnostic(code(gsq::domain::rating_missing))]
    MissingRating { metric: String, index: i64 },

    #[error("Table Error: {0}")]
    #[diagnostic(code(gsq::domain::table))]
    TableError(String),
}
