pub mod annotation;
pub mod config;
pub mod dataset;
pub mod error;
pub mod histogram;
pub mod metric;
pub mod samples_index;
pub mod session;
pub mod table;
pub mod violation;

// Re-exports pratiques : use gsq_core::domain::{MetricName, Table, ...}
pub use annotation::AnnotatedRow;
pub use config::AnnotationConfig;
pub use dataset::{ProductionDataset, Row};
pub use error::DomainError;
pub use histogram::HistogramBucket;
pub use metric::MetricName;
pub use samples_index::SamplesIndexEntry;
pub use session::SessionContext;
pub use table::{Cell, Table};
