// gsq-core/src/domain/samples_index.rs

use serde::Serialize;

use crate::domain::error::DomainError;
use crate::domain::histogram::{GROUP, METRIC_NAME};
use crate::domain::metric::MetricName;
use crate::domain::table::{Cell, Table};

pub const GROUP_DIMENSION: &str = "group_dimension";
pub const SAMPLES_NAME: &str = "samples_name";
pub const ASSET: &str = "asset";
pub const VIOLATIONS_SAMPLES: &str = "Violations";

/// Points at the violations artifact written for one metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplesIndexEntry {
    pub metric_name: String,
    pub group: String,
    pub group_dimension: String,
    pub samples_name: String,
    pub asset: String,
}

impl SamplesIndexEntry {
    pub fn violations(metric: MetricName, run_id: &str) -> Self {
        Self {
            metric_name: metric.per_instance_name(),
            group: String::new(),
            group_dimension: String::new(),
            samples_name: VIOLATIONS_SAMPLES.to_string(),
            asset: asset_reference(run_id, metric),
        }
    }
}

pub fn asset_reference(run_id: &str, metric: MetricName) -> String {
    format!("azureml_{}_output_data_{}_violations:1", run_id, metric.key())
}

pub fn samples_index_table(entries: &[SamplesIndexEntry]) -> Result<Table, DomainError> {
    let mut table = Table::new([METRIC_NAME, GROUP, GROUP_DIMENSION, SAMPLES_NAME, ASSET]);
    for e in entries {
        table.push_row(vec![
            Cell::from(e.metric_name.as_str()),
            Cell::from(e.group.as_str()),
            Cell::from(e.group_dimension.as_str()),
            Cell::from(e.samples_name.as_str()),
            Cell::from(e.asset.as_str()),
        ])?;
    }
    Ok(table)
}
