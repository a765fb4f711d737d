// gsq-core/src/domain/config.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use validator::{Validate, ValidationError};

use crate::domain::error::DomainError;
use crate::domain::metric::{COMPLETION, CONTEXT, GROUND_TRUTH, MetricName, PROMPT};

/// Reserved conversational column, rejected as a mapping target.
pub const CHAT_HISTORY: &str = "chat_history";

/// Full parameter set of one annotation run.
#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct AnnotationConfig {
    /// Dataset reference handed to the DatasetSource (path for the DuckDB adapter).
    #[serde(default)]
    pub production_dataset: Option<String>,

    /// Comma-separated metric names.
    pub metric_names: String,

    #[serde(default)]
    pub model_deployment_name: String,

    /// ARM id of the workspace connection, or `test_connection`.
    pub workspace_connection_arm_id: String,

    #[serde(default = "default_sample_rate")]
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub sample_rate: f64,

    /// Fixes the sampling RNG. Unset means a fresh sample every run.
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    #[validate(nested)]
    pub request: RequestParams,

    #[serde(default)]
    #[validate(nested)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub columns: ColumnMapping,

    #[serde(default)]
    #[validate(nested)]
    pub endpoint: EndpointParams,

    #[serde(default)]
    #[validate(nested)]
    pub execution: ExecutionParams,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Model request parameters forwarded to the evaluator.
#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct RequestParams {
    #[serde(default)]
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f64,

    #[serde(default = "default_top_p")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub top_p: f64,

    #[serde(default = "default_num_samples")]
    #[validate(range(min = 1))]
    pub num_samples: u32,

    #[serde(default)]
    #[validate(custom(function = "validate_penalty"))]
    pub frequency_penalty: f64,

    #[serde(default)]
    #[validate(custom(function = "validate_penalty"))]
    pub presence_penalty: f64,

    #[serde(default)]
    pub stop: Option<String>,

    #[serde(default)]
    #[validate(range(min = 1))]
    pub max_tokens: Option<u32>,
}

impl Default for RequestParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: default_top_p(),
            num_samples: default_num_samples(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop: None,
            max_tokens: None,
        }
    }
}

/// Per-metric pass/fail boundaries. A rating strictly below its threshold violates.
#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct Thresholds {
    #[serde(default = "default_threshold")]
    #[validate(range(min = 1, max = 5))]
    pub groundedness: i64,
    #[serde(default = "default_threshold")]
    #[validate(range(min = 1, max = 5))]
    pub relevance: i64,
    #[serde(default = "default_threshold")]
    #[validate(range(min = 1, max = 5))]
    pub fluency: i64,
    #[serde(default = "default_threshold")]
    #[validate(range(min = 1, max = 5))]
    pub coherence: i64,
    #[serde(default = "default_threshold")]
    #[validate(range(min = 1, max = 5))]
    pub similarity: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            groundedness: default_threshold(),
            relevance: default_threshold(),
            fluency: default_threshold(),
            coherence: default_threshold(),
            similarity: default_threshold(),
        }
    }
}

impl Thresholds {
    pub fn for_metric(&self, metric: MetricName) -> i64 {
        match metric {
            MetricName::Groundedness => self.groundedness,
            MetricName::Relevance => self.relevance,
            MetricName::Fluency => self.fluency,
            MetricName::Coherence => self.coherence,
            MetricName::Similarity => self.similarity,
        }
    }
}

/// Maps the dataset's own column names onto the canonical ones.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ColumnMapping {
    #[serde(default = "default_prompt_column")]
    pub prompt: String,
    #[serde(default = "default_completion_column")]
    pub completion: String,
    #[serde(default = "default_context_column")]
    pub context: String,
    #[serde(default = "default_ground_truth_column")]
    pub ground_truth: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            prompt: default_prompt_column(),
            completion: default_completion_column(),
            context: default_context_column(),
            ground_truth: default_ground_truth_column(),
        }
    }
}

impl ColumnMapping {
    /// (source column, canonical column) pairs.
    pub fn pairs(&self) -> [(&str, &'static str); 4] {
        [
            (self.prompt.as_str(), PROMPT),
            (self.completion.as_str(), COMPLETION),
            (self.context.as_str(), CONTEXT),
            (self.ground_truth.as_str(), GROUND_TRUTH),
        ]
    }

    /// Source column configured for a canonical one.
    pub fn source_for<'a>(&'a self, canonical: &'a str) -> &'a str {
        self.pairs()
            .into_iter()
            .find(|(_, c)| *c == canonical)
            .map(|(source, _)| source)
            .unwrap_or(canonical)
    }

    pub fn check(&self) -> Result<(), DomainError> {
        if let Some((source, _)) = self.pairs().into_iter().find(|(s, _)| *s == CHAT_HISTORY) {
            return Err(DomainError::UnsupportedColumn(source.to_string()));
        }

        let mut seen = HashSet::new();
        if self.pairs().iter().any(|(source, _)| !seen.insert(*source)) {
            return Err(DomainError::DuplicateColumns(format!(
                "prompt_column_name: {}, completion_column_name: {}, context_column_name: {}, ground_truth_column_name: {}",
                self.prompt, self.completion, self.context, self.ground_truth
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct EndpointParams {
    /// Accepted for compatibility, not enforced by the pipeline.
    #[serde(default = "default_error_rate_threshold")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub request_error_rate_threshold: f64,

    #[serde(default = "default_backoff_factor")]
    pub api_call_retry_backoff_factor: u32,

    #[serde(default = "default_retry_max_count")]
    pub api_call_retry_max_count: u32,

    #[serde(default = "default_request_timeout")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

impl Default for EndpointParams {
    fn default() -> Self {
        Self {
            request_error_rate_threshold: default_error_rate_threshold(),
            api_call_retry_backoff_factor: default_backoff_factor(),
            api_call_retry_max_count: default_retry_max_count(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct ExecutionParams {
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1))]
    pub batch_size: usize,

    #[serde(default = "default_max_concurrency")]
    #[validate(range(min = 1))]
    pub max_concurrency: usize,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Parquet => "parquet",
            Self::Csv => "csv",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            format: OutputFormat::default(),
        }
    }
}

impl OutputConfig {
    pub fn histogram_path(&self) -> PathBuf {
        self.directory
            .join(format!("histogram.{}", self.format.extension()))
    }

    /// Every sampled row with its ratings, one column per metric.
    pub fn annotations_path(&self) -> PathBuf {
        self.directory
            .join(format!("annotations.{}", self.format.extension()))
    }

    pub fn samples_index_path(&self) -> PathBuf {
        self.directory
            .join(format!("samples_index.{}", self.format.extension()))
    }

    pub fn violations_path(&self, metric: MetricName) -> PathBuf {
        self.directory
            .join(format!("{}_violations.{}", metric.key(), self.format.extension()))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.directory.join("run_summary.json")
    }
}

impl AnnotationConfig {
    /// Minimal config for the given metrics, every other parameter defaulted.
    pub fn new(metric_names: &str, connection: &str) -> Self {
        Self {
            production_dataset: None,
            metric_names: metric_names.to_string(),
            model_deployment_name: String::new(),
            workspace_connection_arm_id: connection.to_string(),
            sample_rate: default_sample_rate(),
            seed: None,
            request: RequestParams::default(),
            thresholds: Thresholds::default(),
            columns: ColumnMapping::default(),
            endpoint: EndpointParams::default(),
            execution: ExecutionParams::default(),
            output: OutputConfig::default(),
        }
    }

    /// Every configuration check that needs neither data nor network.
    /// Returns the requested metrics in request order.
    pub fn check(&self) -> Result<Vec<MetricName>, DomainError> {
        let metrics = MetricName::parse_list(&self.metric_names)?;

        self.validate()
            .map_err(|e| DomainError::ParameterOutOfRange(e.to_string()))?;

        self.columns.check()?;

        Ok(metrics)
    }
}

fn validate_penalty(value: &f64) -> Result<(), ValidationError> {
    if (-2.0..=2.0).contains(value) {
        Ok(())
    } else {
        Err(ValidationError::new("penalty_range")
            .with_message("must be between -2.0 and 2.0, inclusive".into()))
    }
}

fn default_sample_rate() -> f64 {
    1.0
}
fn default_top_p() -> f64 {
    1.0
}
fn default_num_samples() -> u32 {
    1
}
fn default_threshold() -> i64 {
    4
}
fn default_prompt_column() -> String {
    PROMPT.to_string()
}
fn default_completion_column() -> String {
    COMPLETION.to_string()
}
fn default_context_column() -> String {
    CONTEXT.to_string()
}
fn default_ground_truth_column() -> String {
    GROUND_TRUTH.to_string()
}
fn default_error_rate_threshold() -> f64 {
    0.5
}
fn default_backoff_factor() -> u32 {
    4
}
fn default_retry_max_count() -> u32 {
    10
}
fn default_request_timeout() -> u64 {
    300
}
fn default_batch_size() -> usize {
    64
}
fn default_max_concurrency() -> usize {
    8
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("target/gsq")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_defaults_from_minimal_yaml() -> Result<()> {
        let yaml = "metric_names: Fluency,Coherence\nworkspace_connection_arm_id: test_connection\n";
        let config: AnnotationConfig = serde_yaml::from_str(yaml)?;
        assert_eq!(config.sample_rate, 1.0);
        assert_eq!(config.thresholds.for_metric(MetricName::Fluency), 4);
        assert_eq!(config.request.top_p, 1.0);
        assert_eq!(config.endpoint.api_call_retry_max_count, 10);
        assert_eq!(config.endpoint.request_timeout_secs, 300);
        assert_eq!(config.columns.prompt, "prompt");
        assert_eq!(config.output.format, OutputFormat::Parquet);

        let metrics = config.check()?;
        assert_eq!(metrics, vec![MetricName::Fluency, MetricName::Coherence]);
        Ok(())
    }

    #[test]
    fn test_out_of_range_parameters() {
        let mut config = AnnotationConfig::new("Fluency", "test_connection");
        config.request.temperature = 2.5;
        assert!(matches!(
            config.check(),
            Err(DomainError::ParameterOutOfRange(_))
        ));

        let mut config = AnnotationConfig::new("Fluency", "test_connection");
        config.request.top_p = -0.1;
        assert!(matches!(
            config.check(),
            Err(DomainError::ParameterOutOfRange(_))
        ));

        let mut config = AnnotationConfig::new("Fluency", "test_connection");
        config.request.presence_penalty = -2.5;
        assert!(config.check().is_err());

        let mut config = AnnotationConfig::new("Fluency", "test_connection");
        config.request.num_samples = 0;
        assert!(config.check().is_err());

        let mut config = AnnotationConfig::new("Fluency", "test_connection");
        config.thresholds.coherence = 7;
        assert!(config.check().is_err());
    }

    #[test]
    fn test_sample_rate_bounds() {
        let mut config = AnnotationConfig::new("Fluency", "test_connection");
        config.sample_rate = 0.0;
        assert!(config.check().is_err());

        config.sample_rate = 1.0;
        assert!(config.check().is_ok());

        config.sample_rate = 1.01;
        assert!(config.check().is_err());
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let mut config = AnnotationConfig::new("Fluency", "test_connection");
        config.columns.completion = config.columns.prompt.clone();
        assert!(matches!(
            config.check(),
            Err(DomainError::DuplicateColumns(_))
        ));
    }

    #[test]
    fn test_chat_history_rejected() {
        let mut config = AnnotationConfig::new("Fluency", "test_connection");
        config.columns.context = CHAT_HISTORY.to_string();
        assert!(matches!(
            config.check(),
            Err(DomainError::UnsupportedColumn(c)) if c == CHAT_HISTORY
        ));
    }

    #[test]
    fn test_invalid_metric_before_ranges() {
        let mut config = AnnotationConfig::new("Fluency,Humor", "test_connection");
        config.request.temperature = 9.0;
        assert!(matches!(
            config.check(),
            Err(DomainError::InvalidMetric { .. })
        ));
    }

    #[test]
    fn test_output_paths() {
        let output = OutputConfig {
            directory: PathBuf::from("/tmp/out"),
            format: OutputFormat::Csv,
        };
        assert_eq!(output.histogram_path(), PathBuf::from("/tmp/out/histogram.csv"));
        assert_eq!(
            output.violations_path(MetricName::Groundedness),
            PathBuf::from("/tmp/out/groundedness_violations.csv")
        );
    }
}
