// gsq-core/src/application/pipeline.rs

use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::application::annotator::{BatchAnnotator, partition};

// Domain
use crate::domain::annotation::{AnnotatedRow, annotations_to_table};
use crate::domain::config::AnnotationConfig;
use crate::domain::dataset::{FALLBACK_ROWS, ProductionDataset, Sampler, prepare_columns};
use crate::domain::histogram::{HistogramBucket, build_histogram, histogram_table, row_count_buckets};
use crate::domain::metric::MetricName;
use crate::domain::samples_index::{SamplesIndexEntry, samples_index_table};
use crate::domain::session::SessionContext;
use crate::domain::table::Table;
use crate::domain::violation::extract_violations;

// Infrastructure
use crate::infrastructure::adapters::{DuckDbStore, ReqwestTransport, RetryPolicy};
use crate::infrastructure::auth::{OnBehalfOfCredential, WorkspaceConnectionProvider};
use crate::infrastructure::endpoint::{EndpointResolver, normalize_domain};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::evaluators::{ChatJudgeEvaluator, ConstantEvaluator};
use crate::infrastructure::fs::atomic_write_json;

// Ports
use crate::error::GsqError;
use crate::ports::credential::{ConnectionRef, CredentialProvider, ResolvedCredential, TEST_CONNECTION};
use crate::ports::dataset::{DatasetSource, TableSink};
use crate::ports::evaluator::{Evaluator, ModelConfig};
use crate::ports::http::HttpTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Init,
    Validate,
    Sample,
    ResolveCredentials,
    AnnotateAll,
    PerMetric,
    AssembleOutputs,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Init => "init",
            Stage::Validate => "validate",
            Stage::Sample => "sample",
            Stage::ResolveCredentials => "resolve-credentials",
            Stage::AnnotateAll => "annotate",
            Stage::PerMetric => "per-metric",
            Stage::AssembleOutputs => "assemble-outputs",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Test,
    Live,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricSummary {
    pub metric: String,
    pub threshold: i64,
    pub violations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations_asset: Option<String>,
}

/// Written as `run_summary.json` next to the artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub run_id: String,
    pub mode: RunMode,
    pub evaluator: String,
    pub model_type: String,
    pub rows_loaded: usize,
    pub rows_sampled: usize,
    pub sampling_fell_back: bool,
    pub rows_annotated: usize,
    pub metrics: Vec<MetricSummary>,
    pub histogram: Vec<HistogramBucket>,
    pub artifacts: Vec<PathBuf>,
    pub duration_ms: u128,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// Credentials could not be resolved; nothing was written.
    Aborted { stage: Stage, reason: String },
}

struct MetricOutput {
    metric: MetricName,
    threshold: i64,
    violations: Table,
}

/// Wires the ports together for one annotation run.
pub struct AnnotationPipeline {
    source: Arc<dyn DatasetSource>,
    sink: Arc<dyn TableSink>,
    credentials: Arc<dyn CredentialProvider>,
    resolver: Arc<EndpointResolver>,
    offline: Arc<dyn Evaluator>,
    live: Arc<dyn Evaluator>,
    session: Arc<SessionContext>,
}

impl AnnotationPipeline {
    pub fn new(
        source: Arc<dyn DatasetSource>,
        sink: Arc<dyn TableSink>,
        credentials: Arc<dyn CredentialProvider>,
        resolver: Arc<EndpointResolver>,
        live: Arc<dyn Evaluator>,
        session: Arc<SessionContext>,
    ) -> Self {
        Self {
            source,
            sink,
            credentials,
            resolver,
            offline: Arc::new(ConstantEvaluator::default()),
            live,
            session,
        }
    }

    pub fn with_offline_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.offline = evaluator;
        self
    }

    /// Production wiring: DuckDB for tables, reqwest for every HTTP call,
    /// Azure ML on-behalf-of identity for credentials.
    pub fn from_config(
        config: &AnnotationConfig,
        session: SessionContext,
    ) -> Result<Self, GsqError> {
        let store = Arc::new(DuckDbStore::in_memory()?);
        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new(RetryPolicy::from_params(&config.endpoint))?);
        let session = Arc::new(session);

        let obo = Arc::new(OnBehalfOfCredential::from_session(&session, Arc::clone(&transport)));
        let credentials = Arc::new(WorkspaceConnectionProvider::new(
            Arc::clone(&session),
            obo,
            Arc::clone(&transport),
        ));
        let resolver = Arc::new(EndpointResolver::new(
            Arc::clone(&transport),
            Duration::from_secs(config.endpoint.request_timeout_secs),
        ));
        let live = Arc::new(ChatJudgeEvaluator::new(transport));

        Ok(Self::new(
            store.clone(),
            store,
            credentials,
            resolver,
            live,
            session,
        ))
    }

    fn enter(&self, stage: Stage) {
        debug!(%stage, "Entering stage");
    }

    async fn resolve_credential(
        &self,
        config: &AnnotationConfig,
    ) -> Result<ResolvedCredential, GsqError> {
        let connection = ConnectionRef::parse(&config.workspace_connection_arm_id)?;
        self.credentials.resolve(&connection).await
    }

    pub async fn run(&self, config: &AnnotationConfig) -> Result<RunOutcome, GsqError> {
        println!("🚀 Starting annotation pipeline...");
        let start_time = Instant::now();
        self.enter(Stage::Init);

        // 1. VALIDATE (no I/O before this passes)
        self.enter(Stage::Validate);
        let metrics = match config.check() {
            Ok(metrics) => metrics,
            Err(e) => {
                error!(stage = %Stage::Failed, error = %e, "Validation failed");
                return Err(e.into());
            }
        };
        let location = config.production_dataset.as_deref().ok_or_else(|| {
            InfrastructureError::ConfigError("production_dataset is required".into())
        })?;
        println!(
            "📐 Metrics: {}",
            metrics.iter().map(|m| m.compact_name()).collect::<Vec<_>>().join(", ")
        );

        // 2. LOAD + SAMPLE
        self.enter(Stage::Sample);
        println!("📦 Loading production dataset from {}", location);
        let mut table = self.source.load(location).await?;
        let rows_loaded = table.len();
        prepare_columns(&mut table, &config.columns, &metrics)?;

        let sample = Sampler::new(config.sample_rate, config.seed).sample(&table);
        if sample.fell_back {
            println!(
                "   ⚠️  Sampling at rate {} kept no rows. Using the first {} rows instead.",
                config.sample_rate, FALLBACK_ROWS
            );
        }
        let dataset = ProductionDataset::from_table(sample.table);
        println!("🎲 Sampled {} of {} rows", dataset.len(), rows_loaded);

        // 3. RESOLVE CREDENTIALS (soft abort)
        self.enter(Stage::ResolveCredentials);
        let credential = match self.resolve_credential(config).await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "Unable to resolve credentials, aborting without outputs");
                eprintln!("❌ Unable to process request: {}", e);
                return Ok(RunOutcome::Aborted {
                    stage: Stage::ResolveCredentials,
                    reason: e.to_string(),
                });
            }
        };

        // endpoint errors past this point are fatal
        let (mode, api_base) = if credential.is_test() {
            (RunMode::Test, TEST_CONNECTION.to_string())
        } else {
            (RunMode::Live, normalize_domain(&credential.endpoint_domain)?)
        };
        let model_type = self
            .resolver
            .discover_model_type(&credential, &config.model_deployment_name)
            .await?;
        println!("🔐 Endpoint ready ({:?} mode, model {})", mode, model_type);

        // 4. ANNOTATE
        self.enter(Stage::AnnotateAll);
        let evaluator = match mode {
            RunMode::Test => Arc::clone(&self.offline),
            RunMode::Live => Arc::clone(&self.live),
        };
        let model_config = Arc::new(ModelConfig {
            api_base,
            deployment: config.model_deployment_name.trim().to_string(),
            model_type: model_type.clone(),
            credential,
            request: config.request.clone(),
            timeout: Duration::from_secs(config.endpoint.request_timeout_secs),
        });
        let annotator = BatchAnnotator::new(
            Arc::clone(&evaluator),
            Arc::clone(&self.session),
            model_config,
            &metrics,
            config.execution.max_concurrency,
        );
        let batches = partition(dataset.rows(), config.execution.batch_size);
        println!(
            "🧠 Annotating {} rows in {} batches with the {} evaluator",
            dataset.len(),
            batches.len(),
            evaluator.name()
        );
        let annotated = annotator.annotate_all(batches).await?;
        let annotations = annotations_to_table(
            &annotated,
            dataset.has_context(),
            dataset.has_ground_truth(),
            &metrics,
        )?;
        debug!(columns = ?annotations.columns, rows = annotations.len(), "Annotated table built");

        // 5. PER METRIC
        self.enter(Stage::PerMetric);
        let (histogram, outputs) = self.per_metric(config, &metrics, &annotated, &dataset)?;

        // 6. ASSEMBLE OUTPUTS
        self.enter(Stage::AssembleOutputs);
        let run_id = self
            .session
            .run_id()
            .map(str::to_string)
            .unwrap_or_else(|| format!("local-{}", Utc::now().format("%Y%m%d%H%M%S")));
        let mut artifacts = Vec::new();

        let annotations_path = config.output.annotations_path();
        self.sink.write_table(&annotations, &annotations_path).await?;
        artifacts.push(annotations_path);

        let mut all_buckets = histogram;
        println!("➕ Adding production_data and reference_data row counts");
        all_buckets.extend(row_count_buckets(dataset.len()));
        let histogram_path = config.output.histogram_path();
        self.sink
            .write_table(&histogram_table(&all_buckets)?, &histogram_path)
            .await?;
        artifacts.push(histogram_path);

        let mut samples_index = Vec::new();
        let mut metric_summaries = Vec::new();
        for out in &outputs {
            let mut summary = MetricSummary {
                metric: out.metric.per_instance_name(),
                threshold: out.threshold,
                violations: out.violations.len(),
                violations_asset: None,
            };
            if !out.violations.is_empty() {
                let path = config.output.violations_path(out.metric);
                self.sink.write_table(&out.violations, &path).await?;
                artifacts.push(path);

                let entry = SamplesIndexEntry::violations(out.metric, &run_id);
                summary.violations_asset = Some(entry.asset.clone());
                samples_index.push(entry);
            }
            metric_summaries.push(summary);
        }

        let index_path = config.output.samples_index_path();
        self.sink
            .write_table(&samples_index_table(&samples_index)?, &index_path)
            .await?;
        artifacts.push(index_path);

        let summary_path = config.output.summary_path();
        artifacts.push(summary_path.clone());
        let summary = RunSummary {
            generated_at: Utc::now().to_rfc3339(),
            run_id,
            mode,
            evaluator: evaluator.name().to_string(),
            model_type,
            rows_loaded,
            rows_sampled: dataset.len(),
            sampling_fell_back: sample.fell_back,
            rows_annotated: annotated.len(),
            metrics: metric_summaries,
            histogram: all_buckets,
            artifacts,
            duration_ms: start_time.elapsed().as_millis(),
        };
        atomic_write_json(&summary_path, &summary)?;

        self.enter(Stage::Done);
        info!(run_id = %summary.run_id, rows = summary.rows_annotated, "Annotation run finished");
        println!(
            "✅ Finished in {:.2}s. Outputs in {}",
            start_time.elapsed().as_secs_f64(),
            config.output.directory.display()
        );
        Ok(RunOutcome::Completed(summary))
    }

    fn per_metric(
        &self,
        config: &AnnotationConfig,
        metrics: &[MetricName],
        annotated: &[AnnotatedRow],
        dataset: &ProductionDataset,
    ) -> Result<(Vec<HistogramBucket>, Vec<MetricOutput>), GsqError> {
        let mut histogram = Vec::new();
        let mut outputs = Vec::with_capacity(metrics.len());

        for &metric in metrics {
            println!("📊 Begin {} processing", metric);
            let threshold = config.thresholds.for_metric(metric);
            let buckets = build_histogram(annotated, metric, threshold)?;
            let violations = extract_violations(annotated, dataset, metric, threshold)?;
            println!(
                "    {} violation(s) below threshold {}",
                violations.len(),
                threshold
            );
            histogram.extend(buckets);
            outputs.push(MetricOutput {
                metric,
                threshold,
                violations,
            });
        }

        Ok((histogram, outputs))
    }
}
