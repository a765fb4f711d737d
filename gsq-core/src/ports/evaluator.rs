// gsq-core/src/ports/evaluator.rs

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::config::RequestParams;
use crate::domain::dataset::Row;
use crate::domain::metric::MetricName;
use crate::domain::session::SessionContext;
use crate::error::GsqError;
use crate::ports::credential::ResolvedCredential;

/// Resolved endpoint settings shared read-only by every batch.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Endpoint domain, without scheme.
    pub api_base: String,
    pub deployment: String,
    pub model_type: String,
    pub credential: ResolvedCredential,
    pub request: RequestParams,
    pub timeout: Duration,
}

/// Explicit per-batch context, handed to the evaluator with each batch.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub batch_id: usize,
    pub session: Arc<SessionContext>,
    pub model_config: Arc<ModelConfig>,
    pub metrics: Arc<[MetricName]>,
}

/// Opaque scoring capability.
///
/// `score` returns one entry per input row, in input order, and each entry
/// holds one rating per metric of `ctx.metrics`, in that order.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn score(&self, ctx: &WorkerContext, rows: &[Row]) -> Result<Vec<Vec<i64>>, GsqError>;

    fn name(&self) -> &str;
}
