// gsq-core/src/application/annotator.rs

use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::annotation::AnnotatedRow;
use crate::domain::dataset::Row;
use crate::domain::metric::MetricName;
use crate::domain::session::SessionContext;
use crate::error::{AnnotationError, GsqError};
use crate::ports::evaluator::{Evaluator, ModelConfig, WorkerContext};

/// Splits rows into disjoint, order-preserving batches of at most `batch_size`.
pub fn partition(rows: &[Row], batch_size: usize) -> Vec<Vec<Row>> {
    rows.chunks(batch_size.max(1)).map(<[Row]>::to_vec).collect()
}

/// Sends batches to the evaluator concurrently and pairs the ratings back
/// with their rows.
pub struct BatchAnnotator {
    evaluator: Arc<dyn Evaluator>,
    session: Arc<SessionContext>,
    model_config: Arc<ModelConfig>,
    metrics: Arc<[MetricName]>,
    max_concurrency: usize,
}

impl BatchAnnotator {
    pub fn new(
        evaluator: Arc<dyn Evaluator>,
        session: Arc<SessionContext>,
        model_config: Arc<ModelConfig>,
        metrics: &[MetricName],
        max_concurrency: usize,
    ) -> Self {
        Self {
            evaluator,
            session,
            model_config,
            metrics: metrics.into(),
            max_concurrency: max_concurrency.max(1),
        }
    }

    fn context(&self, batch_id: usize) -> WorkerContext {
        WorkerContext {
            batch_id,
            session: Arc::clone(&self.session),
            model_config: Arc::clone(&self.model_config),
            metrics: Arc::clone(&self.metrics),
        }
    }

    #[instrument(skip(self, rows), fields(rows = rows.len(), evaluator = self.evaluator.name()))]
    pub async fn annotate_batch(
        &self,
        batch_id: usize,
        rows: &[Row],
    ) -> Result<Vec<AnnotatedRow>, GsqError> {
        let ctx = self.context(batch_id);
        let ratings = self.evaluator.score(&ctx, rows).await?;

        if ratings.len() != rows.len() {
            return Err(AnnotationError::RowCountMismatch {
                expected: rows.len(),
                got: ratings.len(),
            }
            .into());
        }

        let mut annotated = Vec::with_capacity(rows.len());
        for (row, row_ratings) in rows.iter().zip(&ratings) {
            if row_ratings.len() != self.metrics.len() {
                return Err(AnnotationError::RatingCountMismatch {
                    index: row.id,
                    expected: self.metrics.len(),
                    got: row_ratings.len(),
                }
                .into());
            }
            annotated.push(AnnotatedRow::from_row(row, &self.metrics, row_ratings)?);
        }

        debug!(batch_id, "Batch annotated");
        Ok(annotated)
    }

    /// Fail-fast: the first failing batch aborts the others. Output is
    /// ordered by row index whatever the completion order.
    pub async fn annotate_all(&self, batches: Vec<Vec<Row>>) -> Result<Vec<AnnotatedRow>, GsqError> {
        let per_batch: Vec<Vec<AnnotatedRow>> = futures::stream::iter(batches.iter().enumerate())
            .map(|(batch_id, rows)| self.annotate_batch(batch_id, rows))
            .buffer_unordered(self.max_concurrency)
            .try_collect()
            .await?;

        let mut annotated: Vec<AnnotatedRow> = per_batch.into_iter().flatten().collect();
        annotated.sort_by_key(|r| r.index);
        Ok(annotated)
    }
}
