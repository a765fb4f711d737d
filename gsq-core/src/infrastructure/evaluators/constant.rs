// gsq-core/src/infrastructure/evaluators/constant.rs

use async_trait::async_trait;

use crate::domain::dataset::Row;
use crate::error::GsqError;
use crate::ports::evaluator::{Evaluator, WorkerContext};

/// Rating assigned to every row by the offline evaluator.
pub const MOCK_RATING: i64 = 1;

/// Offline evaluator used with the test connection: never touches the network.
#[derive(Debug, Clone, Copy)]
pub struct ConstantEvaluator {
    rating: i64,
}

impl ConstantEvaluator {
    pub fn new(rating: i64) -> Self {
        Self { rating }
    }
}

impl Default for ConstantEvaluator {
    fn default() -> Self {
        Self::new(MOCK_RATING)
    }
}

#[async_trait]
impl Evaluator for ConstantEvaluator {
    async fn score(&self, ctx: &WorkerContext, rows: &[Row]) -> Result<Vec<Vec<i64>>, GsqError> {
        Ok(rows
            .iter()
            .map(|_| vec![self.rating; ctx.metrics.len()])
            .collect())
    }

    fn name(&self) -> &str {
        "constant"
    }
}
