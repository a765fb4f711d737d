// gsq-core/src/infrastructure/evaluators/chat_judge.rs

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::domain::config::RequestParams;
use crate::domain::dataset::Row;
use crate::domain::metric::{MAX_RATING, MIN_RATING, MetricName};
use crate::error::{AnnotationError, EndpointError, GsqError};
use crate::ports::evaluator::{Evaluator, ModelConfig, WorkerContext};
use crate::ports::http::{HttpRequest, HttpTransport};

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

fn criterion(metric: MetricName) -> &'static str {
    match metric {
        MetricName::Groundedness => "how well the answer is supported by the given context",
        MetricName::Relevance => "how well the answer addresses the question given the context",
        MetricName::Fluency => "the grammatical and linguistic quality of the answer",
        MetricName::Coherence => "how well the sentences of the answer fit together as a whole",
        MetricName::Similarity => "how close the answer is to the ground truth answer",
    }
}

fn instruction(metric: MetricName) -> String {
    format!(
        "You rate {} of an answer: {}. Reply with a single integer from {} (worst) to {} (best).",
        metric.key(),
        criterion(metric),
        MIN_RATING,
        MAX_RATING
    )
}

fn user_message(row: &Row, metric: MetricName) -> String {
    let mut parts = vec![format!("Question: {}", row.prompt.as_deref().unwrap_or_default())];
    if metric.requires_context() {
        parts.push(format!("Context: {}", row.context.as_deref().unwrap_or_default()));
    }
    parts.push(format!("Answer: {}", row.completion.as_deref().unwrap_or_default()));
    if metric.requires_ground_truth() {
        parts.push(format!(
            "Ground truth: {}",
            row.ground_truth.as_deref().unwrap_or_default()
        ));
    }
    parts.push("Rating:".to_string());
    parts.join("\n")
}

fn request_body(metric: MetricName, row: &Row, params: &RequestParams) -> Value {
    let mut body = json!({
        "messages": [
            {"role": "system", "content": instruction(metric)},
            {"role": "user", "content": user_message(row, metric)},
        ],
        "temperature": params.temperature,
        "top_p": params.top_p,
        "n": params.num_samples,
        "frequency_penalty": params.frequency_penalty,
        "presence_penalty": params.presence_penalty,
    });
    if let Some(stop) = &params.stop {
        body["stop"] = json!(stop);
    }
    if let Some(max_tokens) = params.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    body
}

/// First digit of the reply within the rating scale.
pub fn parse_rating(metric: MetricName, reply: &str) -> Result<i64, AnnotationError> {
    reply
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(i64::from)
        .find(|d| (MIN_RATING..=MAX_RATING).contains(d))
        .ok_or_else(|| AnnotationError::UnparsableRating {
            metric: metric.compact_name().to_string(),
            reply: reply.chars().take(200).collect(),
        })
}

pub fn completions_url(config: &ModelConfig) -> String {
    let mut url = format!(
        "https://{}/openai/deployments/{}/chat/completions",
        config.api_base, config.deployment
    );
    if !config.credential.api_version.is_empty() {
        url.push_str("?api-version=");
        url.push_str(&config.credential.api_version);
    }
    url
}

/// Asks the deployed chat model for one rating per row and metric.
pub struct ChatJudgeEvaluator {
    transport: Arc<dyn HttpTransport>,
}

impl ChatJudgeEvaluator {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    async fn rate(
        &self,
        ctx: &WorkerContext,
        url: &str,
        row: &Row,
        metric: MetricName,
    ) -> Result<i64, GsqError> {
        let config = &ctx.model_config;
        let (auth_name, auth_value) = config.credential.auth_header();
        let request = HttpRequest::post(url, request_body(metric, row, &config.request), config.timeout)
            .header("Content-Type", "application/json")
            .header(auth_name, auth_value)
            .with_retry();

        let response = self.transport.send(request).await.map_err(|e| {
            AnnotationError::EvaluatorFailed {
                batch: ctx.batch_id,
                reason: e.to_string(),
            }
        })?;
        if !response.is_success() {
            return Err(EndpointError::UnexpectedStatus {
                status: response.status,
                body: response.body,
            }
            .into());
        }

        let completion: ChatCompletion =
            response
                .json()
                .map_err(|e| AnnotationError::EvaluatorFailed {
                    batch: ctx.batch_id,
                    reason: format!("malformed completion: {}", e),
                })?;
        let reply = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(parse_rating(metric, &reply)?)
    }
}

#[async_trait]
impl Evaluator for ChatJudgeEvaluator {
    #[instrument(skip_all, fields(batch = ctx.batch_id, rows = rows.len()))]
    async fn score(&self, ctx: &WorkerContext, rows: &[Row]) -> Result<Vec<Vec<i64>>, GsqError> {
        let url = completions_url(&ctx.model_config);
        let mut ratings = Vec::with_capacity(rows.len());
        for row in rows {
            let mut per_metric = Vec::with_capacity(ctx.metrics.len());
            for metric in ctx.metrics.iter() {
                per_metric.push(self.rate(ctx, &url, row, *metric).await?);
            }
            ratings.push(per_metric);
        }
        debug!(rows = ratings.len(), "Batch rated");
        Ok(ratings)
    }

    fn name(&self) -> &str {
        "chat-judge"
    }
}
