// gsq-core/src/domain/metric.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::DomainError;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// Canonical column names the dataset is renamed to before annotation.
pub const PROMPT: &str = "prompt";
pub const COMPLETION: &str = "completion";
pub const CONTEXT: &str = "context";
pub const GROUND_TRUTH: &str = "ground_truth";
pub const INDEX: &str = "index";

/// Closed set of LLM-judged quality dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricName {
    Groundedness,
    Relevance,
    Fluency,
    Coherence,
    Similarity,
}

impl MetricName {
    pub const ALL: [MetricName; 5] = [
        MetricName::Groundedness,
        MetricName::Relevance,
        MetricName::Fluency,
        MetricName::Coherence,
        MetricName::Similarity,
    ];

    /// Column name used in annotated tables and violation outputs.
    pub fn compact_name(&self) -> &'static str {
        match self {
            Self::Groundedness => "Groundedness",
            Self::Relevance => "Relevance",
            Self::Fluency => "Fluency",
            Self::Coherence => "Coherence",
            Self::Similarity => "Similarity",
        }
    }

    /// Column name the evaluator reports the rating under.
    pub fn evaluator_column(&self) -> &'static str {
        match self {
            Self::Groundedness => "gpt_groundedness",
            Self::Relevance => "gpt_relevance",
            Self::Fluency => "gpt_fluency",
            Self::Coherence => "gpt_coherence",
            Self::Similarity => "gpt_similarity",
        }
    }

    pub fn per_instance_name(&self) -> String {
        format!("Acceptable{}ScorePerInstance", self.compact_name())
    }

    pub fn pass_rate_name(&self) -> String {
        format!("Aggregated{}PassRate", self.compact_name())
    }

    /// Lowercase key used for threshold lookup and artifact naming.
    pub fn key(&self) -> String {
        self.compact_name().to_lowercase()
    }

    pub fn requires_context(&self) -> bool {
        matches!(self, Self::Groundedness | Self::Relevance)
    }

    pub fn requires_ground_truth(&self) -> bool {
        matches!(self, Self::Similarity)
    }

    /// Canonical columns the dataset must carry to rate this metric.
    pub fn required_columns(&self) -> Vec<&'static str> {
        let mut cols = vec![PROMPT, COMPLETION];
        if self.requires_context() {
            cols.push(CONTEXT);
        }
        if self.requires_ground_truth() {
            cols.push(GROUND_TRUTH);
        }
        cols
    }

    /// Accepts the compact name ("Fluency") or either published name
    /// ("AcceptableFluencyScorePerInstance", "AggregatedFluencyPassRate").
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|m| {
                trimmed == m.compact_name()
                    || trimmed == m.per_instance_name()
                    || trimmed == m.pass_rate_name()
            })
            .ok_or_else(|| DomainError::InvalidMetric {
                name: trimmed.to_string(),
                allowed: Self::allowed_names().join(", "),
            })
    }

    /// Parses a comma-separated list. Duplicates collapse, first occurrence wins.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, DomainError> {
        let mut metrics = Vec::new();
        for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
            let metric = Self::parse(part)?;
            if !metrics.contains(&metric) {
                metrics.push(metric);
            }
        }
        if metrics.is_empty() {
            return Err(DomainError::NoMetrics);
        }
        Ok(metrics)
    }

    fn allowed_names() -> Vec<String> {
        Self::ALL
            .iter()
            .flat_map(|m| {
                [
                    m.compact_name().to_string(),
                    m.per_instance_name(),
                    m.pass_rate_name(),
                ]
            })
            .collect()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.compact_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_parse_accepts_published_names() -> Result<()> {
        assert_eq!(MetricName::parse("Fluency")?, MetricName::Fluency);
        assert_eq!(
            MetricName::parse(" AcceptableGroundednessScorePerInstance ")?,
            MetricName::Groundedness
        );
        assert_eq!(
            MetricName::parse("AggregatedSimilarityPassRate")?,
            MetricName::Similarity
        );
        Ok(())
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let res = MetricName::parse("Toxicity");
        assert!(matches!(res, Err(DomainError::InvalidMetric { name, .. }) if name == "Toxicity"));
    }

    #[test]
    fn test_parse_list_dedupes_in_request_order() -> Result<()> {
        let metrics = MetricName::parse_list(
            "AcceptableCoherenceScorePerInstance,Fluency,AggregatedCoherencePassRate",
        )?;
        assert_eq!(metrics, vec![MetricName::Coherence, MetricName::Fluency]);
        Ok(())
    }

    #[test]
    fn test_parse_list_empty() {
        assert!(matches!(
            MetricName::parse_list(" , "),
            Err(DomainError::NoMetrics)
        ));
    }

    #[test]
    fn test_required_columns() {
        assert_eq!(MetricName::Fluency.required_columns(), vec![PROMPT, COMPLETION]);
        assert_eq!(
            MetricName::Relevance.required_columns(),
            vec![PROMPT, COMPLETION, CONTEXT]
        );
        assert_eq!(
            MetricName::Similarity.required_columns(),
            vec![PROMPT, COMPLETION, GROUND_TRUTH]
        );
    }

    #[test]
    fn test_names() {
        assert_eq!(MetricName::Coherence.evaluator_column(), "gpt_coherence");
        assert_eq!(
            MetricName::Coherence.per_instance_name(),
            "AcceptableCoherenceScorePerInstance"
        );
        assert_eq!(MetricName::Coherence.key(), "coherence");
    }
}
