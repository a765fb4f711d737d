// gsq-core/src/domain/histogram.rs

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::annotation::{AnnotatedRow, check_rating};
use crate::domain::error::DomainError;
use crate::domain::metric::{MAX_RATING, MIN_RATING, MetricName};
use crate::domain::table::{Cell, Table};

pub const METRIC_NAME: &str = "metric_name";
pub const GROUP: &str = "group";
pub const METRIC_VALUE: &str = "metric_value";
pub const THRESHOLD: &str = "threshold_value";

pub const ROW_COUNT_METRIC: &str = "RowCount";
pub const PRODUCTION_ROW_COUNT: &str = "production_data";
pub const REFERENCE_ROW_COUNT: &str = "reference_data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramBucket {
    pub metric_name: String,
    /// Rating rendered as text ("1".."5"), or the row-count label.
    pub group: String,
    pub metric_value: u64,
    pub threshold: String,
}

/// Counts ratings for `metric` and fills every rating of the 1..=5 scale
/// that was not observed with a zero bucket. Always five buckets, ascending.
pub fn build_histogram(
    annotated: &[AnnotatedRow],
    metric: MetricName,
    threshold: i64,
) -> Result<Vec<HistogramBucket>, DomainError> {
    let mut counts: BTreeMap<i64, u64> = BTreeMap::new();
    for row in annotated {
        let rating = row.rating(metric).ok_or_else(|| DomainError::MissingRating {
            metric: metric.compact_name().to_string(),
            index: row.index,
        })?;
        check_rating(metric, row.index, rating)?;
        *counts.entry(rating).or_insert(0) += 1;
    }

    // gap filling against the fixed domain, never inferred from data
    for rating in MIN_RATING..=MAX_RATING {
        counts.entry(rating).or_insert(0);
    }

    let metric_name = metric.per_instance_name();
    let threshold = threshold.to_string();

    Ok(counts
        .into_iter()
        .map(|(rating, count)| HistogramBucket {
            metric_name: metric_name.clone(),
            group: rating.to_string(),
            metric_value: count,
            threshold: threshold.clone(),
        })
        .collect())
}

/// Global row-count rows, appended once per run.
pub fn row_count_buckets(row_count: usize) -> Vec<HistogramBucket> {
    [PRODUCTION_ROW_COUNT, REFERENCE_ROW_COUNT]
        .into_iter()
        .map(|group| HistogramBucket {
            metric_name: ROW_COUNT_METRIC.to_string(),
            group: group.to_string(),
            metric_value: row_count as u64,
            threshold: String::new(),
        })
        .collect()
}

pub fn histogram_table(buckets: &[HistogramBucket]) -> Result<Table, DomainError> {
    let mut table = Table::new([METRIC_NAME, GROUP, METRIC_VALUE, THRESHOLD]);
    for b in buckets {
        let value = i64::try_from(b.metric_value)
            .map_err(|_| DomainError::TableError(format!("count {} overflows", b.metric_value)))?;
        table.push_row(vec![
            Cell::from(b.metric_name.as_str()),
            Cell::from(b.group.as_str()),
            Cell::Int(value),
            Cell::from(b.threshold.as_str()),
        ])?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::Row;
    use anyhow::Result;

    fn annotated(ratings: &[i64], metric: MetricName) -> Result<Vec<AnnotatedRow>> {
        ratings
            .iter()
            .enumerate()
            .map(|(i, &r)| {
                let row = Row {
                    id: i as i64,
                    prompt: Some("q".into()),
                    completion: Some("a".into()),
                    context: None,
                    ground_truth: None,
                };
                AnnotatedRow::from_row(&row, &[metric], &[r]).map_err(Into::into)
            })
            .collect()
    }

    fn as_pairs(buckets: &[HistogramBucket]) -> Vec<(&str, u64)> {
        buckets
            .iter()
            .map(|b| (b.group.as_str(), b.metric_value))
            .collect()
    }

    #[test]
    fn test_gap_filling_all_same_rating() -> Result<()> {
        let rows = annotated(&[1, 1, 1, 1, 1], MetricName::Fluency)?;
        let buckets = build_histogram(&rows, MetricName::Fluency, 4)?;
        assert_eq!(
            as_pairs(&buckets),
            vec![("1", 5), ("2", 0), ("3", 0), ("4", 0), ("5", 0)]
        );
        assert!(buckets.iter().all(|b| b.threshold == "4"));
        assert!(
            buckets
                .iter()
                .all(|b| b.metric_name == "AcceptableFluencyScorePerInstance")
        );
        Ok(())
    }

    #[test]
    fn test_counts_sum_to_rows() -> Result<()> {
        let rows = annotated(&[5, 3, 3, 2, 5, 5, 4], MetricName::Coherence)?;
        let buckets = build_histogram(&rows, MetricName::Coherence, 3)?;
        assert_eq!(buckets.len(), 5);
        assert_eq!(buckets.iter().map(|b| b.metric_value).sum::<u64>(), 7);
        assert_eq!(
            as_pairs(&buckets),
            vec![("1", 0), ("2", 1), ("3", 2), ("4", 1), ("5", 3)]
        );
        Ok(())
    }

    #[test]
    fn test_empty_input_still_five_buckets() -> Result<()> {
        let buckets = build_histogram(&[], MetricName::Relevance, 4)?;
        assert_eq!(buckets.len(), 5);
        assert!(buckets.iter().all(|b| b.metric_value == 0));
        Ok(())
    }

    #[test]
    fn test_missing_metric_rating() -> Result<()> {
        let rows = annotated(&[2], MetricName::Fluency)?;
        let res = build_histogram(&rows, MetricName::Similarity, 4);
        assert!(matches!(res, Err(DomainError::MissingRating { .. })));
        Ok(())
    }

    #[test]
    fn test_out_of_scale_rating_fails_closed() {
        let rows = vec![AnnotatedRow {
            index: 0,
            prompt: None,
            context: None,
            completion: None,
            ground_truth: None,
            ratings: vec![(MetricName::Fluency, 9)],
        }];
        let res = build_histogram(&rows, MetricName::Fluency, 4);
        assert!(matches!(res, Err(DomainError::RatingOutOfRange { rating: 9, .. })));
    }

    #[test]
    fn test_row_count_table() -> Result<()> {
        let buckets = row_count_buckets(42);
        let table = histogram_table(&buckets)?;
        assert_eq!(
            table.columns,
            vec!["metric_name", "group", "metric_value", "threshold_value"]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "group"), Some(&Cell::Text("production_data".into())));
        assert_eq!(table.cell(1, "group"), Some(&Cell::Text("reference_data".into())));
        assert_eq!(table.cell(1, "metric_value"), Some(&Cell::Int(42)));
        assert_eq!(table.cell(0, "threshold_value"), Some(&Cell::Text(String::new())));
        Ok(())
    }
}
