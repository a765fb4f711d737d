// gsq-core/src/domain/annotation.rs

use serde::Serialize;

use crate::domain::dataset::Row;
use crate::domain::error::DomainError;
use crate::domain::metric::{
    COMPLETION, CONTEXT, GROUND_TRUTH, INDEX, MAX_RATING, MIN_RATING, MetricName, PROMPT,
};
use crate::domain::table::{Cell, Table};

/// A row and the evaluator's rating for every requested metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedRow {
    /// Id of the source row in the sampled dataset.
    pub index: i64,
    pub prompt: Option<String>,
    pub context: Option<String>,
    pub completion: Option<String>,
    pub ground_truth: Option<String>,
    /// One entry per requested metric, in request order.
    pub ratings: Vec<(MetricName, i64)>,
}

impl AnnotatedRow {
    /// Pairs `ratings` (request order) with `metrics`, enforcing the 1..=5 scale.
    pub fn from_row(row: &Row, metrics: &[MetricName], ratings: &[i64]) -> Result<Self, DomainError> {
        if ratings.len() != metrics.len() {
            return Err(DomainError::TableError(format!(
                "row {} has {} ratings for {} metrics",
                row.id,
                ratings.len(),
                metrics.len()
            )));
        }

        let mut paired = Vec::with_capacity(metrics.len());
        for (metric, &rating) in metrics.iter().zip(ratings) {
            check_rating(*metric, row.id, rating)?;
            paired.push((*metric, rating));
        }

        Ok(Self {
            index: row.id,
            prompt: row.prompt.clone(),
            context: row.context.clone(),
            completion: row.completion.clone(),
            ground_truth: row.ground_truth.clone(),
            ratings: paired,
        })
    }

    pub fn rating(&self, metric: MetricName) -> Option<i64> {
        self.ratings
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, r)| *r)
    }
}

pub fn check_rating(metric: MetricName, index: i64, rating: i64) -> Result<(), DomainError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(DomainError::RatingOutOfRange {
            metric: metric.compact_name().to_string(),
            index,
            rating,
        })
    }
}

/// Column layout of the annotated table:
/// index, prompt, [context], completion, [ground_truth], one column per metric.
pub fn annotation_columns(
    has_context: bool,
    has_ground_truth: bool,
    metrics: &[MetricName],
) -> Vec<String> {
    let mut columns = vec![INDEX.to_string(), PROMPT.to_string()];
    if has_context {
        columns.push(CONTEXT.to_string());
    }
    columns.push(COMPLETION.to_string());
    if has_ground_truth {
        columns.push(GROUND_TRUTH.to_string());
    }
    columns.extend(metrics.iter().map(|m| m.compact_name().to_string()));
    columns
}

pub fn annotations_to_table(
    annotated: &[AnnotatedRow],
    has_context: bool,
    has_ground_truth: bool,
    metrics: &[MetricName],
) -> Result<Table, DomainError> {
    let mut table = Table::new(annotation_columns(has_context, has_ground_truth, metrics));

    for row in annotated {
        let mut cells = vec![Cell::Int(row.index), Cell::from(row.prompt.clone())];
        if has_context {
            cells.push(Cell::from(row.context.clone()));
        }
        cells.push(Cell::from(row.completion.clone()));
        if has_ground_truth {
            cells.push(Cell::from(row.ground_truth.clone()));
        }
        for metric in metrics {
            let rating = row.rating(*metric).ok_or_else(|| DomainError::MissingRating {
                metric: metric.compact_name().to_string(),
                index: row.index,
            })?;
            cells.push(Cell::Int(rating));
        }
        table.push_row(cells)?;
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn row(id: i64) -> Row {
        Row {
            id,
            prompt: Some(format!("q{}", id)),
            completion: Some(format!("a{}", id)),
            context: Some("ctx".into()),
            ground_truth: None,
        }
    }

    #[test]
    fn test_column_order() {
        let cols = annotation_columns(
            true,
            true,
            &[MetricName::Similarity, MetricName::Fluency],
        );
        assert_eq!(
            cols,
            vec![
                "index",
                "prompt",
                "context",
                "completion",
                "ground_truth",
                "Similarity",
                "Fluency"
            ]
        );
        let cols = annotation_columns(false, false, &[MetricName::Coherence]);
        assert_eq!(cols, vec!["index", "prompt", "completion", "Coherence"]);
    }

    #[test]
    fn test_from_row_rejects_out_of_scale() {
        let res = AnnotatedRow::from_row(&row(3), &[MetricName::Fluency], &[6]);
        assert!(matches!(
            res,
            Err(DomainError::RatingOutOfRange { rating: 6, index: 3, .. })
        ));
        let res = AnnotatedRow::from_row(&row(3), &[MetricName::Fluency], &[0]);
        assert!(res.is_err());
    }

    #[test]
    fn test_from_row_arity() {
        let res = AnnotatedRow::from_row(
            &row(0),
            &[MetricName::Fluency, MetricName::Coherence],
            &[3],
        );
        assert!(matches!(res, Err(DomainError::TableError(_))));
    }

    #[test]
    fn test_to_table() -> Result<()> {
        let metrics = [MetricName::Fluency, MetricName::Coherence];
        let annotated = vec![
            AnnotatedRow::from_row(&row(0), &metrics, &[5, 2])?,
            AnnotatedRow::from_row(&row(1), &metrics, &[1, 4])?,
        ];
        let table = annotations_to_table(&annotated, true, false, &metrics)?;
        assert_eq!(
            table.columns,
            vec!["index", "prompt", "context", "completion", "Fluency", "Coherence"]
        );
        assert_eq!(table.cell(1, "index"), Some(&Cell::Int(1)));
        assert_eq!(table.cell(1, "Coherence"), Some(&Cell::Int(4)));
        assert_eq!(annotated[0].rating(MetricName::Coherence), Some(2));
        assert_eq!(annotated[0].rating(MetricName::Similarity), None);
        Ok(())
    }
}
