// gsq-core/src/domain/violation.rs

use std::collections::HashSet;

use crate::domain::annotation::AnnotatedRow;
use crate::domain::dataset::ProductionDataset;
use crate::domain::error::DomainError;
use crate::domain::metric::MetricName;
use crate::domain::table::{Cell, Table};

/// Strict comparison: a rating equal to the threshold passes.
pub fn is_violation(rating: i64, threshold: i64) -> bool {
    rating < threshold
}

/// Rows rated below `threshold` for `metric`, joined back to their original
/// cells. Output columns: every dataset column, then the rating under the
/// metric's compact name. Sentinel (negative) and unknown indices never join;
/// a repeated index joins once. A dataset column already named after the
/// metric is rejected.
pub fn extract_violations(
    annotated: &[AnnotatedRow],
    dataset: &ProductionDataset,
    metric: MetricName,
    threshold: i64,
) -> Result<Table, DomainError> {
    if dataset.table().has_column(metric.compact_name()) {
        return Err(DomainError::RatingColumnClash(metric.compact_name().to_string()));
    }
    let mut columns = dataset.table().columns.clone();
    columns.push(metric.compact_name().to_string());
    let mut violations = Table::new(columns);

    let mut joined = HashSet::new();
    for row in annotated {
        let rating = row.rating(metric).ok_or_else(|| DomainError::MissingRating {
            metric: metric.compact_name().to_string(),
            index: row.index,
        })?;
        if !is_violation(rating, threshold) || row.index < 0 {
            continue;
        }
        let Some(cells) = dataset.cells_for(row.index) else {
            continue;
        };
        if !joined.insert(row.index) {
            continue;
        }

        let mut out = cells.to_vec();
        out.push(Cell::Int(rating));
        violations.push_row(out)?;
    }

    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metric::{COMPLETION, PROMPT};
    use anyhow::Result;

    fn dataset(n: usize) -> Result<ProductionDataset> {
        let mut t = Table::new([PROMPT, COMPLETION, "user_id"]);
        for i in 0..n {
            t.push_row(vec![
                format!("q{}", i).into(),
                format!("a{}", i).into(),
                Cell::Text(format!("u{}", i)),
            ])?;
        }
        Ok(ProductionDataset::from_table(t))
    }

    fn rated(ds: &ProductionDataset, ratings: &[i64]) -> Result<Vec<AnnotatedRow>> {
        ds.rows()
            .iter()
            .zip(ratings)
            .map(|(row, &r)| AnnotatedRow::from_row(row, &[MetricName::Fluency], &[r]))
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    #[test]
    fn test_threshold_is_strict() {
        assert!(is_violation(3, 4));
        assert!(!is_violation(4, 4));
        assert!(!is_violation(5, 4));
        assert!(!is_violation(1, 1));
    }

    #[test]
    fn test_join_back_to_original_row() -> Result<()> {
        let ds = dataset(4)?;
        let annotated = rated(&ds, &[5, 2, 4, 3])?;
        let table = extract_violations(&annotated, &ds, MetricName::Fluency, 4)?;

        assert_eq!(
            table.columns,
            vec!["prompt", "completion", "user_id", "Fluency"]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, "user_id"), Some(&Cell::Text("u1".into())));
        assert_eq!(table.cell(0, "Fluency"), Some(&Cell::Int(2)));
        assert_eq!(table.cell(1, "prompt"), Some(&Cell::Text("q3".into())));
        Ok(())
    }

    #[test]
    fn test_no_violations_is_empty() -> Result<()> {
        let ds = dataset(3)?;
        let annotated = rated(&ds, &[4, 5, 4])?;
        let table = extract_violations(&annotated, &ds, MetricName::Fluency, 4)?;
        assert!(table.is_empty());
        Ok(())
    }

    #[test]
    fn test_existing_rating_column_is_rejected() -> Result<()> {
        let mut t = Table::new([PROMPT, COMPLETION, "Fluency"]);
        t.push_row(vec!["q0".into(), "a0".into(), Cell::Int(5)])?;
        let ds = ProductionDataset::from_table(t);
        let annotated = rated(&ds, &[1])?;

        let err = extract_violations(&annotated, &ds, MetricName::Fluency, 4);
        assert!(matches!(err, Err(DomainError::RatingColumnClash(c)) if c == "Fluency"));
        Ok(())
    }

    #[test]
    fn test_sentinel_unknown_and_duplicate_indices() -> Result<()> {
        let ds = dataset(2)?;
        let mut annotated = rated(&ds, &[1, 1])?;
        let mut sentinel = annotated[0].clone();
        sentinel.index = -1;
        let mut unknown = annotated[0].clone();
        unknown.index = 99;
        let duplicate = annotated[1].clone();
        annotated.extend([sentinel, unknown, duplicate]);

        let table = extract_violations(&annotated, &ds, MetricName::Fluency, 4)?;
        assert_eq!(table.len(), 2);
        Ok(())
    }
}
