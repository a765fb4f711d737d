// gsq-core/src/domain/dataset.rs

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::domain::config::ColumnMapping;
use crate::domain::error::DomainError;
use crate::domain::metric::{COMPLETION, CONTEXT, GROUND_TRUTH, MetricName, PROMPT};
use crate::domain::table::{Cell, Table};

/// Rows kept when sampling by ratio produces nothing.
pub const FALLBACK_ROWS: usize = 5;

/// One production sample, identified by its row number in the sampled dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub id: i64,
    pub prompt: Option<String>,
    pub completion: Option<String>,
    pub context: Option<String>,
    pub ground_truth: Option<String>,
}

/// The sampled, canonically-named dataset plus its typed row view.
/// `rows[i].id == i` and `table.rows[i]` is the same sample.
#[derive(Debug, Clone)]
pub struct ProductionDataset {
    table: Table,
    rows: Vec<Row>,
}

impl ProductionDataset {
    pub fn from_table(table: Table) -> Self {
        let text_at = |row: &[Cell], col: Option<usize>| -> Option<String> {
            col.and_then(|i| row.get(i)).and_then(Cell::to_opt_string)
        };
        let prompt = table.column_index(PROMPT);
        let completion = table.column_index(COMPLETION);
        let context = table.column_index(CONTEXT);
        let ground_truth = table.column_index(GROUND_TRUTH);

        let rows = table
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| Row {
                id: i as i64,
                prompt: text_at(r, prompt),
                completion: text_at(r, completion),
                context: text_at(r, context),
                ground_truth: text_at(r, ground_truth),
            })
            .collect();

        Self { table, rows }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_context(&self) -> bool {
        self.table.has_column(CONTEXT)
    }

    pub fn has_ground_truth(&self) -> bool {
        self.table.has_column(GROUND_TRUTH)
    }

    /// Original cells for a row id. Negative or unknown ids yield `None`.
    pub fn cells_for(&self, id: i64) -> Option<&[Cell]> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.table.rows.get(i))
            .map(Vec::as_slice)
    }
}

/// Checks the columns the requested metrics need, then renames the configured
/// columns to prompt/completion/context/ground_truth. Fails when a rename would
/// shadow an existing column or when a column already carries a metric's
/// rating name.
pub fn prepare_columns(
    table: &mut Table,
    mapping: &ColumnMapping,
    metrics: &[MetricName],
) -> Result<(), DomainError> {
    for metric in metrics {
        for canonical in metric.required_columns() {
            let source = mapping.source_for(canonical);
            if !table.has_column(source) {
                return Err(DomainError::MissingColumn(source.to_string()));
            }
        }
    }

    // a renamed column must not land on a name the dataset already uses
    for (source, canonical) in mapping.pairs() {
        if source != canonical && table.has_column(source) && table.has_column(canonical) {
            return Err(DomainError::AmbiguousColumn {
                canonical: canonical.to_string(),
                source_column: source.to_string(),
            });
        }
    }

    for metric in metrics {
        if table.has_column(metric.compact_name()) {
            return Err(DomainError::RatingColumnClash(metric.compact_name().to_string()));
        }
    }

    for (source, canonical) in mapping.pairs() {
        table.rename_column(source, canonical);
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub table: Table,
    /// True when the ratio sample was empty and the first rows were used instead.
    pub fell_back: bool,
}

/// Bernoulli sampling without replacement.
pub struct Sampler {
    rng: StdRng,
    rate: f64,
}

impl Sampler {
    /// `rate` is clamped to [0, 1]; NaN samples nothing and falls back.
    pub fn new(rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        Self { rng, rate }
    }

    pub fn sample(&mut self, table: &Table) -> SampleOutcome {
        let rate = self.rate;
        let kept: Vec<usize> = (0..table.len())
            .filter(|_| self.rng.random_bool(rate))
            .collect();

        if kept.is_empty() {
            return SampleOutcome {
                table: table.head(FALLBACK_ROWS),
                fell_back: true,
            };
        }

        SampleOutcome {
            table: table.select_rows(&kept),
            fell_back: false,
        }
    }
}
