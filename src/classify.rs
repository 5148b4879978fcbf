use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::model::{CellPos, Table, is_nan_literal, is_placeholder};
use crate::options::ValidationConfig;

/// Column 0 holds row labels and never takes part in outlier detection.
pub const KEY_COLUMN: usize = 0;

pub type OutlierSet = BTreeSet<CellPos>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidReason {
    Blank,
    Placeholder,
    NanLiteral,
    NotNumeric,
    OutOfRange { value: f64, min: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    Valid(Option<f64>),
    Invalid(InvalidReason),
}

impl Classification {
    #[must_use]
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }
}

/// Finite number in `value`, if it holds one.
#[must_use]
pub fn parse_numeric(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

#[must_use]
pub fn classify(value: &str, config: &ValidationConfig) -> Classification {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Classification::Invalid(InvalidReason::Blank);
    }
    if is_placeholder(trimmed) {
        return Classification::Invalid(InvalidReason::Placeholder);
    }
    if is_nan_literal(trimmed) {
        return if config.ignore_nan_literal {
            Classification::Valid(None)
        } else {
            Classification::Invalid(InvalidReason::NanLiteral)
        };
    }

    let Some(number) = parse_numeric(trimmed) else {
        return Classification::Invalid(InvalidReason::NotNumeric);
    };

    let (min, max) = config.bounds();
    if (min..=max).contains(&number) {
        Classification::Valid(Some(number))
    } else {
        Classification::Invalid(InvalidReason::OutOfRange {
            value: number,
            min,
            max,
        })
    }
}

/// Basic validity check. Applies to every column, the key column included,
/// so `_col` does not change the outcome.
#[must_use]
pub fn is_invalid(value: &str, _col: usize, config: &ValidationConfig) -> bool {
    classify(value, config).is_invalid()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnStats {
    pub col: usize,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl ColumnStats {
    #[must_use]
    pub fn is_outlier(&self, value: f64, threshold: f64) -> bool {
        (value - self.mean).abs() > threshold * self.std_dev
    }
}

fn numeric_column(table: &Table, col: usize) -> Vec<(usize, f64)> {
    table
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(row, cells)| {
            cells
                .get(col)
                .and_then(|cell| parse_numeric(cell))
                .map(|number| (row, number))
        })
        .collect()
}

/// Mean and population standard deviation of the numeric cells in `col`.
/// `None` when the column has no numeric cells or the statistics overflow.
#[must_use]
pub fn column_stats(table: &Table, col: usize) -> Option<ColumnStats> {
    let values = numeric_column(table, col);
    stats_for(col, &values)
}

#[allow(clippy::cast_precision_loss)]
fn stats_for(col: usize, values: &[(usize, f64)]) -> Option<ColumnStats> {
    if values.is_empty() {
        return None;
    }

    let count = values.len() as f64;
    let mean = values.iter().map(|(_, number)| number).sum::<f64>() / count;
    let variance = values
        .iter()
        .map(|(_, number)| (number - mean).powi(2))
        .sum::<f64>()
        / count;
    let std_dev = variance.sqrt();

    if !mean.is_finite() || !std_dev.is_finite() {
        debug!(col, "skipping column with degenerate statistics");
        return None;
    }

    Some(ColumnStats {
        col,
        count: values.len(),
        mean,
        std_dev,
    })
}

/// Statistical outliers for every non-key column. Empty when std dev checking
/// is disabled. Always computed from scratch.
#[must_use]
pub fn compute_outliers(table: &Table, config: &ValidationConfig) -> OutlierSet {
    let mut outliers = OutlierSet::new();
    if !config.use_std_dev {
        return outliers;
    }

    for col in (KEY_COLUMN + 1)..table.max_width() {
        let values = numeric_column(table, col);
        let Some(stats) = stats_for(col, &values) else {
            continue;
        };

        outliers.extend(
            values
                .iter()
                .filter(|(_, number)| stats.is_outlier(*number, config.std_dev_threshold))
                .map(|(row, _)| CellPos::new(*row, col)),
        );
    }

    debug!(count = outliers.len(), "computed outlier set");
    outliers
}
