use std::collections::BTreeMap;

use serde::Serialize;

use crate::classify::{
    Classification, ColumnStats, InvalidReason, classify, column_stats, compute_outliers,
};
use crate::model::{CellPos, Table};
use crate::options::ValidationConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidCell {
    pub pos: CellPos,
    pub value: String,
    pub reason: InvalidReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierCell {
    pub pos: CellPos,
    pub value: String,
    pub mean: f64,
    pub std_dev: f64,
}

/// Everything the two passes would stop at, computed on an unedited table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub row_count: usize,
    pub max_width: usize,
    pub invalid: Vec<InvalidCell>,
    pub outliers: Vec<OutlierCell>,
}

impl ScanReport {
    #[must_use]
    pub fn needs_attention(&self) -> bool {
        !self.invalid.is_empty() || !self.outliers.is_empty()
    }

    #[must_use]
    pub fn attention_count(&self) -> usize {
        self.invalid.len() + self.outliers.len()
    }
}

#[must_use]
pub fn scan(table: &Table, config: &ValidationConfig) -> ScanReport {
    let invalid = table
        .positions()
        .filter_map(|pos| {
            let value = table.get(pos)?;
            match classify(value, config) {
                Classification::Invalid(reason) => Some(InvalidCell {
                    pos,
                    value: value.to_string(),
                    reason,
                }),
                Classification::Valid(_) => None,
            }
        })
        .collect();

    let mut stats: BTreeMap<usize, Option<ColumnStats>> = BTreeMap::new();
    let outliers = compute_outliers(table, config)
        .into_iter()
        .filter_map(|pos| {
            let column = (*stats
                .entry(pos.col)
                .or_insert_with(|| column_stats(table, pos.col)))?;
            Some(OutlierCell {
                pos,
                value: table.get(pos)?.to_string(),
                mean: column.mean,
                std_dev: column.std_dev,
            })
        })
        .collect();

    ScanReport {
        row_count: table.row_count(),
        max_width: table.max_width(),
        invalid,
        outliers,
    }
}

#[cfg(test)]
mod tests {
    use super::scan;
    use crate::classify::InvalidReason;
    use crate::model::{CellPos, Table};
    use crate::options::ValidationConfig;

    fn table(rows: &[&[&str]]) -> Table {
        Table::new(
            rows.iter()
                .map(|row| row.iter().map(ToString::to_string).collect())
                .collect(),
        )
    }

    #[test]
    fn lists_invalid_cells_with_reasons() {
        let report = scan(&table(&[&["1", "105"], &["2", "50"]]), &ValidationConfig::default());
        assert_eq!(report.invalid.len(), 1);
        assert_eq!(report.invalid[0].pos, CellPos::new(0, 1));
        assert!(matches!(
            report.invalid[0].reason,
            InvalidReason::OutOfRange { value, .. } if value == 105.0
        ));
        assert!(report.outliers.is_empty());
        assert!(report.needs_attention());
    }

    #[test]
    fn outliers_carry_column_statistics() {
        let table = table(&[&["1", "2"], &["2", "2"], &["3", "2"], &["4", "8"]]);
        let config = ValidationConfig {
            use_std_dev: true,
            std_dev_threshold: 1.5,
            ..ValidationConfig::default()
        };
        let report = scan(&table, &config);
        assert!(report.invalid.is_empty());
        assert_eq!(report.outliers.len(), 1);
        assert_eq!(report.outliers[0].pos, CellPos::new(3, 1));
        assert_eq!(report.outliers[0].mean, 3.5);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = scan(&table(&[&["", "1"]]), &ValidationConfig::default());
        let json = serde_json::to_value(&report).expect("report should serialize");
        assert_eq!(json["invalid"][0]["reason"]["kind"], "blank");
        assert_eq!(json["invalid"][0]["pos"]["row"], 0);
    }
}
