use serde::Serialize;
use tracing::info;

use crate::classify::{KEY_COLUMN, OutlierSet, compute_outliers, is_invalid};
use crate::model::{CellPos, Table};
use crate::options::ValidationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    InvalidPass,
    OutlierPass,
}

/// Two-pass row-major walk over the cells that need the operator's attention.
///
/// The invalid pass visits every cell failing the basic validity check. Once it
/// runs off the end of the table the outlier set is computed and the walk
/// restarts at the top, visiting only outliers outside the key column. The
/// phase never goes back to the invalid pass until [`NavigationCursor::reset`].
#[derive(Debug, Clone)]
pub struct NavigationCursor {
    position: CellPos,
    phase: Phase,
    outliers: OutlierSet,
}

impl Default for NavigationCursor {
    fn default() -> Self {
        Self {
            position: CellPos::new(0, 0),
            phase: Phase::InvalidPass,
            outliers: OutlierSet::new(),
        }
    }
}

impl NavigationCursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn position(&self) -> CellPos {
        self.position
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn outliers(&self) -> &OutlierSet {
        &self.outliers
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Moves to `pos` without touching the phase.
    pub fn jump(&mut self, pos: CellPos) {
        self.position = pos;
    }

    /// Recomputes the outlier set if the outlier pass is running. During the
    /// invalid pass the set is computed lazily on phase entry instead.
    pub fn refresh_outliers(&mut self, table: &Table, config: &ValidationConfig) {
        if self.phase == Phase::OutlierPass {
            self.outliers = compute_outliers(table, config);
        }
    }

    /// First attention cell at or after `start`, moving on to the outlier pass
    /// when the invalid pass is exhausted. `None` once both passes are done.
    pub fn seek_from(
        &mut self,
        table: &Table,
        config: &ValidationConfig,
        start: Option<CellPos>,
    ) -> Option<CellPos> {
        if let Some(found) = self.scan(table, config, start) {
            self.position = found;
            return Some(found);
        }

        if self.phase == Phase::InvalidPass {
            self.enter_outlier_pass(table, config);
            if let Some(found) = self.scan(table, config, Some(CellPos::new(0, 0))) {
                self.position = found;
                return Some(found);
            }
        }

        None
    }

    /// Next attention cell strictly after `pos`.
    pub fn advance_from(
        &mut self,
        table: &Table,
        config: &ValidationConfig,
        pos: CellPos,
    ) -> Option<CellPos> {
        self.seek_from(table, config, table.next_after(pos))
    }

    fn enter_outlier_pass(&mut self, table: &Table, config: &ValidationConfig) {
        self.phase = Phase::OutlierPass;
        self.outliers = compute_outliers(table, config);
        info!(outliers = self.outliers.len(), "invalid pass finished, checking outliers");
    }

    fn needs_attention(&self, table: &Table, config: &ValidationConfig, pos: CellPos) -> bool {
        match self.phase {
            Phase::InvalidPass => table
                .get(pos)
                .is_some_and(|value| is_invalid(value, pos.col, config)),
            Phase::OutlierPass => pos.col != KEY_COLUMN && self.outliers.contains(&pos),
        }
    }

    fn scan(
        &self,
        table: &Table,
        config: &ValidationConfig,
        start: Option<CellPos>,
    ) -> Option<CellPos> {
        let mut next = start.and_then(|pos| table.first_at_or_after(pos));
        while let Some(pos) = next {
            if self.needs_attention(table, config, pos) {
                return Some(pos);
            }
            next = table.next_after(pos);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{NavigationCursor, Phase};
    use crate::classify::OutlierSet;
    use crate::model::{CellPos, Table};
    use crate::options::ValidationConfig;

    fn table(rows: &[&[&str]]) -> Table {
        Table::new(
            rows.iter()
                .map(|row| row.iter().map(ToString::to_string).collect())
                .collect(),
        )
    }

    fn std_config(threshold: f64) -> ValidationConfig {
        ValidationConfig {
            use_std_dev: true,
            std_dev_threshold: threshold,
            ..ValidationConfig::default()
        }
    }

    #[test]
    fn invalid_pass_yields_out_of_range_cell_first() {
        let table = table(&[&["1", "105"], &["2", "50"]]);
        let config = ValidationConfig::default();
        let mut cursor = NavigationCursor::new();

        let first = cursor.seek_from(&table, &config, Some(CellPos::new(0, 0)));
        assert_eq!(first, Some(CellPos::new(0, 1)));
        assert_eq!(cursor.phase(), Phase::InvalidPass);
        assert_eq!(cursor.advance_from(&table, &config, CellPos::new(0, 1)), None);
        assert_eq!(cursor.phase(), Phase::OutlierPass);
    }

    #[test]
    fn key_column_is_checked_for_validity() {
        let table = table(&[&["", "1"], &["label", "2"]]);
        let config = ValidationConfig::default();
        let mut cursor = NavigationCursor::new();

        assert_eq!(
            cursor.seek_from(&table, &config, Some(CellPos::new(0, 0))),
            Some(CellPos::new(0, 0))
        );
        assert_eq!(
            cursor.advance_from(&table, &config, CellPos::new(0, 0)),
            Some(CellPos::new(1, 0))
        );
    }

    #[test]
    fn walks_ragged_rows_in_row_major_order() {
        let table = table(&[&["1", "a", "b"], &["c"], &[], &["2", "3", "4", "d"]]);
        let config = ValidationConfig::default();
        let mut cursor = NavigationCursor::new();

        let mut seen = Vec::new();
        let mut next = cursor.seek_from(&table, &config, Some(CellPos::new(0, 0)));
        while let Some(pos) = next {
            seen.push(pos);
            next = cursor.advance_from(&table, &config, pos);
        }

        assert_eq!(
            seen,
            vec![
                CellPos::new(0, 1),
                CellPos::new(0, 2),
                CellPos::new(1, 0),
                CellPos::new(3, 3),
            ]
        );
    }

    #[test]
    fn outlier_pass_starts_from_top_after_invalid_pass() {
        let table = table(&[
            &["1", "10", "1"],
            &["2", "10", "1"],
            &["3", "10", "1"],
            &["4", "90", "1"],
            &["5", "10", "x"],
        ]);
        let config = std_config(1.5);
        let mut cursor = NavigationCursor::new();

        let first = cursor.seek_from(&table, &config, Some(CellPos::new(0, 0)));
        assert_eq!(first, Some(CellPos::new(4, 2)));
        assert!(cursor.outliers().is_empty());

        let next = cursor.advance_from(&table, &config, CellPos::new(4, 2));
        assert_eq!(next, Some(CellPos::new(3, 1)));
        assert_eq!(cursor.phase(), Phase::OutlierPass);
        assert_eq!(cursor.outliers(), &OutlierSet::from([CellPos::new(3, 1)]));
        assert_eq!(cursor.advance_from(&table, &config, CellPos::new(3, 1)), None);
    }

    #[test]
    fn jump_keeps_invalid_pass_running() {
        let table = table(&[&["", "x"], &["5", ""], &["", "7"]]);
        let config = ValidationConfig::default();
        let mut cursor = NavigationCursor::new();

        cursor.seek_from(&table, &config, Some(CellPos::new(0, 0)));
        cursor.jump(CellPos::new(1, 0));
        assert_eq!(cursor.phase(), Phase::InvalidPass);
        assert_eq!(
            cursor.advance_from(&table, &config, cursor.position()),
            Some(CellPos::new(1, 1))
        );
        assert_eq!(
            cursor.advance_from(&table, &config, CellPos::new(1, 1)),
            Some(CellPos::new(2, 0))
        );
        assert_eq!(cursor.phase(), Phase::InvalidPass);
    }

    #[test]
    fn empty_table_exhausts_both_passes() {
        let table = Table::default();
        let mut cursor = NavigationCursor::new();
        assert_eq!(
            cursor.seek_from(&table, &std_config(2.0), Some(CellPos::new(0, 0))),
            None
        );
        assert_eq!(cursor.phase(), Phase::OutlierPass);
    }
}
