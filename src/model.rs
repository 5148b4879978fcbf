use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::error::CheckerError;

/// Zero-based cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// One-based `(row, col)` as shown to the operator.
    #[must_use]
    pub const fn display_coords(self) -> (usize, usize) {
        (self.row + 1, self.col + 1)
    }
}

impl Display for CellPos {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (row, col) = self.display_coords();
        write!(f, "row {row}, col {col}")
    }
}

pub(crate) fn is_placeholder(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("x")
}

pub(crate) fn is_nan_literal(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("nan")
}

/// Value written by a confirm decision. Placeholders and the "nan" literal are
/// stored as empty cells; anything else is kept verbatim.
#[must_use]
pub fn normalize_confirmed(value: &str) -> String {
    if is_placeholder(value) || is_nan_literal(value) {
        String::new()
    } else {
        value.to_string()
    }
}

/// Rows of raw cell text. Rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Builds a table the way a load does: placeholder cells become empty.
    #[must_use]
    pub fn from_loaded_rows(rows: Vec<Vec<String>>) -> Self {
        let mut table = Self::new(rows);
        table.clear_placeholders();
        table
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn row_len(&self, row: usize) -> Option<usize> {
        self.rows.get(row).map(Vec::len)
    }

    /// Width of the widest row.
    #[must_use]
    pub fn max_width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    #[must_use]
    pub fn contains(&self, pos: CellPos) -> bool {
        self.row_len(pos.row).is_some_and(|len| pos.col < len)
    }

    #[must_use]
    pub fn get(&self, pos: CellPos) -> Option<&str> {
        self.rows
            .get(pos.row)
            .and_then(|row| row.get(pos.col))
            .map(String::as_str)
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Result<&str, CheckerError> {
        self.get(CellPos::new(row, col))
            .ok_or(CheckerError::CellOutOfBounds { row, col })
    }

    pub(crate) fn cell_mut(&mut self, pos: CellPos) -> Option<&mut String> {
        self.rows
            .get_mut(pos.row)
            .and_then(|cells| cells.get_mut(pos.col))
    }

    pub fn set_cell(
        &mut self,
        row: usize,
        col: usize,
        value: impl Into<String>,
    ) -> Result<(), CheckerError> {
        let cell = self
            .cell_mut(CellPos::new(row, col))
            .ok_or(CheckerError::CellOutOfBounds { row, col })?;
        *cell = value.into();
        Ok(())
    }

    /// Every existing coordinate in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = CellPos> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(row, cells)| (0..cells.len()).map(move |col| CellPos::new(row, col)))
    }

    /// First existing coordinate at or after `pos` in row-major order.
    #[must_use]
    pub fn first_at_or_after(&self, pos: CellPos) -> Option<CellPos> {
        if self.contains(pos) {
            return Some(pos);
        }
        ((pos.row + 1)..self.rows.len())
            .find(|&row| !self.rows[row].is_empty())
            .map(|row| CellPos::new(row, 0))
    }

    /// Coordinate that follows `pos` in row-major order, skipping empty rows.
    #[must_use]
    pub fn next_after(&self, pos: CellPos) -> Option<CellPos> {
        self.first_at_or_after(CellPos::new(pos.row, pos.col + 1))
    }

    pub(crate) fn clear_placeholders(&mut self) -> usize {
        let mut cleared = 0;
        for cell in self.rows.iter_mut().flatten() {
            if is_placeholder(cell) {
                cell.clear();
                cleared += 1;
            }
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::{CellPos, Table, normalize_confirmed};

    fn ragged() -> Table {
        Table::new(vec![
            vec!["a".to_string(), "b".to_string()],
            vec![],
            vec!["c".to_string()],
        ])
    }

    #[test]
    fn load_normalization_clears_placeholders_only() {
        let table = Table::from_loaded_rows(vec![vec![
            " X ".to_string(),
            "x".to_string(),
            "xx".to_string(),
            "nan".to_string(),
        ]]);
        assert_eq!(table.rows()[0], vec!["", "", "xx", "nan"]);
    }

    #[test]
    fn confirm_normalization_clears_nan_too() {
        assert_eq!(normalize_confirmed("NaN"), "");
        assert_eq!(normalize_confirmed(" x"), "");
        assert_eq!(normalize_confirmed(" 12 "), " 12 ");
    }

    #[test]
    fn bounds_are_checked_per_row() {
        let mut table = ragged();
        assert_eq!(table.get_cell(0, 1).expect("cell exists"), "b");
        assert!(table.get_cell(2, 1).is_err());
        assert!(table.set_cell(1, 0, "z").is_err());
        table.set_cell(2, 0, "z").expect("cell exists");
        assert_eq!(table.get(CellPos::new(2, 0)), Some("z"));
    }

    #[test]
    fn row_major_walk_skips_empty_rows() {
        let table = ragged();
        let positions = table.positions().collect::<Vec<_>>();
        assert_eq!(
            positions,
            vec![CellPos::new(0, 0), CellPos::new(0, 1), CellPos::new(2, 0)]
        );
        assert_eq!(table.next_after(CellPos::new(0, 1)), Some(CellPos::new(2, 0)));
        assert_eq!(table.next_after(CellPos::new(2, 0)), None);
        assert_eq!(table.max_width(), 2);
    }

    #[test]
    fn display_is_one_based() {
        assert_eq!(CellPos::new(0, 2).to_string(), "row 1, col 3");
    }
}
