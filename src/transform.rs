use tracing::info;

use crate::classify::{KEY_COLUMN, parse_numeric};
use crate::model::{Table, is_nan_literal, is_placeholder};

/// Restores a decimal point that OCR dropped: every numeric cell outside the
/// key column that has no "." becomes `.<value>`. Cells already holding a "."
/// are left alone, so running it again changes nothing. Returns the number of
/// cells rewritten.
pub fn add_decimal_prefix(table: &mut Table) -> usize {
    let targets = table
        .positions()
        .filter(|pos| pos.col != KEY_COLUMN)
        .filter_map(|pos| {
            let value = table.get(pos)?.trim();
            let eligible = !value.is_empty()
                && !is_placeholder(value)
                && !is_nan_literal(value)
                && parse_numeric(value).is_some()
                && !value.contains('.');
            eligible.then(|| (pos, format!(".{value}")))
        })
        .collect::<Vec<_>>();

    for (pos, value) in &targets {
        if let Some(cell) = table.cell_mut(*pos) {
            cell.clone_from(value);
        }
    }

    info!(changed = targets.len(), "added decimal prefixes");
    targets.len()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::add_decimal_prefix;
    use crate::model::Table;

    fn table(rows: &[&[&str]]) -> Table {
        Table::new(
            rows.iter()
                .map(|row| row.iter().map(ToString::to_string).collect())
                .collect(),
        )
    }

    #[test]
    fn prefixes_integers_outside_key_column() {
        let mut table = table(&[&["12", " 45 ", "1.5", "abc"], &["3", "x", "nan", ""]]);
        let changed = add_decimal_prefix(&mut table);
        assert_eq!(changed, 1);
        assert_eq!(
            table,
            self::table(&[&["12", ".45", "1.5", "abc"], &["3", "x", "nan", ""]])
        );
    }

    #[test]
    fn running_twice_matches_running_once() {
        let mut once = table(&[&["1", "7", "08"], &["2", "9"]]);
        add_decimal_prefix(&mut once);
        let mut twice = once.clone();
        assert_eq!(add_decimal_prefix(&mut twice), 0);
        assert_eq!(once, twice);
        assert_eq!(once, table(&[&["1", ".7", ".08"], &["2", ".9"]]));
    }
}
