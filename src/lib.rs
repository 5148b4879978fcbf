mod classify;
mod cursor;
mod error;
mod image_locator;
mod model;
mod options;
mod report;
mod session;
mod store;
mod transform;

use std::path::Path;

pub use classify::{
    Classification, ColumnStats, InvalidReason, KEY_COLUMN, OutlierSet, classify, column_stats,
    compute_outliers, is_invalid, parse_numeric,
};
pub use cursor::{NavigationCursor, Phase};
pub use error::CheckerError;
pub use image_locator::{CSV_OUTPUT_DIR, ImageLocator, infer_table_dir, resolve as resolve_image};
pub use model::{CellPos, Table, normalize_confirmed};
pub use options::{
    DEFAULT_STD_DEV_THRESHOLD, FALLBACK_MAX_VALUE, FALLBACK_MIN_VALUE, ValidationConfig,
};
pub use report::{InvalidCell, OutlierCell, ScanReport, scan};
pub use session::{CorrectionSession, SessionState, SessionStatus, Step};
pub use store::{
    DEFAULT_DELIMITER, TableStore, parse_table_str, read_table, write_table, write_table_to_string,
};
pub use transform::add_decimal_prefix;

/// Lists every cell a correction session would stop at, without editing.
pub fn scan_file(path: &Path, config: &ValidationConfig) -> Result<ScanReport, CheckerError> {
    let table = read_table(path, DEFAULT_DELIMITER)?;
    Ok(scan(&table, config))
}

/// Runs the bulk decimal prefix over a CSV and saves it in place unless
/// `dry_run` is set. Returns the number of cells changed.
pub fn prefix_decimals_in_file(path: &Path, dry_run: bool) -> Result<usize, CheckerError> {
    let mut store = TableStore::load(path)?;
    let changed = add_decimal_prefix(store.table_mut());
    if changed > 0 && !dry_run {
        store.save()?;
    }
    Ok(changed)
}
