use std::path::{Component, Path, PathBuf};

use crate::model::CellPos;

/// Folder that holds OCR CSVs next to the per-table image folders.
pub const CSV_OUTPUT_DIR: &str = "csv_outputs";

/// `<table_dir>/row_<row+1>/col_<col+1>.png`
#[must_use]
pub fn resolve(table_dir: &Path, row: usize, col: usize) -> PathBuf {
    table_dir
        .join(format!("row_{}", row + 1))
        .join(format!("col_{}.png", col + 1))
}

/// Maps a CSV laid out as `<base>/<image_folder>/csv_outputs/<table>.csv` to the
/// folder holding that table's cell images, `<base>/<image_folder>/<table>`.
#[must_use]
pub fn infer_table_dir(base: &Path, csv_path: &Path) -> Option<PathBuf> {
    let relative = csv_path.strip_prefix(base).ok()?;
    let parts = relative
        .components()
        .map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;

    if parts.len() < 3 {
        return None;
    }

    let table = Path::new(parts[2]).file_stem()?;
    Some(base.join(parts[0]).join(table))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLocator {
    table_dir: PathBuf,
}

impl ImageLocator {
    #[must_use]
    pub fn new(table_dir: impl Into<PathBuf>) -> Self {
        Self {
            table_dir: table_dir.into(),
        }
    }

    #[must_use]
    pub fn for_csv(base: &Path, csv_path: &Path) -> Option<Self> {
        infer_table_dir(base, csv_path).map(Self::new)
    }

    #[must_use]
    pub fn table_dir(&self) -> &Path {
        &self.table_dir
    }

    #[must_use]
    pub fn resolve(&self, pos: CellPos) -> PathBuf {
        resolve(&self.table_dir, pos.row, pos.col)
    }

    /// Resolved image path, or `None` when there is no preview on disk.
    #[must_use]
    pub fn preview(&self, pos: CellPos) -> Option<PathBuf> {
        let path = self.resolve(pos);
        path.is_file().then_some(path)
    }
}
