use std::io::{self, Read};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::CheckerError;
use crate::model::Table;

pub const DEFAULT_DELIMITER: u8 = b',';

fn parse_rows<R: Read>(
    source: &Path,
    reader: R,
    delimiter: u8,
) -> Result<Vec<Vec<String>>, CheckerError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record
            .map_err(|error| CheckerError::parse(source, format!("row {}: {error}", index + 1)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Reads a headerless CSV. Placeholder cells ("x" in any case) come back empty.
pub fn read_table(path: &Path, delimiter: u8) -> Result<Table, CheckerError> {
    let file = std::fs::File::open(path)
        .map_err(|error| CheckerError::parse(path, format!("cannot open file: {error}")))?;
    let rows = parse_rows(path, file, delimiter)?;
    Ok(Table::from_loaded_rows(rows))
}

pub fn parse_table_str(content: &str, delimiter: u8) -> Result<Table, CheckerError> {
    let rows = parse_rows(Path::new("<memory>"), content.as_bytes(), delimiter)?;
    Ok(Table::from_loaded_rows(rows))
}

fn write_rows<W: io::Write>(writer: W, table: &Table, delimiter: u8) -> Result<W, CheckerError> {
    let mut writer = WriterBuilder::new()
        .flexible(true)
        .delimiter(delimiter)
        .from_writer(writer);
    for row in table.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|error| CheckerError::Io(error.into_error()))
}

/// Attaches the target path to a failure that happened while writing the
/// temp file.
fn persist_failure(path: &Path, error: CheckerError) -> CheckerError {
    let source = match error {
        CheckerError::Io(source) => source,
        CheckerError::Csv(source) => io::Error::other(source),
        other => return other,
    };
    CheckerError::Persist {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes `table` over `path` through a sibling temp file, so a failed write
/// leaves the previous file in place.
pub fn write_table(path: &Path, table: &Table, delimiter: u8) -> Result<(), CheckerError> {
    let persist_error = |source: io::Error| CheckerError::Persist {
        path: path.to_path_buf(),
        source,
    };

    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let temp = NamedTempFile::new_in(dir).map_err(persist_error)?;
    let temp = write_rows(temp, table, delimiter).map_err(|error| persist_failure(path, error))?;
    temp.as_file().sync_all().map_err(persist_error)?;
    temp.persist(path)
        .map_err(|error| persist_error(error.error))?;
    Ok(())
}

pub fn write_table_to_string(table: &Table, delimiter: u8) -> Result<String, CheckerError> {
    let bytes = write_rows(Vec::<u8>::new(), table, delimiter)?;
    String::from_utf8(bytes)
        .map_err(|error| CheckerError::InvalidOption(format!("invalid utf-8 csv output: {error}")))
}

/// A table together with the CSV file it was loaded from and is saved back to.
#[derive(Debug, Clone)]
pub struct TableStore {
    path: PathBuf,
    delimiter: u8,
    table: Table,
}

impl TableStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CheckerError> {
        Self::load_with_delimiter(path, DEFAULT_DELIMITER)
    }

    pub fn load_with_delimiter(
        path: impl Into<PathBuf>,
        delimiter: u8,
    ) -> Result<Self, CheckerError> {
        let path = path.into();
        let table = read_table(&path, delimiter)?;
        info!(
            path = %path.display(),
            rows = table.row_count(),
            width = table.max_width(),
            "loaded table"
        );
        Ok(Self {
            path,
            delimiter,
            table,
        })
    }

    /// Wraps an in-memory table; nothing is read from `path`.
    #[must_use]
    pub fn from_table(path: impl Into<PathBuf>, table: Table) -> Self {
        Self {
            path: path.into(),
            delimiter: DEFAULT_DELIMITER,
            table,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Result<&str, CheckerError> {
        self.table.get_cell(row, col)
    }

    pub fn set_cell(
        &mut self,
        row: usize,
        col: usize,
        value: impl Into<String>,
    ) -> Result<(), CheckerError> {
        self.table.set_cell(row, col, value)
    }

    pub fn save(&self) -> Result<(), CheckerError> {
        match write_table(&self.path, &self.table, self.delimiter) {
            Ok(()) => {
                info!(path = %self.path.display(), rows = self.table.row_count(), "saved table");
                Ok(())
            }
            Err(error) => {
                warn!(path = %self.path.display(), %error, "failed to save table");
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::Path;

    use super::{parse_table_str, persist_failure, write_table_to_string};
    use crate::error::CheckerError;
    use crate::model::Table;

    #[test]
    fn parses_ragged_rows_without_header() {
        let table = parse_table_str("a,b,c\nd\ne,f\n", b',').expect("csv should parse");
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.row_len(1), Some(1));
        assert_eq!(table.rows()[0], vec!["a", "b", "c"]);
    }

    #[test]
    fn placeholders_are_cleared_on_parse() {
        let table = parse_table_str("1,X, x ,xy\n", b',').expect("csv should parse");
        assert_eq!(table.rows()[0], vec!["1", "", "", "xy"]);
    }

    #[test]
    fn writes_without_header_and_quotes_when_needed() {
        let table = Table::new(vec![
            vec!["1".to_string(), "a,b".to_string()],
            vec!["2".to_string(), String::new()],
        ]);
        let csv = write_table_to_string(&table, b',').expect("csv should serialize");
        assert!(csv.starts_with("1,\"a,b\"\n"), "unexpected CSV output: {csv:?}");
        let reparsed = parse_table_str(&csv, b',').expect("csv should parse back");
        assert_eq!(reparsed, table);
    }

    #[test]
    fn rejects_invalid_utf8() {
        let bytes = b"1,\xff\xfe\n";
        let err = super::parse_rows(std::path::Path::new("bad.csv"), &bytes[..], b',')
            .expect_err("invalid utf-8 should fail");
        assert!(err.to_string().contains("bad.csv"));
    }

    #[test]
    fn temp_file_write_errors_carry_target_path() {
        let target = Path::new("out/table.csv");
        let disk_full = CheckerError::Io(io::Error::new(io::ErrorKind::StorageFull, "no space"));

        let err = persist_failure(target, disk_full);
        match &err {
            CheckerError::Persist { path, source } => {
                assert_eq!(path, target);
                assert_eq!(source.kind(), io::ErrorKind::StorageFull);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("table.csv"));

        let unrelated = persist_failure(target, CheckerError::NoActiveCell);
        assert!(matches!(unrelated, CheckerError::NoActiveCell));
    }
}
