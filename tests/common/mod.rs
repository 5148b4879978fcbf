use std::path::{Path, PathBuf};

#[allow(dead_code)]
pub fn write_csv(dir: &Path, name: &str, rows: &[&[&str]]) -> Result<PathBuf, std::io::Error> {
    let path = dir.join(name);
    let mut content = String::new();
    for row in rows {
        content.push_str(&row.join(","));
        content.push('\n');
    }
    std::fs::write(&path, content)?;
    Ok(path)
}

/// Lays out `<base>/<folder>/csv_outputs/<table>.csv` plus an image for each
/// listed one-based `(row, col)` under `<base>/<folder>/<table>`.
#[allow(dead_code)]
pub fn write_ocr_output(
    base: &Path,
    folder: &str,
    table: &str,
    rows: &[&[&str]],
    images: &[(usize, usize)],
) -> Result<PathBuf, std::io::Error> {
    let csv_dir = base.join(folder).join("csv_outputs");
    std::fs::create_dir_all(&csv_dir)?;
    let csv = write_csv(&csv_dir, &format!("{table}.csv"), rows)?;

    for (row, col) in images {
        let row_dir = base.join(folder).join(table).join(format!("row_{row}"));
        std::fs::create_dir_all(&row_dir)?;
        std::fs::write(row_dir.join(format!("col_{col}.png")), b"\x89PNG")?;
    }
    Ok(csv)
}

#[allow(dead_code)]
pub fn read_rows(path: &Path) -> Vec<Vec<String>> {
    std::fs::read_to_string(path)
        .expect("CSV should be readable")
        .lines()
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}
