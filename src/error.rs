use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("cell (row {}, col {}) is out of bounds", .row + 1, .col + 1)]
    CellOutOfBounds { row: usize, col: usize },

    #[error(
        "cannot jump to row {}, col {}: table has {rows} row(s)",
        .row + 1,
        .col + 1
    )]
    JumpOutOfRange { row: usize, col: usize, rows: usize },

    #[error("no cell is selected for editing")]
    NoActiveCell,

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("failed to save '{}': {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CheckerError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            Self::CellOutOfBounds { .. } | Self::JumpOutOfRange { .. }
        )
    }
}
