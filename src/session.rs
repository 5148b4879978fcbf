use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::classify::OutlierSet;
use crate::cursor::{NavigationCursor, Phase};
use crate::error::CheckerError;
use crate::image_locator::ImageLocator;
use crate::model::{CellPos, Table, normalize_confirmed};
use crate::options::ValidationConfig;
use crate::store::TableStore;
use crate::transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Loaded,
    Active,
    Done,
}

/// Result of an operator decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The next cell waiting for a decision.
    Attention(CellPos),
    /// Both passes are exhausted and the table has been saved.
    Completed,
}

/// Snapshot handed to whatever renders the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub phase: Phase,
    pub position: Option<CellPos>,
    pub value: Option<String>,
    pub preview: Option<PathBuf>,
    pub outlier_count: usize,
    pub unsaved_changes: bool,
}

/// Walks the operator through every cell needing attention and writes the
/// corrected table back to its CSV once both passes are exhausted.
#[derive(Debug, Clone)]
pub struct CorrectionSession {
    store: TableStore,
    config: ValidationConfig,
    cursor: NavigationCursor,
    locator: Option<ImageLocator>,
    state: SessionState,
    current: Option<CellPos>,
    unsaved_changes: bool,
}

impl CorrectionSession {
    #[must_use]
    pub fn new(store: TableStore, config: ValidationConfig) -> Self {
        Self {
            store,
            config,
            cursor: NavigationCursor::new(),
            locator: None,
            state: SessionState::Loaded,
            current: None,
            unsaved_changes: false,
        }
    }

    pub fn open(path: impl Into<PathBuf>, config: ValidationConfig) -> Result<Self, CheckerError> {
        Ok(Self::new(TableStore::load(path)?, config))
    }

    #[must_use]
    pub fn with_locator(mut self, locator: ImageLocator) -> Self {
        self.locator = Some(locator);
        self
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        self.store.table()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Changes take effect on the next classification; call
    /// [`CorrectionSession::reclassify`] to apply them to the current cell.
    pub fn config_mut(&mut self) -> &mut ValidationConfig {
        &mut self.config
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.cursor.phase()
    }

    #[must_use]
    pub fn current(&self) -> Option<CellPos> {
        self.current
    }

    #[must_use]
    pub fn current_value(&self) -> Option<&str> {
        self.current.and_then(|pos| self.store.table().get(pos))
    }

    #[must_use]
    pub fn outliers(&self) -> &OutlierSet {
        self.cursor.outliers()
    }

    #[must_use]
    pub fn preview(&self) -> Option<PathBuf> {
        let locator = self.locator.as_ref()?;
        locator.preview(self.current?)
    }

    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved_changes
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            phase: self.cursor.phase(),
            position: self.current,
            value: self.current_value().map(str::to_string),
            preview: self.preview(),
            outlier_count: self.cursor.outliers().len(),
            unsaved_changes: self.unsaved_changes,
        }
    }

    /// Restarts both passes from the top-left cell.
    pub fn start(&mut self) -> Result<Step, CheckerError> {
        self.cursor.reset();
        self.current = None;
        self.state = SessionState::Loaded;
        let found = self.cursor.seek_from(
            self.store.table(),
            &self.config,
            Some(CellPos::new(0, 0)),
        );
        self.settle(found)
    }

    /// Stores `value` in the current cell and moves on.
    pub fn confirm(&mut self, value: &str) -> Result<Step, CheckerError> {
        self.write_and_advance(normalize_confirmed(value))
    }

    /// Empties the current cell and moves on.
    pub fn clear(&mut self) -> Result<Step, CheckerError> {
        self.write_and_advance(String::new())
    }

    /// Moves to an arbitrary cell without changing the pass in progress and
    /// returns its current value.
    pub fn jump(&mut self, row: usize, col: usize) -> Result<&str, CheckerError> {
        let pos = CellPos::new(row, col);
        if !self.store.table().contains(pos) {
            return Err(CheckerError::JumpOutOfRange {
                row,
                col,
                rows: self.store.table().row_count(),
            });
        }

        debug!(%pos, phase = ?self.cursor.phase(), "jumped to cell");
        self.cursor.jump(pos);
        self.current = Some(pos);
        self.state = SessionState::Active;
        self.store.get_cell(row, col)
    }

    /// Re-runs classification with the current config and resumes from the
    /// current cell, which is itself re-checked.
    pub fn reclassify(&mut self) -> Result<Step, CheckerError> {
        if self.state == SessionState::Loaded {
            return self.start();
        }

        self.cursor
            .refresh_outliers(self.store.table(), &self.config);
        let from = self.current.unwrap_or_else(|| self.cursor.position());
        let found = self
            .cursor
            .seek_from(self.store.table(), &self.config, Some(from));
        self.settle(found)
    }

    /// Bulk decimal prefix over the whole table. Returns the number of cells
    /// changed.
    pub fn add_decimal_prefix(&mut self) -> usize {
        let changed = transform::add_decimal_prefix(self.store.table_mut());
        if changed > 0 {
            self.unsaved_changes = true;
        }
        changed
    }

    /// Writes the table back to its CSV. On failure the edits stay in memory
    /// and the save can be retried.
    pub fn save(&mut self) -> Result<(), CheckerError> {
        self.store.save()?;
        self.unsaved_changes = false;
        Ok(())
    }

    fn write_and_advance(&mut self, value: String) -> Result<Step, CheckerError> {
        let pos = self.current.ok_or(CheckerError::NoActiveCell)?;
        debug!(%pos, value = %value, "writing cell");
        self.store.set_cell(pos.row, pos.col, value)?;
        self.unsaved_changes = true;

        let found = self
            .cursor
            .advance_from(self.store.table(), &self.config, pos);
        self.settle(found)
    }

    fn settle(&mut self, found: Option<CellPos>) -> Result<Step, CheckerError> {
        if let Some(pos) = found {
            self.current = Some(pos);
            self.state = SessionState::Active;
            return Ok(Step::Attention(pos));
        }

        self.current = None;
        self.state = SessionState::Done;
        info!(path = %self.store.path().display(), "no invalid or outlier cells left");
        self.save()?;
        Ok(Step::Completed)
    }
}
