use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CheckerError;

pub const FALLBACK_MIN_VALUE: f64 = -50.0;
pub const FALLBACK_MAX_VALUE: f64 = 99.0;
pub const DEFAULT_STD_DEV_THRESHOLD: f64 = 2.0;

/// Validation settings read each time a cell is classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub use_min_max: bool,
    pub min_value: f64,
    pub max_value: f64,
    pub use_std_dev: bool,
    pub std_dev_threshold: f64,
    pub ignore_nan_literal: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            use_min_max: false,
            min_value: FALLBACK_MIN_VALUE,
            max_value: FALLBACK_MAX_VALUE,
            use_std_dev: false,
            std_dev_threshold: DEFAULT_STD_DEV_THRESHOLD,
            ignore_nan_literal: false,
        }
    }
}

impl ValidationConfig {
    /// Range a parsed value must fall into. The fallback range still applies
    /// when min/max checking is switched off.
    #[must_use]
    pub fn bounds(&self) -> (f64, f64) {
        if self.use_min_max {
            (self.min_value, self.max_value)
        } else {
            (FALLBACK_MIN_VALUE, FALLBACK_MAX_VALUE)
        }
    }

    pub fn validate(&self) -> Result<(), CheckerError> {
        if !self.min_value.is_finite() || !self.max_value.is_finite() {
            return Err(CheckerError::InvalidOption(
                "min and max values must be finite numbers".to_string(),
            ));
        }
        if self.min_value > self.max_value {
            return Err(CheckerError::InvalidOption(format!(
                "min value {} is greater than max value {}",
                self.min_value, self.max_value
            )));
        }
        if !self.std_dev_threshold.is_finite() || self.std_dev_threshold < 0.0 {
            return Err(CheckerError::InvalidOption(format!(
                "std dev threshold must be a non-negative number, got {}",
                self.std_dev_threshold
            )));
        }
        Ok(())
    }

    /// Loads a preset; fields missing from the file keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, CheckerError> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str::<Self>(&raw)?;
        config.validate()?;
        Ok(config)
    }
}
