//! Tunable constants for classification, layout and axis ranges
//!
//! Every value has a default matching the calibration campaign the tool was
//! built for. A JSON file may override any subset of them:
//!
//! ```json
//! { "classify": { "close_peak_dbm": -80 }, "layout": { "page_size": 6 } }
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub classify: ClassifyConfig,
    pub layout: LayoutConfig,
    pub axes: AxisConfig,
}

/// Thresholds the classifier uses to guess gait speed and proximity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Trials with at most this many samples are runs
    pub run_max_rows: usize,
    /// Trials with at least this many samples are walks
    pub walk_min_rows: usize,
    /// Peak RSSI at or above this is a close pass
    pub close_peak_dbm: f64,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            run_max_rows: 70,
            walk_min_rows: 140,
            close_peak_dbm: -78.0,
        }
    }
}

/// Largest grid the fixed layout will build.
pub const MAX_GRID_CELLS: usize = 400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub page_size: usize,
    pub grid_rows: usize,
    pub grid_cols: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_size: 4,
            grid_rows: 4,
            grid_cols: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    /// Shared y-range for every panel of the fixed grid
    pub grid_y: (f64, f64),
    /// Shared y-range for the trellis facets
    pub trellis_y: (f64, f64),
    /// Event RSSI above this is not trusted for drawing
    pub event_ceiling_dbm: f64,
    /// Event RSSI below this is not trusted in the strict (grid) variant
    pub event_floor_dbm: f64,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            grid_y: (-105.0, -60.0),
            trellis_y: (-105.0, -70.0),
            event_ceiling_dbm: -60.0,
            event_floor_dbm: -120.0,
        }
    }
}

impl Config {
    /// Load a config file, falling back to defaults for anything it omits.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.classify.run_max_rows >= self.classify.walk_min_rows {
            return Err(ConfigError::Invalid(format!(
                "run_max_rows ({}) must be below walk_min_rows ({})",
                self.classify.run_max_rows, self.classify.walk_min_rows
            )));
        }
        if self.layout.page_size == 0 {
            return Err(ConfigError::Invalid("page_size must be at least 1".into()));
        }
        if self.layout.grid_rows == 0 || self.layout.grid_cols == 0 {
            return Err(ConfigError::Invalid(format!(
                "grid must have at least one cell, got {}x{}",
                self.layout.grid_rows, self.layout.grid_cols
            )));
        }
        match self.layout.grid_rows.checked_mul(self.layout.grid_cols) {
            Some(cells) if cells <= MAX_GRID_CELLS => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "grid {}x{} exceeds {} cells",
                    self.layout.grid_rows, self.layout.grid_cols, MAX_GRID_CELLS
                )))
            }
        }
        for (name, (lo, hi)) in [("grid_y", self.axes.grid_y), ("trellis_y", self.axes.trellis_y)] {
            if lo >= hi {
                return Err(ConfigError::Invalid(format!(
                    "{} lower bound {} must be below upper bound {}",
                    name, lo, hi
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_campaign_thresholds() {
        let config = Config::default();
        assert_eq!(config.classify.run_max_rows, 70);
        assert_eq!(config.classify.walk_min_rows, 140);
        assert_eq!(config.classify.close_peak_dbm, -78.0);
        assert_eq!(config.layout.page_size, 4);
        assert_eq!((config.layout.grid_rows, config.layout.grid_cols), (4, 5));
        assert_eq!(config.axes.grid_y, (-105.0, -60.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "classify": {{ "close_peak_dbm": -80 }}, "layout": {{ "page_size": 6 }} }}"#).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.classify.close_peak_dbm, -80.0);
        assert_eq!(config.classify.run_max_rows, 70);
        assert_eq!(config.layout.page_size, 6);
        assert_eq!(config.layout.grid_cols, 5);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = Config::default();
        config.classify.run_max_rows = 200;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_oversized_grid_rejected() {
        let mut config = Config::default();
        config.layout.grid_rows = 1000;
        config.layout.grid_cols = 1000;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.layout.grid_rows = usize::MAX;
        config.layout.grid_cols = 2;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.layout.grid_rows = 20;
        config.layout.grid_cols = 20;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
