use serde::{Deserialize, Serialize};

use crate::error::{CoverageError, Result};

/// Finest geohash precision the codec supports.
pub const MAX_GEOHASH_LEVEL: usize = 12;

pub const DEFAULT_THRESHOLD: f64 = 0.95;

/// Settings for a coverage run, usually read from a JSON file.
///
/// Every field is optional in the file; missing ones fall back to the
/// defaults below.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CoverageConfig {
    pub min_level: usize,
    pub max_level: usize,
    pub threshold: f64,
    pub use_index: bool,
    pub dissolve: bool,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        CoverageConfig {
            min_level: 2,
            max_level: 5,
            threshold: DEFAULT_THRESHOLD,
            use_index: true,
            dissolve: false,
        }
    }
}

impl CoverageConfig {
    pub fn validate(&self) -> Result<()> {
        validate_level_range(self.min_level, self.max_level)?;
        validate_threshold(self.threshold)
    }

    pub fn options(&self) -> CoverageOptions {
        CoverageOptions {
            threshold: self.threshold,
            use_index: self.use_index,
        }
    }
}

/// Per-call knobs shared by the single-level and adaptive engines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageOptions {
    /// Minimum share of a tile's area that must fall inside the geometry.
    pub threshold: f64,
    /// Prefilter geometry parts through an R-tree instead of testing all of them.
    pub use_index: bool,
}

impl Default for CoverageOptions {
    fn default() -> Self {
        CoverageOptions {
            threshold: DEFAULT_THRESHOLD,
            use_index: true,
        }
    }
}

impl CoverageOptions {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_index(mut self, use_index: bool) -> Self {
        self.use_index = use_index;
        self
    }
}

pub fn validate_level(level: usize) -> Result<()> {
    validate_level_range(level, level)
}

pub fn validate_level_range(min_level: usize, max_level: usize) -> Result<()> {
    if min_level < 1 {
        return Err(CoverageError::invalid_range(
            min_level,
            max_level,
            "levels start at 1",
        ));
    }
    if min_level > max_level {
        return Err(CoverageError::invalid_range(
            min_level,
            max_level,
            "min_level is greater than max_level",
        ));
    }
    if max_level > MAX_GEOHASH_LEVEL {
        return Err(CoverageError::invalid_range(
            min_level,
            max_level,
            format!("levels above {MAX_GEOHASH_LEVEL} are not supported"),
        ));
    }
    Ok(())
}

pub fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_finite() && threshold > 0.0 && threshold <= 1.0 {
        Ok(())
    } else {
        Err(CoverageError::InvalidThreshold(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let config: CoverageConfig = serde_json::from_str(r#"{"max_level": 7}"#).unwrap();
        assert_eq!(config.max_level, 7);
        assert_eq!(config.min_level, 2);
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert!(config.use_index);
        assert!(!config.dissolve);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_range() {
        let err = validate_level_range(5, 3).unwrap_err();
        assert!(matches!(
            err,
            CoverageError::InvalidRange {
                min_level: 5,
                max_level: 3,
                ..
            }
        ));
    }

    #[test]
    fn rejects_level_zero_and_too_fine() {
        assert!(validate_level(0).is_err());
        assert!(validate_level(MAX_GEOHASH_LEVEL).is_ok());
        assert!(validate_level(MAX_GEOHASH_LEVEL + 1).is_err());
    }

    #[test]
    fn threshold_bounds() {
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(0.5).is_ok());
        assert_eq!(
            validate_threshold(0.0),
            Err(CoverageError::InvalidThreshold(0.0))
        );
        assert!(validate_threshold(1.5).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
    }
}
