use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoverageError {
    #[error("invalid geohash {code:?}: {reason}")]
    InvalidCode { code: String, reason: String },

    #[error("invalid level range [{min_level}, {max_level}]: {reason}")]
    InvalidRange {
        min_level: usize,
        max_level: usize,
        reason: String,
    },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("coverage threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),
}

impl CoverageError {
    pub fn invalid_code(code: &str, reason: impl Into<String>) -> Self {
        CoverageError::InvalidCode {
            code: code.to_owned(),
            reason: reason.into(),
        }
    }

    pub fn invalid_range(min_level: usize, max_level: usize, reason: impl Into<String>) -> Self {
        CoverageError::InvalidRange {
            min_level,
            max_level,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoverageError>;
