//! Core error types.

use thiserror::Error;

/// Errors from building, validating, or persisting grammar elements.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("character set is empty")]
    EmptyCharacterSet,

    #[error("non-positive weight {weight} for character {character:?}")]
    NonPositiveWeight { character: char, weight: f64 },

    #[error("{bound} out of range: {value}")]
    RepeatCountOutOfRange { bound: &'static str, value: i64 },

    #[error("invalid maxRepeatCount: {max} is less than minRepeatCount {min}")]
    MaxBelowMin { min: u32, max: u32 },

    #[error("null element requires repeat bounds {{1,1}}, got min {min}, max {max:?}")]
    FixedRepeatBounds { min: u32, max: Option<u32> },

    #[error("invalid probability table: {reason}")]
    InvalidProbabilities { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns an error code suitable for reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::EmptyCharacterSet => "EMPTY_CHARSET",
            CoreError::NonPositiveWeight { .. } => "BAD_WEIGHT",
            CoreError::RepeatCountOutOfRange { .. } => "BAD_BOUNDS",
            CoreError::MaxBelowMin { .. } => "BAD_BOUNDS",
            CoreError::FixedRepeatBounds { .. } => "BAD_BOUNDS",
            CoreError::InvalidProbabilities { .. } => "BAD_PROBABILITIES",
            CoreError::Io(_) => "IO_ERROR",
            CoreError::Json(_) => "BAD_FORMAT",
        }
    }

    /// Returns true if the error came from validating element parameters.
    pub fn is_validation(&self) -> bool {
        !matches!(self, CoreError::Io(_) | CoreError::Json(_))
    }
}
