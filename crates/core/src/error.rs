//! Error types for equation detection.

use thiserror::Error;

/// Primary error type for equation detection.
///
/// Every variant is a precondition failure reported before the page is
/// touched; the partition grid is left exactly as it was handed in.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EquationError {
    #[error("no language classifier configured")]
    MissingLanguageClassifier,

    #[error("column layout is empty")]
    MissingColumns,

    #[error("invalid page resolution: {0}")]
    InvalidResolution(i32),

    #[error("invalid parameter {name}: {msg}")]
    InvalidParam { name: &'static str, msg: String },
}

impl EquationError {
    /// Status code of the classic detector contract; always negative.
    pub const fn status(&self) -> i32 {
        match self {
            Self::MissingLanguageClassifier => -1,
            Self::MissingColumns => -2,
            Self::InvalidResolution(_) => -3,
            Self::InvalidParam { .. } => -4,
        }
    }
}

/// Convenience Result type alias for EquationError.
pub type Result<T> = std::result::Result<T, EquationError>;
