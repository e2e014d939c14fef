use thiserror::Error;

use super::config::ConfigError;
use crate::core::models::cell::CellError;
use crate::core::symmetry::SymmetryError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("At least two datasets are needed for clustering, found {found}")]
    InsufficientData { found: usize },

    #[error("Dataset '{id}' has an invalid unit cell: {source}")]
    InvalidCell {
        id: String,
        #[source]
        source: CellError,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Expected {expected} distances, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Distance between datasets {i} and {j} must be finite and non-negative, got {value}")]
    InvalidDistance { i: usize, j: usize, value: f64 },

    #[error("Dataset index {index} is out of range for {n} datasets")]
    IndexOutOfRange { index: usize, n: usize },

    #[error("Cut threshold must be a non-negative number, got {0}")]
    InvalidThreshold(f64),

    #[error("Merge report lacks the {0}")]
    IncompleteMergeReport(&'static str),

    #[error("Symmetry lookup failed: {0}")]
    Symmetry(#[from] SymmetryError),

    #[error("Failed to process '{path}': {message}")]
    Input { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl EngineError {
    /// Wraps a file-level failure together with the offending path.
    pub fn input(path: impl AsRef<std::path::Path>, error: impl std::fmt::Display) -> Self {
        EngineError::Input {
            path: path.as_ref().display().to_string(),
            message: error.to_string(),
        }
    }
}
