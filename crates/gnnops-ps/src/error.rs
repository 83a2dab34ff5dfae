//! Error types for the parameter-store shard
//!
//! Missing keys are never errors: a pull falls back to the caller's default.
//! Errors only report calls whose keys, values or defaults disagree in shape
//! with each other or with the shard's declared value width.

use thiserror::Error;

/// Errors raised by [`PsShard`](crate::PsShard) and
/// [`ShardRegistry`](crate::ShardRegistry)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PsError {
    /// Row counts of keys, values or defaults disagree
    #[error("{operation}: shape mismatch, expected {expected:?} but got {got:?}")]
    ShapeMismatch {
        operation: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// A value or default row does not have the declared width
    #[error("{operation}: invalid value width, expected {expected} but got {got}")]
    InvalidKeyOrValueWidth {
        operation: String,
        expected: usize,
        got: usize,
    },

    /// A [`ShardConfig`](crate::ShardConfig) failed validation
    #[error("invalid shard config: {0}")]
    InvalidConfig(String),
}

impl PsError {
    pub fn shape_mismatch(operation: impl Into<String>, expected: Vec<usize>, got: Vec<usize>) -> Self {
        PsError::ShapeMismatch {
            operation: operation.into(),
            expected,
            got,
        }
    }

    pub fn invalid_width(operation: impl Into<String>, expected: usize, got: usize) -> Self {
        PsError::InvalidKeyOrValueWidth {
            operation: operation.into(),
            expected,
            got,
        }
    }
}

/// Result type for shard operations
pub type PsResult<T> = Result<T, PsError>;
