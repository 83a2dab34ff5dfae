//! Error types for graph kernel operations
//!
//! Every kernel validates its inputs before allocating or writing any output,
//! so an `Err` always means no partial result was produced.
//!
//! # Examples
//!
//! ```
//! use gnnops_kernels::error::{KernelError, KernelResult};
//!
//! fn check_parallel(values: usize, ids: usize) -> KernelResult<()> {
//!     if values != ids {
//!         return Err(KernelError::shape_mismatch(
//!             "segment_softmax",
//!             vec![values],
//!             vec![ids],
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_parallel(3, 3).is_ok());
//! assert!(check_parallel(3, 2).is_err());
//! ```

use thiserror::Error;

/// Error type for kernel operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// Length or width disagreement between parallel arrays
    #[error("{operation}: shape mismatch - expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        operation: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// An edge or position referencing a slot that does not exist
    #[error("{operation}: index {index} out of range for {bound} slots")]
    IndexOutOfRange {
        operation: String,
        index: usize,
        bound: usize,
    },

    /// Aggregation method outside of {sum, mean}
    #[error("Invalid reduce method '{0}': expected \"sum\" or \"mean\"")]
    InvalidMethod(String),
}

/// Result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

impl KernelError {
    /// Create a shape mismatch error
    pub fn shape_mismatch(operation: impl Into<String>, expected: Vec<usize>, got: Vec<usize>) -> Self {
        KernelError::ShapeMismatch {
            operation: operation.into(),
            expected,
            got,
        }
    }

    /// Create an index out of range error
    pub fn index_out_of_range(operation: impl Into<String>, index: usize, bound: usize) -> Self {
        KernelError::IndexOutOfRange {
            operation: operation.into(),
            index,
            bound,
        }
    }
}
