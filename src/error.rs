//! Error types for convr

use crate::layer::{LayerKind, Strategy};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using convr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in convr operations
#[derive(Error, Debug)]
pub enum Error {
    /// Buffer lifecycle violation: double-allocate, double-free, or use-before-allocate.
    ///
    /// These indicate a caller defect. The failing operation is aborted and
    /// the buffer is left in the state it was in before the call.
    #[error("invalid allocation state: cannot {op} a buffer that is {state}")]
    AllocationState {
        /// The operation that was attempted
        op: &'static str,
        /// The state the buffer was found in
        state: &'static str,
    },

    /// Shape mismatch between chained layers or compared tensors
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// Failed to open or read a tensor file
    #[error("failed to read tensor file {}: {source}", .path.display())]
    Io {
        /// The file that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Tensor file holds fewer bytes than the shape requires
    #[error("short read from {}: expected {expected} bytes, got {actual}", .path.display())]
    ShortRead {
        /// The file that was read
        path: PathBuf,
        /// Bytes required by the tensor shape
        expected: usize,
        /// Bytes actually present
        actual: usize,
    },

    /// A compute strategy is not implemented for a layer kind
    #[error("strategy {strategy} is not implemented for {kind} layers")]
    UnsupportedStrategy {
        /// The layer kind the strategy was requested for
        kind: LayerKind,
        /// The requested strategy
        strategy: Strategy,
    },

    /// Invalid argument provided to an operation
    #[error("invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create an allocation state error
    pub fn allocation_state(op: &'static str, state: &'static str) -> Self {
        Self::AllocationState { op, state }
    }

    /// Create an unsupported strategy error
    pub fn unsupported_strategy(kind: LayerKind, strategy: Strategy) -> Self {
        Self::UnsupportedStrategy { kind, strategy }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}
