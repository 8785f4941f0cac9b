//! Error types for convnd

use crate::dtype::DType;
use thiserror::Error;

/// Result type alias using convnd's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while binding, reshaping or computing an operator
#[derive(Error, Debug)]
pub enum Error {
    /// Shape mismatch between a tensor and what the operation expects
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// DType mismatch between a tensor and the requested element view
    #[error("DType mismatch: {lhs:?} vs {rhs:?}")]
    DTypeMismatch {
        /// Dtype of the tensor
        lhs: DType,
        /// Dtype that was requested
        rhs: DType,
    },

    /// Out of memory
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Node has the wrong number of inputs or outputs for the operator
    #[error("Operator '{op}' cannot bind {inputs} input(s) and {outputs} output(s)")]
    InvalidArity {
        /// The operator name
        op: &'static str,
        /// Number of inputs on the node
        inputs: usize,
        /// Number of outputs on the node
        outputs: usize,
    },

    /// Spatial rank exceeds what the operator supports
    #[error("Operator '{op}' supports at most {max} spatial axes, got {got}")]
    UnsupportedRank {
        /// The operator name
        op: &'static str,
        /// Largest supported number of spatial axes
        max: usize,
        /// Requested number of spatial axes
        got: usize,
    },

    /// No kernel is registered for this node
    #[error("No kernel for operator '{op_type}' (opset {opset}, dtype {dtype})")]
    UnsupportedOperator {
        /// Operator name on the node
        op_type: String,
        /// Declared opset version
        opset: i64,
        /// Element type of the first input
        dtype: DType,
    },

    /// A lifecycle hook was called on a node without a bound operator
    #[error("Node '{node}' has no bound operator")]
    NotBound {
        /// Node name
        node: String,
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

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}
