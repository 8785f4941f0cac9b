//! Operator kernels and their registration
//!
//! # Design
//!
//! Every kernel implements [`Operator`], the seam between the graph executor and
//! the numeric code. A node is bound by looking up an initializer with
//! [`resolve`], keyed by operator name, opset version and the element type of
//! the node's first input:
//!
//! ```text
//! resolve(op_type, opset, dtype) -> InitFn
//!   └── InitFn(&Node) -> Box<dyn Operator>     (initialize, once)
//!         ├── reshape(inputs, outputs)         (whenever input shapes may change)
//!         ├── compute(inputs, outputs)         (every inference pass)
//!         └── Drop                             (teardown)
//! ```
//!
//! `reshape` must have run against the current input shapes before `compute`.

pub mod conv;

use crate::dtype::DType;
use crate::error::Result;
use crate::graph::Node;
use crate::tensor::Tensor;
use std::fmt;

/// Lifecycle hooks of a bound operator.
///
/// Construction is the one-time initialize step and `Drop` is teardown.
pub trait Operator: Send + fmt::Debug {
    /// Operator name as it appears on graph nodes.
    fn name(&self) -> &'static str;

    /// Infer output shapes from the current inputs and reshape `outputs` in place.
    fn reshape(&mut self, inputs: &[Tensor], outputs: &mut [Tensor]) -> Result<()>;

    /// Read `inputs` and write `outputs`, which must already be shaped by
    /// [`Operator::reshape`].
    fn compute(&self, inputs: &[Tensor], outputs: &mut [Tensor]) -> Result<()>;
}

/// One-time initializer producing a bound operator for a node.
pub type InitFn = fn(&Node) -> Result<Box<dyn Operator>>;

/// Find the initializer for a node's operator.
///
/// Returns `None` when no kernel handles the combination, in which case the
/// node must not be bound.
pub fn resolve(op_type: &str, opset: i64, dtype: DType) -> Option<InitFn> {
    match op_type {
        // Conv-1 and Conv-11 share one kernel.
        "Conv" if opset >= 1 => conv::resolve(dtype),
        _ => None,
    }
}
