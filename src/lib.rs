//! # convnd
//!
//! **N-dimensional convolution kernel for an embeddable inference engine.**
//!
//! convnd implements the `Conv` operator over inputs of any rank: 1-D signals,
//! 2-D images, 3-D volumes and beyond. The kernel handles grouped, strided and
//! dilated convolution with explicit or automatic (`VALID`, `SAME_UPPER`,
//! `SAME_LOWER`) padding, in half, single and double precision.
//!
//! ## Lifecycle
//!
//! A graph [`Node`](graph::Node) is bound to a kernel once, reshaped whenever its
//! input shapes may have changed, and computed on every inference pass:
//!
//! ```rust
//! use convnd::prelude::*;
//!
//! # fn main() -> convnd::error::Result<()> {
//! let x = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0], &[1, 1, 5])?;
//! let w = Tensor::from_slice(&[1.0f32, 1.0, 1.0], &[1, 1, 3])?;
//!
//! let mut node = Node::new("conv0", "Conv", 11)
//!     .with_input(x)
//!     .with_input(w)
//!     .with_output(Tensor::placeholder(DType::F32))
//!     .with_attributes(Attributes::new().with_ints("kernel_shape", &[3]));
//!
//! node.bind()?;
//! node.reshape()?;
//! node.compute()?;
//!
//! assert_eq!(node.outputs[0].shape(), &[1, 1, 3]);
//! assert_eq!(node.outputs[0].to_vec::<f32>()?, vec![6.0, 9.0, 12.0]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): compute output planes in parallel

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dtype;
pub mod error;
pub mod graph;
pub mod ops;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::graph::{AttributeValue, Attributes, Node};
    pub use crate::ops::conv::{AutoPad, Conv, ConvParams};
    pub use crate::ops::Operator;
    pub use crate::tensor::Tensor;
}
