//! Graph-side collaborators of an operator kernel
//!
//! A [`Node`] carries the operator name, opset, input/output tensors and
//! [`Attributes`] of one graph vertex, and owns the operator bound to it.

mod attribute;
mod node;

pub use attribute::{AttributeValue, Attributes};
pub use node::Node;
