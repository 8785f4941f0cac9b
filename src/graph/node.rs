//! Graph node and its lifecycle hooks

use super::Attributes;
use crate::error::{Error, Result};
use crate::ops::{self, Operator};
use crate::tensor::Tensor;
use std::fmt;
use tracing::debug;

/// A computation-graph node: operator name, tensors and attributes
///
/// The executor drives a node through
/// `bind` (once) → `reshape` (whenever input shapes may have changed) →
/// `compute` (every pass) → `unbind` (once). Dropping a bound node unbinds it.
pub struct Node {
    /// Node name, used in diagnostics
    pub name: String,
    /// Operator name, e.g. `"Conv"`
    pub op_type: String,
    /// Opset version the operator is declared under
    pub opset: i64,
    /// Input tensors, in operator order
    pub inputs: Vec<Tensor>,
    /// Output tensors, in operator order
    pub outputs: Vec<Tensor>,
    /// Operator attributes
    pub attributes: Attributes,
    operator: Option<Box<dyn Operator>>,
}

impl Node {
    /// Create an unbound node with no tensors or attributes
    pub fn new(name: impl Into<String>, op_type: impl Into<String>, opset: i64) -> Self {
        Self {
            name: name.into(),
            op_type: op_type.into(),
            opset,
            inputs: Vec::new(),
            outputs: Vec::new(),
            attributes: Attributes::new(),
            operator: None,
        }
    }

    /// Append an input tensor
    pub fn with_input(mut self, tensor: Tensor) -> Self {
        self.inputs.push(tensor);
        self
    }

    /// Append an output tensor
    pub fn with_output(mut self, tensor: Tensor) -> Self {
        self.outputs.push(tensor);
        self
    }

    /// Replace the attribute set
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Whether an operator is currently bound
    pub fn is_bound(&self) -> bool {
        self.operator.is_some()
    }

    /// The bound operator, if any
    pub fn operator(&self) -> Option<&dyn Operator> {
        self.operator.as_deref()
    }

    /// Select a kernel for this node and initialize it.
    ///
    /// Any previously bound operator is released first. On failure the node
    /// is left unbound.
    pub fn bind(&mut self) -> Result<()> {
        self.unbind();

        let dtype = match self.inputs.first() {
            Some(x) => x.dtype(),
            None => {
                return Err(Error::InvalidArity {
                    op: "bind",
                    inputs: 0,
                    outputs: self.outputs.len(),
                })
            }
        };
        let init =
            ops::resolve(&self.op_type, self.opset, dtype).ok_or_else(|| {
                Error::UnsupportedOperator {
                    op_type: self.op_type.clone(),
                    opset: self.opset,
                    dtype,
                }
            })?;

        self.operator = Some(init(&*self)?);
        debug!(node = %self.name, op = %self.op_type, opset = self.opset, "bound node");
        Ok(())
    }

    /// Run shape inference, reshaping the outputs in place.
    pub fn reshape(&mut self) -> Result<()> {
        let Self {
            name,
            inputs,
            outputs,
            operator,
            ..
        } = self;
        match operator {
            Some(op) => op.reshape(inputs, outputs),
            None => Err(Error::NotBound { node: name.clone() }),
        }
    }

    /// Compute the outputs from the inputs.
    pub fn compute(&mut self) -> Result<()> {
        let Self {
            name,
            inputs,
            outputs,
            operator,
            ..
        } = self;
        match operator {
            Some(op) => op.compute(inputs, outputs),
            None => Err(Error::NotBound { node: name.clone() }),
        }
    }

    /// Reshape then compute, as one inference pass.
    pub fn run(&mut self) -> Result<()> {
        self.reshape()?;
        self.compute()
    }

    /// Release the bound operator. Does nothing on an unbound node.
    pub fn unbind(&mut self) {
        if let Some(op) = self.operator.take() {
            debug!(node = %self.name, op = op.name(), "unbound node");
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("op_type", &self.op_type)
            .field("opset", &self.opset)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("bound", &self.is_bound())
            .finish()
    }
}
