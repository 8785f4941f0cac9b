//! The Conv operator.
//!
//! Binding a `Conv` node goes through three stages that map onto the node
//! lifecycle:
//!
//! ```text
//! Conv::<T>::init     (once)        attributes -> ConvParams
//! Operator::reshape   (per shape)   X, W shapes -> Y shape + effective pads
//! Operator::compute   (per pass)    X, W, B     -> Y
//! ```
//!
//! One generic operator is instantiated per supported element type
//! (`half::f16`, `f32`, `f64`); [`resolve`] picks the instantiation from the
//! first input's dtype.
//!
//! # Memory Layout
//!
//! - **Input**: (N, C, D1, ..., DK)
//! - **Weight**: (M, C/group, K1, ..., KK)
//! - **Bias**: (M,)
//! - **Output**: (N, M, O1, ..., OK)

pub mod kernel;
pub mod params;
pub mod shape;

pub use kernel::conv_nd;
pub use params::{AutoPad, ConvParams, MAX_PAD_SLOTS};
pub use shape::{infer_conv_shape, ConvShape};

use super::{InitFn, Operator};
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::graph::Node;
use crate::tensor::Tensor;
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Dispatch a block over the element types Conv is instantiated for
macro_rules! dispatch_conv_dtype {
    ($dtype:expr, $T:ident => $body:block) => {
        match $dtype {
            DType::F64 => {
                type $T = f64;
                $body
            }
            DType::F32 => {
                type $T = f32;
                $body
            }
            DType::F16 => {
                type $T = half::f16;
                $body
            }
            _ => None,
        }
    };
}

/// Select the Conv initializer for an element type.
pub fn resolve(dtype: DType) -> Option<InitFn> {
    dispatch_conv_dtype!(dtype, T => { Some(Conv::<T>::boxed as InitFn) })
}

/// Conv bound to one node, computing in element type `T`.
#[derive(Debug)]
pub struct Conv<T: Element> {
    params: ConvParams,
    /// Pads from the most recent reshape, begins first
    effective_pads: Vec<i64>,
    _marker: PhantomData<T>,
}

impl<T: Element> Conv<T> {
    /// Check the node's arity and read its configuration.
    ///
    /// Requires at least two inputs (X, W) and exactly one output.
    pub fn init(node: &Node) -> Result<Self> {
        if node.inputs.len() < 2 || node.outputs.len() != 1 {
            return Err(Error::InvalidArity {
                op: "Conv",
                inputs: node.inputs.len(),
                outputs: node.outputs.len(),
            });
        }

        let params = ConvParams::from_attributes(&node.attributes)?;
        let effective_pads = params.pads.clone();
        debug!(
            node = %node.name,
            dtype = %T::DTYPE,
            auto_pad = params.auto_pad.as_str(),
            group = params.group,
            kernel_shape = ?params.kernel_shape,
            "initialized Conv"
        );

        Ok(Self {
            params,
            effective_pads,
            _marker: PhantomData,
        })
    }

    fn boxed(node: &Node) -> Result<Box<dyn Operator>> {
        Ok(Box::new(Self::init(node)?))
    }

    /// Resolved configuration.
    pub fn params(&self) -> &ConvParams {
        &self.params
    }

    /// Pads applied by the next compute, as of the last reshape.
    pub fn effective_pads(&self) -> &[i64] {
        &self.effective_pads
    }
}

/// Split the node inputs into X, W and optional B.
fn operands(inputs: &[Tensor]) -> Result<(&Tensor, &Tensor, Option<&Tensor>)> {
    match inputs {
        [x, w] => Ok((x, w, None)),
        [x, w, b, ..] => Ok((x, w, Some(b))),
        _ => Err(Error::InvalidArity {
            op: "Conv",
            inputs: inputs.len(),
            outputs: 1,
        }),
    }
}

fn single_output(outputs: &mut [Tensor]) -> Result<&mut Tensor> {
    let count = outputs.len();
    match outputs {
        [y] => Ok(y),
        _ => Err(Error::InvalidArity {
            op: "Conv",
            inputs: 2,
            outputs: count,
        }),
    }
}

impl<T: Element> Operator for Conv<T> {
    fn name(&self) -> &'static str {
        "Conv"
    }

    fn reshape(&mut self, inputs: &[Tensor], outputs: &mut [Tensor]) -> Result<()> {
        let (x, w, _) = operands(inputs)?;
        let y = single_output(outputs)?;

        let ConvShape { output, pads } = infer_conv_shape(&self.params, x.shape(), w.shape())?;
        trace!(x = ?x.shape(), y = ?output, pads = ?pads, "Conv shape inference");

        self.effective_pads = pads;
        y.reshape(&output, x.dtype())
    }

    fn compute(&self, inputs: &[Tensor], outputs: &mut [Tensor]) -> Result<()> {
        let (x, w, bias) = operands(inputs)?;
        let y = single_output(outputs)?;
        trace!(y = ?y.shape(), "Conv compute");
        conv_nd::<T>(&self.params, &self.effective_pads, x, w, bias, y)
    }
}
