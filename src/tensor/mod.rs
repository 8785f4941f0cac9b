//! Tensor types
//!
//! This module provides the `Tensor` container kernels operate on, and the
//! index helpers used to walk N-dimensional coordinate spaces.

mod core;
pub mod index;
mod shape;
mod storage;

pub use core::Tensor;
pub use shape::Shape;
pub use storage::Storage;
