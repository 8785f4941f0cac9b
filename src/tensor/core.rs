//! Core Tensor type

use super::{Shape, Storage};
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use std::fmt;

/// N-dimensional array in contiguous, row-major CPU memory
///
/// `Tensor` is the container kernels read from and write to. It consists of:
/// - **Storage**: owned element buffer
/// - **Shape**: per-axis extents, last axis contiguous
/// - **DType**: element type (determined at runtime)
///
/// Output tensors are usually created as a [`Tensor::placeholder`] and given
/// their real shape by an operator's shape inference through [`Tensor::reshape`].
///
/// # Example
///
/// ```
/// use convnd::tensor::Tensor;
///
/// let x = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[1, 1, 4]).unwrap();
/// assert_eq!(x.shape(), &[1, 1, 4]);
/// assert_eq!(x.numel(), 4);
/// ```
#[derive(Clone)]
pub struct Tensor {
    dtype: DType,
    shape: Shape,
    storage: Storage,
}

impl Tensor {
    /// Create a tensor from a slice of data
    ///
    /// Returns an error if `data.len()` does not equal the product of the `shape`
    /// extents, or if memory allocation fails.
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize]) -> Result<Self> {
        let shape = Shape::from(shape);
        if shape.checked_numel() != Some(data.len()) {
            return Err(Error::invalid_argument(
                "data",
                format!("{} elements cannot fill shape {:?}", data.len(), shape),
            ));
        }
        Ok(Self {
            dtype: T::DTYPE,
            shape,
            storage: Storage::from_slice(data)?,
        })
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: &[usize], dtype: DType) -> Result<Self> {
        let shape = Shape::from(shape);
        let storage = Storage::zeroed(element_count(&shape)?, dtype)?;
        Ok(Self {
            dtype,
            shape,
            storage,
        })
    }

    /// Create an unshaped output tensor of the given element type
    ///
    /// The placeholder has shape `[0]` and owns no memory until it is reshaped.
    pub fn placeholder(dtype: DType) -> Self {
        Self {
            dtype,
            shape: Shape::from([0]),
            storage: Storage::default(),
        }
    }

    /// Get the element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the number of dimensions (rank)
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Get the total number of elements
    ///
    /// Always the product of [`Tensor::shape`]; storage is sized to match.
    #[inline]
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Reshape in place to `dims` with element type `dtype`
    ///
    /// The allocation is reused when the byte size is unchanged and replaced by a
    /// zero-filled one otherwise. Existing contents are not preserved across a
    /// type change.
    pub fn reshape(&mut self, dims: &[usize], dtype: DType) -> Result<()> {
        let shape = Shape::from(dims);
        let numel = element_count(&shape)?;
        let bytes = numel
            .checked_mul(dtype.size_in_bytes())
            .ok_or(Error::OutOfMemory { size: usize::MAX })?;

        if bytes == self.storage.size_in_bytes() {
            self.storage.retype(numel, dtype);
        } else {
            self.storage = Storage::zeroed(numel, dtype)?;
        }
        self.shape = shape;
        self.dtype = dtype;
        Ok(())
    }

    /// Borrow the elements as a typed slice
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        self.expect_dtype::<T>()?;
        self.storage.as_slice()
    }

    /// Borrow the elements as a mutable typed slice
    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        self.expect_dtype::<T>()?;
        self.storage.as_mut_slice()
    }

    /// Copy the elements out as a `Vec<T>`
    pub fn to_vec<T: Element>(&self) -> Result<Vec<T>> {
        Ok(self.as_slice::<T>()?.to_vec())
    }

    /// Copy the elements out as `f64`, whatever the element type
    pub fn to_f64_vec(&self) -> Result<Vec<f64>> {
        match self.dtype {
            DType::F64 => self.collect_f64::<f64>(),
            DType::F32 => self.collect_f64::<f32>(),
            DType::F16 => self.collect_f64::<half::f16>(),
            DType::I64 => self.collect_f64::<i64>(),
            DType::I32 => self.collect_f64::<i32>(),
        }
    }

    fn collect_f64<T: Element>(&self) -> Result<Vec<f64>> {
        Ok(self.as_slice::<T>()?.iter().map(|v| v.to_f64()).collect())
    }

    fn expect_dtype<T: Element>(&self) -> Result<()> {
        if self.dtype != T::DTYPE {
            return Err(Error::DTypeMismatch {
                lhs: self.dtype,
                rhs: T::DTYPE,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .finish()
    }
}

fn element_count(shape: &Shape) -> Result<usize> {
    shape
        .checked_numel()
        .ok_or(Error::OutOfMemory { size: usize::MAX })
}
