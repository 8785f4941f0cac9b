//! Storage: owned, zero-initialized CPU memory for tensor elements

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};

/// Backing words are 8 bytes wide so every supported element type can be
/// viewed in place without realignment.
type Word = u64;
const WORD_BYTES: usize = std::mem::size_of::<Word>();

/// Contiguous element buffer owned by a tensor
///
/// Memory is released when the storage is dropped.
#[derive(Clone, Default)]
pub struct Storage {
    words: Vec<Word>,
    /// Number of elements (not bytes)
    len: usize,
    dtype: Option<DType>,
}

impl Storage {
    /// Allocate `len` zeroed elements of `dtype`.
    ///
    /// Allocation is fallible; a failed reservation is reported as
    /// [`Error::OutOfMemory`] instead of aborting.
    pub fn zeroed(len: usize, dtype: DType) -> Result<Self> {
        let size = len
            .checked_mul(dtype.size_in_bytes())
            .ok_or(Error::OutOfMemory { size: usize::MAX })?;
        let nwords = size.div_ceil(WORD_BYTES);

        let mut words = Vec::new();
        words
            .try_reserve_exact(nwords)
            .map_err(|_| Error::OutOfMemory { size })?;
        words.resize(nwords, 0);

        Ok(Self {
            words,
            len,
            dtype: Some(dtype),
        })
    }

    /// Copy `data` into freshly allocated storage.
    pub fn from_slice<T: Element>(data: &[T]) -> Result<Self> {
        let mut storage = Self::zeroed(data.len(), T::DTYPE)?;
        storage.as_mut_slice::<T>()?.copy_from_slice(data);
        Ok(storage)
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the storage holds no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the element data in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.dtype.map_or(0, |d| d.size_in_bytes() * self.len)
    }

    /// Re-type the storage in place, keeping the allocation.
    ///
    /// Only valid when the byte size is unchanged.
    pub(crate) fn retype(&mut self, len: usize, dtype: DType) {
        debug_assert_eq!(len * dtype.size_in_bytes(), self.size_in_bytes());
        self.len = len;
        self.dtype = Some(dtype);
    }

    fn check<T: Element>(&self) -> Result<()> {
        match self.dtype {
            Some(d) if d == T::DTYPE => Ok(()),
            Some(d) => Err(Error::DTypeMismatch {
                lhs: d,
                rhs: T::DTYPE,
            }),
            // empty placeholder storage views as an empty slice of any type
            None => Ok(()),
        }
    }

    /// View the elements as a typed slice.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        self.check::<T>()?;
        let bytes: &[u8] = bytemuck::cast_slice(&self.words);
        Ok(bytemuck::cast_slice(&bytes[..self.len * std::mem::size_of::<T>()]))
    }

    /// View the elements as a mutable typed slice.
    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        self.check::<T>()?;
        let n = self.len * std::mem::size_of::<T>();
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words);
        Ok(bytemuck::cast_slice_mut(&mut bytes[..n]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use half::f16;

    #[test]
    fn test_zeroed_f16() {
        let storage = Storage::zeroed(3, DType::F16).unwrap();
        assert_eq!(storage.len(), 3);
        assert_eq!(storage.size_in_bytes(), 6);
        let data = storage.as_slice::<f16>().unwrap();
        assert!(data.iter().all(|v| v.to_f32() == 0.0));
    }

    #[test]
    fn test_from_slice_roundtrips_f64() {
        let storage = Storage::from_slice(&[1.0f64, -2.5, 3.25]).unwrap();
        assert_eq!(storage.as_slice::<f64>().unwrap(), &[1.0, -2.5, 3.25]);
    }

    #[test]
    fn test_wrong_view_is_rejected() {
        let storage = Storage::from_slice(&[1.0f32, 2.0]).unwrap();
        assert!(matches!(
            storage.as_slice::<f64>(),
            Err(Error::DTypeMismatch {
                lhs: DType::F32,
                rhs: DType::F64
            })
        ));
    }

    #[test]
    fn test_huge_allocation_fails_cleanly() {
        let result = Storage::zeroed(usize::MAX / 2, DType::F64);
        assert!(matches!(result, Err(Error::OutOfMemory { .. })));
    }
}
