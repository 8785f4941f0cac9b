//! Element trait for mapping Rust types to DType

use super::DType;
use bytemuck::{Pod, Zeroable};
use num_traits::Zero;
use std::fmt::Debug;
use std::ops::{Add, Mul};

/// Trait for types that can be elements of a tensor
///
/// This trait connects Rust's type system to the runtime dtype system, and
/// fixes the type a kernel accumulates in for each element type.
///
/// # Bounds
/// - `Copy + Send + Sync + 'static` - Basic trait requirements
/// - `Pod + Zeroable` - Safe memory transmutation (bytemuck)
///
/// # Accumulation
///
/// Reduced-precision types widen into a wider `Accum` on load and narrow back
/// on store. `half::f16` accumulates in `f32`; every other type accumulates in
/// itself.
pub trait Element: Copy + Send + Sync + Pod + Zeroable + Debug + 'static {
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Type products are summed in
    type Accum: Copy + Send + Sync + Zero + Add<Output = Self::Accum> + Mul<Output = Self::Accum>;

    /// Widen a stored value into the accumulator type
    fn widen(self) -> Self::Accum;

    /// Narrow an accumulated value back into the storage type
    fn narrow(acc: Self::Accum) -> Self;

    /// Convert to f64 for generic numeric comparisons
    fn to_f64(self) -> f64;
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;
    type Accum = f64;

    #[inline]
    fn widen(self) -> f64 {
        self
    }

    #[inline]
    fn narrow(acc: f64) -> Self {
        acc
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;
    type Accum = f32;

    #[inline]
    fn widen(self) -> f32 {
        self
    }

    #[inline]
    fn narrow(acc: f32) -> Self {
        acc
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Element for half::f16 {
    const DTYPE: DType = DType::F16;
    type Accum = f32;

    #[inline]
    fn widen(self) -> f32 {
        self.to_f32()
    }

    #[inline]
    fn narrow(acc: f32) -> Self {
        half::f16::from_f32(acc)
    }

    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl Element for i64 {
    const DTYPE: DType = DType::I64;
    type Accum = i64;

    #[inline]
    fn widen(self) -> i64 {
        self
    }

    #[inline]
    fn narrow(acc: i64) -> Self {
        acc
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Element for i32 {
    const DTYPE: DType = DType::I32;
    type Accum = i32;

    #[inline]
    fn widen(self) -> i32 {
        self
    }

    #[inline]
    fn narrow(acc: i32) -> Self {
        acc
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }
}
