//! Odometer-style traversal of N-dimensional index spaces.
//!
//! `advance` steps an index vector through every coordinate of a box in
//! row-major order and `flatten` maps a coordinate to its linear offset.
//! Both are iterative, so rank is bounded only by the slices passed in.

/// Step `index` to the next coordinate inside `bounds`.
///
/// The last axis moves fastest. When an axis overflows it is reset to 0 and
/// the carry moves to the axis before it. Returns `false` once the first axis
/// overflows, i.e. after the final coordinate has been visited. A rank-0
/// index has exactly one (empty) coordinate, so it returns `false` immediately.
///
/// `index` and `bounds` must have the same length.
#[inline]
pub fn advance(index: &mut [usize], bounds: &[usize]) -> bool {
    debug_assert_eq!(index.len(), bounds.len());
    let mut axis = index.len();
    while axis > 0 {
        axis -= 1;
        index[axis] += 1;
        if index[axis] < bounds[axis] {
            return true;
        }
        if axis == 0 {
            return false;
        }
        index[axis] = 0;
    }
    false
}

/// Row-major linear offset of `index` within an array shaped `bounds`.
#[inline]
pub fn flatten(index: &[usize], bounds: &[usize]) -> usize {
    debug_assert_eq!(index.len(), bounds.len());
    let mut offset = 0;
    let mut stride = 1;
    for (&i, &extent) in index.iter().zip(bounds).rev() {
        offset += i * stride;
        stride *= extent;
    }
    offset
}
