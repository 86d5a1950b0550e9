//! Layout: shape and row-major strides for tensor memory

use super::shape::{Shape, STACK_DIMS};
use smallvec::SmallVec;
use std::fmt;

/// Strides type: element offsets between consecutive indices along each dimension
///
/// NOTE: Strides are in ELEMENTS, not bytes
pub type Strides = SmallVec<[usize; STACK_DIMS]>;

/// Layout describes the memory layout of a tensor
///
/// All convr buffers are contiguous and row-major: dimension 0 is the
/// slowest-varying and the last dimension is contiguous in memory. The
/// layout turns an index tuple into a linear element offset:
///
/// Address of element at indices [i0, i1, ..., in]:
///   i0 * strides[0] + i1 * strides[1] + ... + in * strides[n]
///
/// This replaces the nested pointer-per-dimension representation of the
/// classical "array of arrays" tensor: one flat buffer, explicit strides,
/// no mirrored recursive alloc/free.
#[derive(Clone, PartialEq, Eq)]
pub struct Layout {
    shape: Shape,
    strides: Strides,
}

impl Layout {
    /// Create a contiguous row-major layout from a shape
    ///
    /// # Example
    /// ```
    /// use convr::tensor::Layout;
    /// let layout = Layout::contiguous(&[2, 3, 4]);
    /// assert_eq!(layout.shape(), &[2, 3, 4]);
    /// assert_eq!(layout.strides(), &[12, 4, 1]);
    /// ```
    pub fn contiguous(shape: &[usize]) -> Self {
        let shape: Shape = shape.iter().copied().collect();
        let strides = Self::compute_strides(&shape);
        Self { shape, strides }
    }

    /// Compute contiguous strides for a given shape (row-major order)
    fn compute_strides(shape: &[usize]) -> Strides {
        let mut strides: Strides = SmallVec::with_capacity(shape.len());
        let mut stride = 1usize;

        // Last dimension varies fastest
        for &dim in shape.iter().rev() {
            strides.push(stride);
            stride *= dim;
        }

        strides.reverse();
        strides
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Number of dimensions (rank)
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    #[inline]
    pub fn elem_count(&self) -> usize {
        self.shape.elem_count()
    }

    /// Compute the linear element offset for given indices
    ///
    /// Returns `None` if the index tuple has the wrong rank or any index
    /// is out of bounds.
    pub fn index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.ndim() {
            return None;
        }

        for (idx, &dim) in indices.iter().zip(self.shape.iter()) {
            if *idx >= dim {
                return None;
            }
        }

        let mut linear = 0usize;
        for (&idx, &stride) in indices.iter().zip(self.strides.iter()) {
            linear += idx * stride;
        }

        Some(linear)
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Layout {{ shape: {:?}, strides: {:?} }}",
            self.shape.as_slice(),
            self.strides.as_slice()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_layout() {
        let layout = Layout::contiguous(&[2, 3, 4]);
        assert_eq!(layout.shape(), &[2, 3, 4]);
        assert_eq!(layout.strides(), &[12, 4, 1]);
        assert_eq!(layout.elem_count(), 24);
    }

    #[test]
    fn test_rank_one() {
        let layout = Layout::contiguous(&[7]);
        assert_eq!(layout.strides(), &[1]);
        assert_eq!(layout.index(&[6]), Some(6));
        assert_eq!(layout.index(&[7]), None);
    }

    #[test]
    fn test_index() {
        let layout = Layout::contiguous(&[2, 3]);
        assert_eq!(layout.index(&[0, 0]), Some(0));
        assert_eq!(layout.index(&[0, 2]), Some(2));
        assert_eq!(layout.index(&[1, 0]), Some(3));
        assert_eq!(layout.index(&[1, 2]), Some(5));
        assert_eq!(layout.index(&[2, 0]), None); // Out of bounds
        assert_eq!(layout.index(&[1]), None); // Wrong rank
    }

    #[test]
    fn test_channel_last_image() {
        // [height][width][channel]: channel varies fastest
        let layout = Layout::contiguous(&[64, 64, 3]);
        assert_eq!(layout.strides(), &[192, 3, 1]);
        assert_eq!(layout.index(&[1, 0, 0]), Some(192));
        assert_eq!(layout.index(&[0, 1, 2]), Some(5));
    }
}
