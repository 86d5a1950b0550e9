//! TensorBuffer: flat contiguous tensor storage

use super::Layout;
use crate::dtype::Element;
use crate::error::{Error, Result};

/// N-dimensional numeric array backed by one flat contiguous allocation
///
/// The logical shape is carried by a row-major [`Layout`]; every element
/// access goes through its offset arithmetic. `Clone` is a deep copy of
/// the leaf elements, and `Drop` releases the single allocation - there
/// is no per-dimension bookkeeping to mirror.
#[derive(Clone, PartialEq)]
pub struct TensorBuffer<T: Element> {
    data: Vec<T>,
    layout: Layout,
}

impl<T: Element> TensorBuffer<T> {
    /// Allocate a zero-initialized buffer for a shape
    ///
    /// Rank must be at least 1 and no dimension may be zero.
    pub fn zeros(shape: &[usize]) -> Result<Self> {
        validate_shape(shape)?;
        let layout = Layout::contiguous(shape);
        Ok(Self {
            data: vec![T::zero(); layout.elem_count()],
            layout,
        })
    }

    /// Build a buffer from existing elements in row-major order
    pub fn from_vec(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        validate_shape(shape)?;
        let layout = Layout::contiguous(shape);
        if data.len() != layout.elem_count() {
            return Err(Error::invalid_argument(
                "data",
                format!(
                    "expected {} elements for shape {:?}, got {}",
                    layout.elem_count(),
                    shape,
                    data.len()
                ),
            ));
        }
        Ok(Self { data, layout })
    }

    /// Build a buffer by copying a slice of row-major elements
    pub fn from_slice(data: &[T], shape: &[usize]) -> Result<Self> {
        Self::from_vec(data.to_vec(), shape)
    }

    /// The memory layout
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The logical shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    /// Total number of elements
    #[inline]
    pub fn elem_count(&self) -> usize {
        self.data.len()
    }

    /// The elements in row-major order
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The elements in row-major order, mutable
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Read the element at an index tuple
    ///
    /// Returns `None` on rank mismatch or out-of-bounds index.
    pub fn get(&self, indices: &[usize]) -> Option<T> {
        self.layout.index(indices).map(|i| self.data[i])
    }

    /// Write the element at an index tuple
    ///
    /// Returns `None` (and leaves the buffer untouched) on rank mismatch
    /// or out-of-bounds index.
    pub fn set(&mut self, indices: &[usize], value: T) -> Option<()> {
        let i = self.layout.index(indices)?;
        self.data[i] = value;
        Some(())
    }

    /// Deep-copy the elements of `src` into this buffer
    ///
    /// Shapes must match exactly; no aliasing of structure is possible
    /// since each buffer owns its flat storage.
    pub fn copy_from(&mut self, src: &TensorBuffer<T>) -> Result<()> {
        if self.shape() != src.shape() {
            return Err(Error::shape_mismatch(self.shape(), src.shape()));
        }
        self.data.copy_from_slice(&src.data);
        Ok(())
    }

    /// Maximum absolute elementwise difference between two tensors
    ///
    /// Zero iff the tensors are elementwise identical. Symmetric in its
    /// arguments. Shapes must match; comparing buffers of different
    /// shapes is a `ShapeMismatch` error raised here, not a corrupted
    /// result discovered later.
    pub fn max_abs_diff(&self, other: &TensorBuffer<T>) -> Result<f64> {
        if self.shape() != other.shape() {
            return Err(Error::shape_mismatch(self.shape(), other.shape()));
        }

        let mut max_diff = 0.0f64;
        for (a, b) in self.data.iter().zip(other.data.iter()) {
            let diff = (a.to_f64() - b.to_f64()).abs();
            if diff > max_diff {
                max_diff = diff;
            }
        }
        Ok(max_diff)
    }

    /// Whether the maximum absolute difference is strictly below `epsilon`
    pub fn all_close(&self, other: &TensorBuffer<T>, epsilon: f64) -> Result<bool> {
        Ok(epsilon > self.max_abs_diff(other)?)
    }
}

impl<T: Element> std::fmt::Debug for TensorBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TensorBuffer")
            .field("dtype", &T::DTYPE)
            .field("shape", &self.layout.shape())
            .field("elems", &self.data.len())
            .finish()
    }
}

fn validate_shape(shape: &[usize]) -> Result<()> {
    if shape.is_empty() {
        return Err(Error::invalid_argument("shape", "rank must be at least 1"));
    }
    if shape.iter().any(|&d| d == 0) {
        return Err(Error::invalid_argument(
            "shape",
            format!("zero-size dimension in {:?}", shape),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let t = TensorBuffer::<f32>::zeros(&[2, 3]).unwrap();
        assert_eq!(t.shape(), &[2, 3]);
        assert_eq!(t.elem_count(), 6);
        assert!(t.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(TensorBuffer::<f32>::zeros(&[2, 0, 3]).is_err());
        assert!(TensorBuffer::<f32>::zeros(&[]).is_err());
    }

    #[test]
    fn test_from_vec_length_check() {
        assert!(TensorBuffer::<f32>::from_vec(vec![1.0; 5], &[2, 3]).is_err());
        assert!(TensorBuffer::<f32>::from_vec(vec![1.0; 6], &[2, 3]).is_ok());
    }

    #[test]
    fn test_get_set() {
        let mut t = TensorBuffer::<f32>::zeros(&[2, 2, 2]).unwrap();
        t.set(&[1, 0, 1], 7.5).unwrap();
        assert_eq!(t.get(&[1, 0, 1]), Some(7.5));
        assert_eq!(t.get(&[0, 0, 0]), Some(0.0));
        assert_eq!(t.get(&[2, 0, 0]), None);
        assert!(t.set(&[0, 2, 0], 1.0).is_none());
    }

    #[test]
    fn test_copy_is_deep() {
        let src = TensorBuffer::<f32>::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let mut dst = TensorBuffer::<f32>::zeros(&[2, 2]).unwrap();
        dst.copy_from(&src).unwrap();
        assert_eq!(dst.as_slice(), src.as_slice());

        dst.set(&[0, 0], 9.0).unwrap();
        assert_eq!(src.get(&[0, 0]), Some(1.0));
    }

    #[test]
    fn test_copy_shape_mismatch() {
        let src = TensorBuffer::<f32>::zeros(&[2, 2]).unwrap();
        let mut dst = TensorBuffer::<f32>::zeros(&[4]).unwrap();
        assert!(matches!(
            dst.copy_from(&src),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_max_abs_diff_self_is_zero() {
        let t = TensorBuffer::<f32>::from_vec(vec![0.25, -3.5, 8.0, 1.0], &[4]).unwrap();
        assert_eq!(t.max_abs_diff(&t).unwrap(), 0.0);
        assert!(t.all_close(&t, 1e-12).unwrap());
    }

    #[test]
    fn test_max_abs_diff_symmetric() {
        let a = TensorBuffer::<f32>::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
        let b = TensorBuffer::<f32>::from_vec(vec![1.5, 1.0, 3.25], &[3]).unwrap();
        let ab = a.max_abs_diff(&b).unwrap();
        let ba = b.max_abs_diff(&a).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab, 1.0);
    }

    #[test]
    fn test_all_close_strict() {
        let a = TensorBuffer::<f32>::from_vec(vec![0.0], &[1]).unwrap();
        let b = TensorBuffer::<f32>::from_vec(vec![0.5], &[1]).unwrap();
        // epsilon > diff must be strict
        assert!(!a.all_close(&b, 0.5).unwrap());
        assert!(a.all_close(&b, 0.5 + 1e-6).unwrap());
    }

    #[test]
    fn test_compare_shape_mismatch() {
        let a = TensorBuffer::<f32>::zeros(&[2, 3]).unwrap();
        let b = TensorBuffer::<f32>::zeros(&[3, 2]).unwrap();
        assert!(matches!(
            a.max_abs_diff(&b),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
