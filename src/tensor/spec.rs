//! TensorSpec: immutable description of a tensor's dtype, shape, and source

use super::Shape;
use crate::dtype::DType;
use std::fmt;
use std::path::{Path, PathBuf};

/// Immutable description of a tensor: element type, dimension list, and an
/// optional source file holding its data
///
/// A spec describes a buffer without owning one. Layers carry a spec per
/// input, output, weight, and bias buffer; weight and bias specs usually
/// also carry the path of the binary file the data is loaded from.
#[derive(Clone, PartialEq, Eq)]
pub struct TensorSpec {
    dtype: DType,
    shape: Shape,
    source: Option<PathBuf>,
}

impl TensorSpec {
    /// Create a spec with no source file
    pub fn new(dtype: DType, shape: impl Into<Shape>) -> Self {
        Self {
            dtype,
            shape: shape.into(),
            source: None,
        }
    }

    /// Create a spec whose data lives in a binary file
    pub fn with_source(dtype: DType, shape: impl Into<Shape>, source: impl Into<PathBuf>) -> Self {
        Self {
            dtype,
            shape: shape.into(),
            source: Some(source.into()),
        }
    }

    /// Element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Dimension list
    #[inline]
    pub fn dims(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements
    #[inline]
    pub fn elem_count(&self) -> usize {
        self.shape.elem_count()
    }

    /// Total size of the described buffer in bytes
    #[inline]
    pub fn size_in_bytes(&self) -> usize {
        self.elem_count() * self.dtype.size_in_bytes()
    }

    /// Source file path, if the data lives on disk
    #[inline]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Whether another spec describes a structurally identical buffer
    ///
    /// True iff the element sizes match and the dims match pairwise in
    /// count and value. There is no batch-dimension elision; the only
    /// relaxation in the engine is the dense layer's flatten rule, which
    /// lives in the layer, not here.
    pub fn is_compatible(&self, other: &TensorSpec) -> bool {
        self.dtype.size_in_bytes() == other.dtype.size_in_bytes()
            && self.shape.as_slice() == other.shape.as_slice()
    }
}

impl fmt::Debug for TensorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorSpec")
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for TensorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.dtype, self.shape.as_slice())
    }
}
