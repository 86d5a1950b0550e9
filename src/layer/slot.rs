//! TensorSlot: a spec-described buffer with an explicit lifecycle

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::tensor::{fill_from_file, TensorBuffer, TensorSpec};

/// A tensor buffer slot owned by a layer: output, weights, or bias
///
/// Created Unallocated (descriptor only); the buffer materializes on
/// [`allocate`](Self::allocate) or [`load`](Self::load) and is destroyed
/// by [`free`](Self::free). Allocating twice or freeing while unallocated
/// are caller defects reported as `AllocationState` errors; the slot is
/// left untouched in either case.
#[derive(Debug)]
pub struct TensorSlot<T: Element> {
    spec: TensorSpec,
    data: Option<TensorBuffer<T>>,
}

impl<T: Element> TensorSlot<T> {
    /// Create an unallocated slot for a spec
    ///
    /// The element type is checked against the spec's dtype up front, so
    /// a mistyped view can never exist.
    pub fn new(spec: TensorSpec) -> Result<Self> {
        if T::DTYPE != spec.dtype() {
            return Err(Error::invalid_argument(
                "spec",
                format!("element type {} does not match spec {}", T::DTYPE, spec),
            ));
        }
        Ok(Self { spec, data: None })
    }

    /// The spec describing this slot
    #[inline]
    pub fn spec(&self) -> &TensorSpec {
        &self.spec
    }

    /// Whether the buffer is currently materialized
    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.data.is_some()
    }

    /// Materialize a zero-initialized buffer matching the spec
    pub fn allocate(&mut self) -> Result<()> {
        if self.data.is_some() {
            return Err(Error::allocation_state("allocate", "already allocated"));
        }
        self.data = Some(TensorBuffer::zeros(self.spec.dims())?);
        Ok(())
    }

    /// Fill the buffer from the spec's source file
    ///
    /// Allocates first if needed; an already-loaded slot is refilled in
    /// place (reloading is legal). Fails with `InvalidArgument` when the
    /// spec carries no source path, and with an I/O error on a missing
    /// file or short read - never zero-filling silently.
    pub fn load(&mut self) -> Result<()> {
        let path = self
            .spec
            .source()
            .ok_or_else(|| Error::invalid_argument("spec", "no source path to load from"))?
            .to_path_buf();

        if self.data.is_none() {
            self.data = Some(TensorBuffer::zeros(self.spec.dims())?);
        }
        fill_from_file(&path, self.data.as_mut().expect("just allocated"))
    }

    /// Release the buffer, returning to the Unallocated state
    pub fn free(&mut self) -> Result<()> {
        if self.data.is_none() {
            return Err(Error::allocation_state("free", "unallocated"));
        }
        self.data = None;
        Ok(())
    }

    /// Borrow the buffer
    pub fn buffer(&self) -> Result<&TensorBuffer<T>> {
        self.data
            .as_ref()
            .ok_or_else(|| Error::allocation_state("read", "unallocated"))
    }

    /// Borrow the buffer mutably
    pub fn buffer_mut(&mut self) -> Result<&mut TensorBuffer<T>> {
        self.data
            .as_mut()
            .ok_or_else(|| Error::allocation_state("write", "unallocated"))
    }
}
