//! Max-pooling layer

use super::slot::TensorSlot;
use super::{LayerKind, Strategy};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::kernels::pool::{maxpool2d_naive, Pool2dDims};
use crate::kernels::simd::pool::maxpool2d_simd;
use crate::tensor::{TensorBuffer, TensorSpec};

/// Default pooling window edge (and stride)
pub const DEFAULT_POOL: usize = 2;

/// Max-pooling layer over non-overlapping square windows
///
/// Window edge and stride are the same configured value (default 2), so
/// spatial dims shrink by that factor and the channel count is preserved.
pub struct MaxPool2dLayer<T: Element> {
    input_spec: TensorSpec,
    output_spec: TensorSpec,
    output: TensorSlot<T>,
    dims: Pool2dDims,
}

impl<T: Element> MaxPool2dLayer<T> {
    /// Build a max-pooling layer with the default 2x2 window
    pub fn new(input_spec: TensorSpec, output_spec: TensorSpec) -> Result<Self> {
        Self::with_pool(input_spec, output_spec, DEFAULT_POOL)
    }

    /// Build a max-pooling layer with an explicit window edge
    pub fn with_pool(
        input_spec: TensorSpec,
        output_spec: TensorSpec,
        pool: usize,
    ) -> Result<Self> {
        if pool == 0 {
            return Err(Error::invalid_argument("pool", "window edge must be > 0"));
        }
        if input_spec.rank() != 3 {
            return Err(Error::invalid_argument(
                "input_spec",
                format!("pooling input must be [h][w][c], got {}", input_spec),
            ));
        }

        let (in_h, in_w, channels) =
            (input_spec.dims()[0], input_spec.dims()[1], input_spec.dims()[2]);
        let out_h = in_h / pool;
        let out_w = in_w / pool;
        if out_h == 0 || out_w == 0 {
            return Err(Error::invalid_argument(
                "pool",
                format!("window {} exceeds input {}x{}", pool, in_h, in_w),
            ));
        }
        if output_spec.dims() != [out_h, out_w, channels] {
            return Err(Error::shape_mismatch(
                &[out_h, out_w, channels],
                output_spec.dims(),
            ));
        }

        Ok(Self {
            dims: Pool2dDims {
                in_h,
                in_w,
                channels,
                pool,
                out_h,
                out_w,
            },
            output: TensorSlot::new(output_spec.clone())?,
            input_spec,
            output_spec,
        })
    }

    /// The declared input spec
    pub fn input_spec(&self) -> &TensorSpec {
        &self.input_spec
    }

    /// The declared output spec
    pub fn output_spec(&self) -> &TensorSpec {
        &self.output_spec
    }

    /// The configured window edge
    pub fn pool(&self) -> usize {
        self.dims.pool
    }

    /// Whether the output buffer is materialized
    pub fn is_allocated(&self) -> bool {
        self.output.is_allocated()
    }

    /// Allocate the output buffer
    pub fn allocate(&mut self) -> Result<()> {
        self.output.allocate()
    }

    /// Free the output buffer
    pub fn free(&mut self) -> Result<()> {
        self.output.free()
    }

    /// The computed output buffer
    pub fn output(&self) -> Result<&TensorBuffer<T>> {
        self.output.buffer()
    }

    pub(super) fn validate_input(&self, input: &TensorBuffer<T>) -> Result<()> {
        if input.shape() != self.input_spec.dims() {
            return Err(Error::shape_mismatch(self.input_spec.dims(), input.shape()));
        }
        Ok(())
    }

    /// Run max pooling with the selected strategy
    ///
    /// There is no tiled variant: pooling is a single-pass, memory-bound
    /// reduce with nothing to re-use across tiles, so requesting it is an
    /// `UnsupportedStrategy` error.
    pub fn forward(&mut self, input: &TensorBuffer<T>, strategy: Strategy) -> Result<()> {
        self.validate_input(input)?;
        if !self.is_allocated() {
            return Err(Error::allocation_state("compute with", "unallocated"));
        }

        let output = self.output.buffer_mut()?.as_mut_slice();
        let d = &self.dims;

        match strategy {
            Strategy::Naive => maxpool2d_naive(input.as_slice(), output, d),
            Strategy::Simd => maxpool2d_simd(input.as_slice(), output, d),
            Strategy::Threaded => {
                #[cfg(feature = "rayon")]
                crate::kernels::pool::maxpool2d_threaded(input.as_slice(), output, d);
                #[cfg(not(feature = "rayon"))]
                return Err(Error::unsupported_strategy(LayerKind::MaxPool2d, strategy));
            }
            Strategy::Tiled => {
                return Err(Error::unsupported_strategy(LayerKind::MaxPool2d, strategy));
            }
        }

        tracing::trace!(
            kind = %LayerKind::MaxPool2d,
            %strategy,
            out = %self.output_spec,
            "layer forward"
        );
        Ok(())
    }
}
