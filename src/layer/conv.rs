//! Convolutional layer

use super::slot::TensorSlot;
use super::{LayerKind, Strategy};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::kernels::conv::{conv2d_naive, conv2d_tiled, Conv2dDims};
use crate::kernels::simd::conv::conv2d_simd;
use crate::tensor::{TensorBuffer, TensorSpec};

/// 2-D convolution over a channel-last `[h][w][c]` input
///
/// Weights are `[filter_h][filter_w][c_in][c_out]`, bias is `[c_out]`;
/// stride 1, no padding, so the output is `[h-fh+1][w-fw+1][c_out]`.
/// All four buffer geometries are cross-checked at construction; a spec
/// set that disagrees never becomes a layer.
pub struct Conv2dLayer<T: Element> {
    input_spec: TensorSpec,
    output_spec: TensorSpec,
    weights: TensorSlot<T>,
    bias: TensorSlot<T>,
    output: TensorSlot<T>,
    dims: Conv2dDims,
}

impl<T: Element> Conv2dLayer<T> {
    /// Build a convolutional layer from its four buffer specs
    pub fn new(
        input_spec: TensorSpec,
        output_spec: TensorSpec,
        weight_spec: TensorSpec,
        bias_spec: TensorSpec,
    ) -> Result<Self> {
        if input_spec.rank() != 3 {
            return Err(Error::invalid_argument(
                "input_spec",
                format!("conv input must be [h][w][c], got {}", input_spec),
            ));
        }
        if weight_spec.rank() != 4 {
            return Err(Error::invalid_argument(
                "weight_spec",
                format!("conv weights must be [fh][fw][c_in][c_out], got {}", weight_spec),
            ));
        }
        if bias_spec.rank() != 1 {
            return Err(Error::invalid_argument(
                "bias_spec",
                format!("conv bias must be [c_out], got {}", bias_spec),
            ));
        }

        let (in_h, in_w, c_in) = (input_spec.dims()[0], input_spec.dims()[1], input_spec.dims()[2]);
        let (filter_h, filter_w) = (weight_spec.dims()[0], weight_spec.dims()[1]);
        let c_out = weight_spec.dims()[3];

        if weight_spec.dims()[2] != c_in {
            return Err(Error::shape_mismatch(
                &[filter_h, filter_w, c_in, c_out],
                weight_spec.dims(),
            ));
        }
        if bias_spec.dims() != [c_out] {
            return Err(Error::shape_mismatch(&[c_out], bias_spec.dims()));
        }
        if filter_h > in_h || filter_w > in_w {
            return Err(Error::invalid_argument(
                "weight_spec",
                format!("filter {}x{} exceeds input {}x{}", filter_h, filter_w, in_h, in_w),
            ));
        }

        let out_h = in_h - filter_h + 1;
        let out_w = in_w - filter_w + 1;
        if output_spec.dims() != [out_h, out_w, c_out] {
            return Err(Error::shape_mismatch(
                &[out_h, out_w, c_out],
                output_spec.dims(),
            ));
        }

        Ok(Self {
            dims: Conv2dDims {
                in_h,
                in_w,
                c_in,
                filter_h,
                filter_w,
                c_out,
                out_h,
                out_w,
            },
            weights: TensorSlot::new(weight_spec)?,
            bias: TensorSlot::new(bias_spec)?,
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

    /// The weight slot
    pub fn weights(&self) -> &TensorSlot<T> {
        &self.weights
    }

    /// The bias slot
    pub fn bias(&self) -> &TensorSlot<T> {
        &self.bias
    }

    /// The weight slot, mutable (for populating in-memory weights)
    pub fn weights_mut(&mut self) -> &mut TensorSlot<T> {
        &mut self.weights
    }

    /// The bias slot, mutable
    pub fn bias_mut(&mut self) -> &mut TensorSlot<T> {
        &mut self.bias
    }

    /// Whether output, weights, and bias buffers are all materialized
    pub fn is_allocated(&self) -> bool {
        self.output.is_allocated() && self.weights.is_allocated() && self.bias.is_allocated()
    }

    /// Allocate the output, weight, and bias buffers
    pub fn allocate(&mut self) -> Result<()> {
        self.output.allocate()?;
        self.weights.allocate()?;
        self.bias.allocate()
    }

    /// Load weights and bias from their source files
    pub fn load(&mut self) -> Result<()> {
        self.weights.load()?;
        self.bias.load()
    }

    /// Free all owned buffers
    pub fn free(&mut self) -> Result<()> {
        self.output.free()?;
        self.weights.free()?;
        self.bias.free()
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

    /// Run the convolution with the selected strategy, writing into the
    /// owned output buffer
    pub fn forward(&mut self, input: &TensorBuffer<T>, strategy: Strategy) -> Result<()> {
        self.validate_input(input)?;
        if !self.is_allocated() {
            return Err(Error::allocation_state("compute with", "unallocated"));
        }

        let weights = self.weights.buffer()?.as_slice();
        let bias = self.bias.buffer()?.as_slice();
        let output = self.output.buffer_mut()?.as_mut_slice();
        let d = &self.dims;

        match strategy {
            Strategy::Naive => conv2d_naive(input.as_slice(), weights, bias, output, d),
            Strategy::Tiled => conv2d_tiled(input.as_slice(), weights, bias, output, d),
            Strategy::Simd => conv2d_simd(input.as_slice(), weights, bias, output, d),
            Strategy::Threaded => {
                #[cfg(feature = "rayon")]
                crate::kernels::conv::conv2d_threaded(input.as_slice(), weights, bias, output, d);
                #[cfg(not(feature = "rayon"))]
                return Err(Error::unsupported_strategy(LayerKind::Conv2d, strategy));
            }
        }

        tracing::trace!(
            kind = %LayerKind::Conv2d,
            %strategy,
            out = %self.output_spec,
            "layer forward"
        );
        Ok(())
    }
}
