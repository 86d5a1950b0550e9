//! Fully-connected layer

use super::slot::TensorSlot;
use super::{LayerKind, Strategy};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::kernels::dense::{dense_naive, dense_tiled, DenseDims};
use crate::kernels::simd::dense::dense_simd;
use crate::tensor::{TensorBuffer, TensorSpec};

/// Fully-connected layer: `out[o] = bias[o] + sum_h in[h] * w[h][o]`
///
/// Weights are `[in_w][out_w]`, bias is `[out_w]`. The layer accepts any
/// input whose *element count* equals `in_w`: the flatten between a
/// convolutional stack and the dense head is a reshape of the same
/// row-major elements, not a compute step, and this is the one documented
/// relaxation of strict shape compatibility in the engine.
pub struct DenseLayer<T: Element> {
    input_spec: TensorSpec,
    output_spec: TensorSpec,
    weights: TensorSlot<T>,
    bias: TensorSlot<T>,
    output: TensorSlot<T>,
    dims: DenseDims,
}

impl<T: Element> DenseLayer<T> {
    /// Build a dense layer from its four buffer specs
    pub fn new(
        input_spec: TensorSpec,
        output_spec: TensorSpec,
        weight_spec: TensorSpec,
        bias_spec: TensorSpec,
    ) -> Result<Self> {
        if weight_spec.rank() != 2 {
            return Err(Error::invalid_argument(
                "weight_spec",
                format!("dense weights must be [in][out], got {}", weight_spec),
            ));
        }

        let in_w = weight_spec.dims()[0];
        let out_w = weight_spec.dims()[1];

        if input_spec.elem_count() != in_w {
            return Err(Error::shape_mismatch(&[in_w], input_spec.dims()));
        }
        if bias_spec.dims() != [out_w] {
            return Err(Error::shape_mismatch(&[out_w], bias_spec.dims()));
        }
        if output_spec.dims() != [out_w] {
            return Err(Error::shape_mismatch(&[out_w], output_spec.dims()));
        }

        Ok(Self {
            dims: DenseDims { in_w, out_w },
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

    /// The weight slot, mutable
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
        if input.elem_count() != self.dims.in_w {
            return Err(Error::shape_mismatch(&[self.dims.in_w], input.shape()));
        }
        Ok(())
    }

    /// Run the dense transform with the selected strategy
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
            Strategy::Naive => dense_naive(input.as_slice(), weights, bias, output, d),
            Strategy::Tiled => dense_tiled(input.as_slice(), weights, bias, output, d),
            Strategy::Simd => dense_simd(input.as_slice(), weights, bias, output, d),
            Strategy::Threaded => {
                #[cfg(feature = "rayon")]
                crate::kernels::dense::dense_threaded(input.as_slice(), weights, bias, output, d);
                #[cfg(not(feature = "rayon"))]
                return Err(Error::unsupported_strategy(LayerKind::Dense, strategy));
            }
        }

        tracing::trace!(
            kind = %LayerKind::Dense,
            %strategy,
            out = %self.output_spec,
            "layer forward"
        );
        Ok(())
    }
}
