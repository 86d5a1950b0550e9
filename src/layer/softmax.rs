//! Softmax layer

use super::slot::TensorSlot;
use super::{LayerKind, Strategy};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::kernels::softmax::softmax_naive;
use crate::tensor::{TensorBuffer, TensorSpec};

/// Softmax over the final dimension
///
/// Output shape equals input shape; for inputs of rank > 1, each row of
/// the last dimension is normalized independently.
pub struct SoftmaxLayer<T: Element> {
    input_spec: TensorSpec,
    output_spec: TensorSpec,
    output: TensorSlot<T>,
}

impl<T: Element> SoftmaxLayer<T> {
    /// Build a softmax layer; input and output specs must agree
    pub fn new(input_spec: TensorSpec, output_spec: TensorSpec) -> Result<Self> {
        if input_spec.rank() == 0 {
            return Err(Error::invalid_argument(
                "input_spec",
                "softmax input must have rank >= 1",
            ));
        }
        if !input_spec.is_compatible(&output_spec) {
            return Err(Error::shape_mismatch(input_spec.dims(), output_spec.dims()));
        }

        Ok(Self {
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

    /// Run softmax with the selected strategy
    ///
    /// Only the naive and threaded variants exist. The transform is three
    /// passes over a small vector; a tiled or hand-vectorized exp is not
    /// implemented, and requesting either is an `UnsupportedStrategy`
    /// error.
    pub fn forward(&mut self, input: &TensorBuffer<T>, strategy: Strategy) -> Result<()> {
        self.validate_input(input)?;
        if !self.is_allocated() {
            return Err(Error::allocation_state("compute with", "unallocated"));
        }

        let dims = self.input_spec.dims();
        let row = dims[dims.len() - 1];
        let output = self.output.buffer_mut()?.as_mut_slice();

        match strategy {
            Strategy::Naive => {
                for (out, inp) in output.chunks_mut(row).zip(input.as_slice().chunks(row)) {
                    softmax_naive(inp, out);
                }
            }
            Strategy::Threaded => {
                #[cfg(feature = "rayon")]
                {
                    use rayon::prelude::*;
                    if output.len() == row {
                        crate::kernels::softmax::softmax_threaded(input.as_slice(), output);
                    } else {
                        output
                            .par_chunks_mut(row)
                            .zip(input.as_slice().par_chunks(row))
                            .for_each(|(out, inp)| softmax_naive(inp, out));
                    }
                }
                #[cfg(not(feature = "rayon"))]
                return Err(Error::unsupported_strategy(LayerKind::Softmax, strategy));
            }
            Strategy::Tiled | Strategy::Simd => {
                return Err(Error::unsupported_strategy(LayerKind::Softmax, strategy));
            }
        }

        tracing::trace!(
            kind = %LayerKind::Softmax,
            %strategy,
            out = %self.output_spec,
            "layer forward"
        );
        Ok(())
    }
}
