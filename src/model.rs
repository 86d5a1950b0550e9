//! Model: an ordered chain of layers and the sequential forward pass

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::layer::{Layer, Strategy};
use crate::tensor::TensorBuffer;

/// An ordered sequence of layers forming an inference chain
///
/// The model exclusively owns its layers. Chains are validated at two
/// points: [`add_layer`](Self::add_layer) rejects a layer whose input
/// spec is incompatible with the previous layer's output spec, and
/// [`infer`](Self::infer) re-validates the concrete buffer flowing into
/// each layer before computing - a mismatch is a `ShapeMismatch` error,
/// never an out-of-bounds access.
pub struct Model<T: Element> {
    layers: Vec<Layer<T>>,
}

impl<T: Element> Default for Model<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Model<T> {
    /// Create an empty model
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Number of layers
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Whether the model has no layers
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Borrow a layer by index
    pub fn layer(&self, index: usize) -> Option<&Layer<T>> {
        self.layers.get(index)
    }

    /// The layers in chain order
    pub fn layers(&self) -> &[Layer<T>] {
        &self.layers
    }

    /// Append a layer to the chain
    ///
    /// The new layer's input spec must be compatible with the previous
    /// layer's output spec; incompatible chains are rejected here, at the
    /// point of insertion.
    pub fn add_layer(&mut self, layer: impl Into<Layer<T>>) -> Result<()> {
        let layer = layer.into();

        if let Some(prev) = self.layers.last() {
            if !layer.accepts_input(prev.output_spec()) {
                return Err(Error::shape_mismatch(
                    layer.input_spec().dims(),
                    prev.output_spec().dims(),
                ));
            }
        }

        tracing::debug!(
            index = self.layers.len(),
            kind = %layer.kind(),
            input = %layer.input_spec(),
            output = %layer.output_spec(),
            "layer added"
        );
        self.layers.push(layer);
        Ok(())
    }

    /// Allocate every layer's buffers
    ///
    /// A second call fails with `AllocationState` on the first layer and
    /// leaves the existing allocations intact.
    pub fn alloc_layers(&mut self) -> Result<()> {
        for layer in &mut self.layers {
            layer.allocate()?;
        }
        Ok(())
    }

    /// Load every parameterized layer's weights and biases from their
    /// source files
    pub fn load_layers(&mut self) -> Result<()> {
        for layer in &mut self.layers {
            layer.load()?;
        }
        Ok(())
    }

    /// Free every layer's buffers, returning the model to Unallocated
    pub fn free_layers(&mut self) -> Result<()> {
        for layer in &mut self.layers {
            layer.free()?;
        }
        Ok(())
    }

    /// Run the sequential forward pass
    ///
    /// Feeds `input` through layer 0, each layer's output buffer becoming
    /// the next layer's input, and returns a reference to the final
    /// layer's output. Layers execute strictly in order; there is no
    /// cross-layer parallelism because each step is a hard data
    /// dependency on the previous one.
    pub fn infer(&mut self, input: &TensorBuffer<T>, strategy: Strategy) -> Result<&TensorBuffer<T>> {
        if self.layers.is_empty() {
            return Err(Error::invalid_argument("model", "no layers to run"));
        }

        for i in 0..self.layers.len() {
            let (done, rest) = self.layers.split_at_mut(i);
            let layer = &mut rest[0];
            let flowing = match done.last() {
                Some(prev) => prev.output()?,
                None => input,
            };

            layer.validate_input(flowing)?;
            layer.forward(flowing, strategy)?;
        }

        let last = self.layers.last().expect("checked non-empty");
        tracing::debug!(layers = self.layers.len(), %strategy, "forward pass complete");
        last.output()
    }

    /// Run a single layer in isolation
    ///
    /// The caller supplies the layer's input directly; no other layer is
    /// touched. Out-of-range indices are an `InvalidArgument` error.
    pub fn infer_layer(
        &mut self,
        input: &TensorBuffer<T>,
        index: usize,
        strategy: Strategy,
    ) -> Result<&TensorBuffer<T>> {
        let count = self.layers.len();
        let layer = self.layers.get_mut(index).ok_or_else(|| {
            Error::invalid_argument("index", format!("layer {} of {}", index, count))
        })?;

        layer.validate_input(input)?;
        layer.forward(input, strategy)?;
        self.layers[index].output()
    }
}
