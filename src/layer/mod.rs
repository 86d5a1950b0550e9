//! Layers: the sealed kind set and the per-kind compute dispatch
//!
//! The engine supports exactly four layer kinds, expressed as a tagged
//! enum rather than an open trait hierarchy: allocation and compute are
//! parameterized by element type and kind simultaneously, which closed
//! match dispatch expresses directly.

mod conv;
mod dense;
mod pool;
mod slot;
mod softmax;

pub use conv::Conv2dLayer;
pub use dense::DenseLayer;
pub use pool::{MaxPool2dLayer, DEFAULT_POOL};
pub use slot::TensorSlot;
pub use softmax::SoftmaxLayer;

use crate::dtype::Element;
use crate::error::Result;
use crate::tensor::{TensorBuffer, TensorSpec};
use std::fmt;

/// Compute strategy: alternative, numerically equivalent implementations
/// of each layer transform
///
/// Only `Naive` is guaranteed for every kind; the others are performance
/// paths that fail with `UnsupportedStrategy` where not implemented
/// rather than silently doing nothing.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Sequential baseline
    #[default]
    Naive,
    /// Thread-parallel over disjoint output partitions (rayon)
    Threaded,
    /// Cache-tiled loop order
    Tiled,
    /// Runtime-dispatched vector kernels
    Simd,
}

impl Strategy {
    /// All strategies, in declaration order
    pub const ALL: [Strategy; 4] = [
        Strategy::Naive,
        Strategy::Threaded,
        Strategy::Tiled,
        Strategy::Simd,
    ];

    /// Name of this strategy as a string
    pub const fn as_str(self) -> &'static str {
        match self {
            Strategy::Naive => "naive",
            Strategy::Threaded => "threaded",
            Strategy::Tiled => "tiled",
            Strategy::Simd => "simd",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Layer kind tag
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// 2-D convolution
    Conv2d,
    /// Fully connected
    Dense,
    /// Max pooling
    MaxPool2d,
    /// Softmax normalization
    Softmax,
}

impl LayerKind {
    /// Name of this kind as a string
    pub const fn as_str(self) -> &'static str {
        match self {
            LayerKind::Conv2d => "conv2d",
            LayerKind::Dense => "dense",
            LayerKind::MaxPool2d => "maxpool2d",
            LayerKind::Softmax => "softmax",
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A network layer: one of the four sealed kinds
///
/// Every lifecycle and compute operation dispatches over the kind tag
/// with a match, so adding a kind is a compile-visible change at every
/// dispatch site.
pub enum Layer<T: Element> {
    /// 2-D convolution
    Conv2d(Conv2dLayer<T>),
    /// Fully connected
    Dense(DenseLayer<T>),
    /// Max pooling
    MaxPool2d(MaxPool2dLayer<T>),
    /// Softmax normalization
    Softmax(SoftmaxLayer<T>),
}

impl<T: Element> Layer<T> {
    /// The kind tag
    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Conv2d(_) => LayerKind::Conv2d,
            Layer::Dense(_) => LayerKind::Dense,
            Layer::MaxPool2d(_) => LayerKind::MaxPool2d,
            Layer::Softmax(_) => LayerKind::Softmax,
        }
    }

    /// The declared input spec
    pub fn input_spec(&self) -> &TensorSpec {
        match self {
            Layer::Conv2d(l) => l.input_spec(),
            Layer::Dense(l) => l.input_spec(),
            Layer::MaxPool2d(l) => l.input_spec(),
            Layer::Softmax(l) => l.input_spec(),
        }
    }

    /// The declared output spec
    pub fn output_spec(&self) -> &TensorSpec {
        match self {
            Layer::Conv2d(l) => l.output_spec(),
            Layer::Dense(l) => l.output_spec(),
            Layer::MaxPool2d(l) => l.output_spec(),
            Layer::Softmax(l) => l.output_spec(),
        }
    }

    /// Whether a producer with this output spec can feed this layer
    ///
    /// Strict spec compatibility for every kind except dense, which
    /// accepts any producer with a matching element count (the flatten
    /// rule).
    pub fn accepts_input(&self, produced: &TensorSpec) -> bool {
        match self {
            Layer::Dense(l) => {
                l.input_spec().dtype().size_in_bytes() == produced.dtype().size_in_bytes()
                    && l.input_spec().elem_count() == produced.elem_count()
            }
            _ => self.input_spec().is_compatible(produced),
        }
    }

    /// Whether every buffer this layer owns is materialized
    pub fn is_allocated(&self) -> bool {
        match self {
            Layer::Conv2d(l) => l.is_allocated(),
            Layer::Dense(l) => l.is_allocated(),
            Layer::MaxPool2d(l) => l.is_allocated(),
            Layer::Softmax(l) => l.is_allocated(),
        }
    }

    /// Allocate all owned buffers (output, plus weights/bias where the
    /// kind has them)
    pub fn allocate(&mut self) -> Result<()> {
        match self {
            Layer::Conv2d(l) => l.allocate(),
            Layer::Dense(l) => l.allocate(),
            Layer::MaxPool2d(l) => l.allocate(),
            Layer::Softmax(l) => l.allocate(),
        }
    }

    /// Load weight/bias data from source files; no-op for kinds without
    /// parameters
    pub fn load(&mut self) -> Result<()> {
        match self {
            Layer::Conv2d(l) => l.load(),
            Layer::Dense(l) => l.load(),
            Layer::MaxPool2d(_) | Layer::Softmax(_) => Ok(()),
        }
    }

    /// Free all owned buffers
    pub fn free(&mut self) -> Result<()> {
        match self {
            Layer::Conv2d(l) => l.free(),
            Layer::Dense(l) => l.free(),
            Layer::MaxPool2d(l) => l.free(),
            Layer::Softmax(l) => l.free(),
        }
    }

    /// The computed output buffer
    pub fn output(&self) -> Result<&TensorBuffer<T>> {
        match self {
            Layer::Conv2d(l) => l.output(),
            Layer::Dense(l) => l.output(),
            Layer::MaxPool2d(l) => l.output(),
            Layer::Softmax(l) => l.output(),
        }
    }

    /// Check a concrete input buffer against the declared input spec
    pub fn validate_input(&self, input: &TensorBuffer<T>) -> Result<()> {
        match self {
            Layer::Conv2d(l) => l.validate_input(input),
            Layer::Dense(l) => l.validate_input(input),
            Layer::MaxPool2d(l) => l.validate_input(input),
            Layer::Softmax(l) => l.validate_input(input),
        }
    }

    /// Run the layer transform with the selected strategy
    pub fn forward(&mut self, input: &TensorBuffer<T>, strategy: Strategy) -> Result<()> {
        match self {
            Layer::Conv2d(l) => l.forward(input, strategy),
            Layer::Dense(l) => l.forward(input, strategy),
            Layer::MaxPool2d(l) => l.forward(input, strategy),
            Layer::Softmax(l) => l.forward(input, strategy),
        }
    }
}

impl<T: Element> From<Conv2dLayer<T>> for Layer<T> {
    fn from(l: Conv2dLayer<T>) -> Self {
        Layer::Conv2d(l)
    }
}

impl<T: Element> From<DenseLayer<T>> for Layer<T> {
    fn from(l: DenseLayer<T>) -> Self {
        Layer::Dense(l)
    }
}

impl<T: Element> From<MaxPool2dLayer<T>> for Layer<T> {
    fn from(l: MaxPool2dLayer<T>) -> Self {
        Layer::MaxPool2d(l)
    }
}

impl<T: Element> From<SoftmaxLayer<T>> for Layer<T> {
    fn from(l: SoftmaxLayer<T>) -> Self {
        Layer::Softmax(l)
    }
}
