//! # convr
//!
//! **Forward-inference engine for fixed-topology convolutional networks.**
//!
//! convr runs a chain of layers - convolution, fully-connected,
//! max-pooling, softmax - over a single input tensor and produces a
//! classification vector. Tensors are flat contiguous buffers with
//! explicit row-major strides; weights and inputs load from headerless
//! binary files described by [`TensorSpec`](tensor::TensorSpec)s.
//!
//! ## Why convr?
//!
//! - **Four interchangeable compute strategies**: sequential baseline,
//!   thread-parallel, cache-tiled, and runtime-dispatched SIMD - all
//!   producing results equal within 1e-4
//! - **Validated chains**: shape compatibility is enforced when a layer
//!   is added *and* before every compute, so a bad topology fails with a
//!   `ShapeMismatch`, never a silent out-of-bounds read
//! - **Explicit buffer lifecycle**: allocate once before inference, free
//!   once after; double-allocate and use-before-allocate are hard errors
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use convr::prelude::*;
//!
//! let mut model = Model::<f32>::new();
//! model.add_layer(conv)?;
//! model.alloc_layers()?;
//! model.load_layers()?;
//!
//! let input = load_tensor::<f32>(&path, &[64, 64, 3])?;
//! let scores = model.infer(&input, Strategy::Simd)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): thread-parallel compute strategy
//!   (`Strategy::Threaded`); without it, requesting the threaded
//!   strategy is an `UnsupportedStrategy` error

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dtype;
pub mod error;
pub mod kernels;
pub mod layer;
pub mod model;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::layer::{
        Conv2dLayer, DenseLayer, Layer, LayerKind, MaxPool2dLayer, SoftmaxLayer, Strategy,
        TensorSlot,
    };
    pub use crate::model::Model;
    pub use crate::tensor::{
        load_tensor, store_tensor, Layout, Shape, TensorBuffer, TensorSpec,
    };
}
