//! CPU compute kernels for the layer transforms
//!
//! Each layer kind has a naive baseline plus optional threaded, tiled, and
//! SIMD variants of the identical transform. Kernels operate on flat
//! row-major slices; the dimension structs carry the index arithmetic
//! parameters. Callers (the layer types) validate shapes before invoking,
//! so kernels only `debug_assert` their slice-length contracts.
//!
//! Parallel variants partition the *output* by row or element range via
//! `par_chunks_mut`, so disjointness of writes is enforced by the borrow
//! checker rather than by convention; inputs and weights are shared
//! read-only borrows for the duration of the call.

pub mod conv;
pub mod dense;
pub mod pool;
pub mod simd;
pub mod softmax;

pub use conv::Conv2dDims;
pub use dense::DenseDims;
pub use pool::Pool2dDims;
