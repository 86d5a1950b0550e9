//! Common test utilities
#![allow(dead_code)]

use convr::prelude::*;

/// Comparison epsilon shared by the parity suites
pub const EPSILON: f64 = 1e-4;

/// Assert two f32 slices are close within an absolute tolerance
pub fn assert_allclose_f32(a: &[f32], b: &[f32], atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        assert!(
            diff <= atol,
            "{}: element {} differs: {} vs {} (diff={})",
            msg,
            i,
            x,
            y,
            diff
        );
    }
}

/// Deterministic pseudo-random values in roughly [-1, 1]
///
/// Trig-based so fixtures are reproducible without a PRNG dependency.
pub fn wave(n: usize, step: f32) -> Vec<f32> {
    (0..n).map(|i| (i as f32 * step).sin()).collect()
}

/// Build a tensor of deterministic values for a shape
pub fn wave_tensor(shape: &[usize], step: f32) -> TensorBuffer<f32> {
    let n: usize = shape.iter().product();
    TensorBuffer::from_vec(wave(n, step), shape).unwrap()
}
