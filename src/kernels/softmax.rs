//! Numerically stable softmax kernels
//!
//! `out[i] = exp(x_i - max) / sum_j exp(x_j - max)` over the final
//! dimension. Subtracting the running maximum keeps the exponentials in
//! range; the result is invariant to the shift.

use crate::dtype::Element;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Minimum elements per rayon task
#[cfg(feature = "rayon")]
const PAR_CHUNK: usize = 64;

/// Sequential baseline: max-reduce, shifted exp + sum, normalize
pub fn softmax_naive<T: Element>(input: &[T], output: &mut [T]) {
    debug_assert_eq!(input.len(), output.len());
    debug_assert!(!input.is_empty());

    let mut max = input[0];
    for &v in &input[1..] {
        if v > max {
            max = v;
        }
    }
    let max = max.to_f64();

    let mut sum = 0.0f64;
    for (slot, &v) in output.iter_mut().zip(input.iter()) {
        let e = (v.to_f64() - max).exp();
        sum += e;
        *slot = T::from_f64(e);
    }

    let inv = 1.0 / sum;
    for slot in output.iter_mut() {
        *slot = T::from_f64(slot.to_f64() * inv);
    }
}

/// Thread-parallel variant: rayon reductions for the max and sum passes,
/// chunked parallel writes for the exp and normalize passes
#[cfg(feature = "rayon")]
pub fn softmax_threaded<T: Element>(input: &[T], output: &mut [T]) {
    debug_assert_eq!(input.len(), output.len());
    debug_assert!(!input.is_empty());

    let max = input
        .par_iter()
        .map(|v| v.to_f64())
        .reduce(|| f64::NEG_INFINITY, f64::max);

    let sum: f64 = output
        .par_chunks_mut(PAR_CHUNK)
        .zip(input.par_chunks(PAR_CHUNK))
        .map(|(out, inp)| {
            let mut part = 0.0f64;
            for (slot, &v) in out.iter_mut().zip(inp.iter()) {
                let e = (v.to_f64() - max).exp();
                part += e;
                *slot = T::from_f64(e);
            }
            part
        })
        .sum();

    let inv = 1.0 / sum;
    output.par_chunks_mut(PAR_CHUNK).for_each(|out| {
        for slot in out.iter_mut() {
            *slot = T::from_f64(slot.to_f64() * inv);
        }
    });
}
