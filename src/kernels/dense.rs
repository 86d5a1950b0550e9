//! Fully-connected (dense) kernels
//!
//! Vector-times-matrix with bias: `out[o] = bias[o] + sum over h of
//! in[h] * w[h][o]`, weights `[in_w][out_w]` in row-major order.

use crate::dtype::Element;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Output block edge for the tiled variant
const TILE_O: usize = 64;

/// Minimum output elements per rayon task
#[cfg(feature = "rayon")]
const PAR_CHUNK: usize = 16;

/// Dimension parameters for a dense layer
#[derive(Debug, Clone, Copy)]
pub struct DenseDims {
    /// Input width (flattened element count)
    pub in_w: usize,
    /// Output width
    pub out_w: usize,
}

impl DenseDims {
    fn assert_slices<T>(&self, input: &[T], weight: &[T], bias: &[T], output: &[T]) {
        debug_assert_eq!(input.len(), self.in_w);
        debug_assert_eq!(weight.len(), self.in_w * self.out_w);
        debug_assert_eq!(bias.len(), self.out_w);
        debug_assert_eq!(output.len(), self.out_w);
    }
}

/// Sequential baseline: a direct transcription of the transform
pub fn dense_naive<T: Element>(
    input: &[T],
    weight: &[T],
    bias: &[T],
    output: &mut [T],
    d: &DenseDims,
) {
    d.assert_slices(input, weight, bias, output);

    for o in 0..d.out_w {
        let mut sum = bias[o];
        for h in 0..d.in_w {
            sum = sum + input[h] * weight[h * d.out_w + o];
        }
        output[o] = sum;
    }
}

/// Thread-parallel variant: rayon tasks over disjoint output ranges
///
/// Each task walks the full input against its own column block of the
/// weight matrix; no two tasks touch the same output element.
#[cfg(feature = "rayon")]
pub fn dense_threaded<T: Element>(
    input: &[T],
    weight: &[T],
    bias: &[T],
    output: &mut [T],
    d: &DenseDims,
) {
    d.assert_slices(input, weight, bias, output);

    output
        .par_chunks_mut(PAR_CHUNK)
        .enumerate()
        .for_each(|(chunk, out)| {
            let o0 = chunk * PAR_CHUNK;
            for (i, slot) in out.iter_mut().enumerate() {
                let o = o0 + i;
                let mut sum = bias[o];
                for h in 0..d.in_w {
                    sum = sum + input[h] * weight[h * d.out_w + o];
                }
                *slot = sum;
            }
        });
}

/// Cache-tiled variant: hold an output block in L1 while streaming the
/// weight matrix through it a column block at a time
pub fn dense_tiled<T: Element>(
    input: &[T],
    weight: &[T],
    bias: &[T],
    output: &mut [T],
    d: &DenseDims,
) {
    d.assert_slices(input, weight, bias, output);

    for o0 in (0..d.out_w).step_by(TILE_O) {
        let o_end = (o0 + TILE_O).min(d.out_w);
        output[o0..o_end].copy_from_slice(&bias[o0..o_end]);

        for h in 0..d.in_w {
            let xv = input[h];
            let w_row = h * d.out_w;
            for o in o0..o_end {
                output[o] = output[o] + xv * weight[w_row + o];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        // w = [[1,0,1],[0,1,1]], b = 0, in = [2,3]  =>  out = [2,3,5]
        let d = DenseDims { in_w: 2, out_w: 3 };
        let weight = vec![1.0f32, 0.0, 1.0, 0.0, 1.0, 1.0];
        let bias = vec![0.0f32; 3];
        let input = vec![2.0f32, 3.0];

        let mut out = vec![0.0f32; 3];
        dense_naive(&input, &weight, &bias, &mut out, &d);
        assert_eq!(out, vec![2.0, 3.0, 5.0]);
    }

    #[test]
    fn test_variants_agree() {
        let d = DenseDims { in_w: 97, out_w: 130 };
        let input: Vec<f32> = (0..d.in_w).map(|i| (i as f32 * 0.21).sin()).collect();
        let weight: Vec<f32> = (0..d.in_w * d.out_w)
            .map(|i| (i as f32 * 0.07).cos())
            .collect();
        let bias: Vec<f32> = (0..d.out_w).map(|o| o as f32 * 0.01).collect();

        let mut naive = vec![0.0f32; d.out_w];
        dense_naive(&input, &weight, &bias, &mut naive, &d);

        let mut tiled = vec![0.0f32; d.out_w];
        dense_tiled(&input, &weight, &bias, &mut tiled, &d);
        for (a, b) in naive.iter().zip(tiled.iter()) {
            assert!((a - b).abs() < 1e-4);
        }

        #[cfg(feature = "rayon")]
        {
            let mut threaded = vec![0.0f32; d.out_w];
            dense_threaded(&input, &weight, &bias, &mut threaded, &d);
            for (a, b) in naive.iter().zip(threaded.iter()) {
                assert!((a - b).abs() < 1e-4);
            }
        }
    }
}
