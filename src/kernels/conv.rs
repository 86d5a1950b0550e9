//! Direct 2-D convolution kernels
//!
//! Channel-last layout, stride 1, no padding, single-item batch:
//!
//! ```text
//! out[y][x][o] = bias[o] + sum over fy, fx, c of
//!               in[y+fy][x+fx][c] * w[fy][fx][c][o]
//! ```
//!
//! Input is `[in_h][in_w][c_in]`, weights are `[filter_h][filter_w][c_in][c_out]`,
//! output is `[out_h][out_w][c_out]` with `out = in - filter + 1` per axis.

use crate::dtype::Element;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Loop-blocking tile edge for the tiled variant (output coordinates)
const TILE: usize = 8;

/// Dimension parameters for a 2-D convolution
#[derive(Debug, Clone, Copy)]
pub struct Conv2dDims {
    /// Input height
    pub in_h: usize,
    /// Input width
    pub in_w: usize,
    /// Input channels
    pub c_in: usize,
    /// Filter height
    pub filter_h: usize,
    /// Filter width
    pub filter_w: usize,
    /// Output channels (filter count)
    pub c_out: usize,
    /// Output height (`in_h - filter_h + 1`)
    pub out_h: usize,
    /// Output width (`in_w - filter_w + 1`)
    pub out_w: usize,
}

impl Conv2dDims {
    fn assert_slices<T>(&self, input: &[T], weight: &[T], bias: &[T], output: &[T]) {
        debug_assert_eq!(input.len(), self.in_h * self.in_w * self.c_in);
        debug_assert_eq!(
            weight.len(),
            self.filter_h * self.filter_w * self.c_in * self.c_out
        );
        debug_assert_eq!(bias.len(), self.c_out);
        debug_assert_eq!(output.len(), self.out_h * self.out_w * self.c_out);
    }
}

/// Sequential baseline: a direct transcription of the transform
pub fn conv2d_naive<T: Element>(
    input: &[T],
    weight: &[T],
    bias: &[T],
    output: &mut [T],
    d: &Conv2dDims,
) {
    d.assert_slices(input, weight, bias, output);

    for y in 0..d.out_h {
        for x in 0..d.out_w {
            for o in 0..d.c_out {
                let mut sum = bias[o];
                for fy in 0..d.filter_h {
                    for fx in 0..d.filter_w {
                        for c in 0..d.c_in {
                            let in_idx = ((y + fy) * d.in_w + (x + fx)) * d.c_in + c;
                            let w_idx = ((fy * d.filter_w + fx) * d.c_in + c) * d.c_out + o;
                            sum = sum + input[in_idx] * weight[w_idx];
                        }
                    }
                }
                output[(y * d.out_w + x) * d.c_out + o] = sum;
            }
        }
    }
}

/// Compute one output row; shared by the threaded variant
#[cfg(feature = "rayon")]
fn conv2d_row<T: Element>(input: &[T], weight: &[T], bias: &[T], row: &mut [T], y: usize, d: &Conv2dDims) {
    debug_assert_eq!(row.len(), d.out_w * d.c_out);

    for x in 0..d.out_w {
        let out_base = x * d.c_out;
        row[out_base..out_base + d.c_out].copy_from_slice(bias);

        for fy in 0..d.filter_h {
            for fx in 0..d.filter_w {
                let in_base = ((y + fy) * d.in_w + (x + fx)) * d.c_in;
                let w_base = (fy * d.filter_w + fx) * d.c_in * d.c_out;

                for c in 0..d.c_in {
                    let xv = input[in_base + c];
                    let w_row = w_base + c * d.c_out;
                    for o in 0..d.c_out {
                        row[out_base + o] = row[out_base + o] + xv * weight[w_row + o];
                    }
                }
            }
        }
    }
}

/// Thread-parallel variant: one rayon task per output row
///
/// Rows are disjoint `&mut` chunks of the output, so no synchronization is
/// needed beyond the implicit join when the parallel iterator completes.
#[cfg(feature = "rayon")]
pub fn conv2d_threaded<T: Element>(
    input: &[T],
    weight: &[T],
    bias: &[T],
    output: &mut [T],
    d: &Conv2dDims,
) {
    d.assert_slices(input, weight, bias, output);

    output
        .par_chunks_mut(d.out_w * d.c_out)
        .enumerate()
        .for_each(|(y, row)| conv2d_row(input, weight, bias, row, y, d));
}

/// Cache-tiled variant: block output coordinates so the filter window and
/// the weight panel stay hot across a tile, with the output-channel loop
/// innermost over contiguous memory
pub fn conv2d_tiled<T: Element>(
    input: &[T],
    weight: &[T],
    bias: &[T],
    output: &mut [T],
    d: &Conv2dDims,
) {
    d.assert_slices(input, weight, bias, output);

    for y0 in (0..d.out_h).step_by(TILE) {
        let y_end = (y0 + TILE).min(d.out_h);
        for x0 in (0..d.out_w).step_by(TILE) {
            let x_end = (x0 + TILE).min(d.out_w);

            for y in y0..y_end {
                for x in x0..x_end {
                    let out_base = (y * d.out_w + x) * d.c_out;
                    output[out_base..out_base + d.c_out].copy_from_slice(bias);

                    for fy in 0..d.filter_h {
                        for fx in 0..d.filter_w {
                            let in_base = ((y + fy) * d.in_w + (x + fx)) * d.c_in;
                            let w_base = (fy * d.filter_w + fx) * d.c_in * d.c_out;

                            for c in 0..d.c_in {
                                let xv = input[in_base + c];
                                let w_row = w_base + c * d.c_out;
                                for o in 0..d.c_out {
                                    output[out_base + o] =
                                        output[out_base + o] + xv * weight[w_row + o];
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_dims() -> Conv2dDims {
        Conv2dDims {
            in_h: 4,
            in_w: 4,
            c_in: 2,
            filter_h: 3,
            filter_w: 3,
            c_out: 3,
            out_h: 2,
            out_w: 2,
        }
    }

    fn run_all(d: &Conv2dDims, input: &[f32], weight: &[f32], bias: &[f32]) -> Vec<Vec<f32>> {
        let out_len = d.out_h * d.out_w * d.c_out;
        let mut results = Vec::new();

        let mut out = vec![0.0f32; out_len];
        conv2d_naive(input, weight, bias, &mut out, d);
        results.push(out);

        let mut out = vec![0.0f32; out_len];
        conv2d_tiled(input, weight, bias, &mut out, d);
        results.push(out);

        #[cfg(feature = "rayon")]
        {
            let mut out = vec![0.0f32; out_len];
            conv2d_threaded(input, weight, bias, &mut out, d);
            results.push(out);
        }

        results
    }

    #[test]
    fn test_variants_agree() {
        let d = small_dims();
        let input: Vec<f32> = (0..d.in_h * d.in_w * d.c_in)
            .map(|i| (i as f32 * 0.37).sin())
            .collect();
        let weight: Vec<f32> = (0..d.filter_h * d.filter_w * d.c_in * d.c_out)
            .map(|i| (i as f32 * 0.11).cos())
            .collect();
        let bias: Vec<f32> = (0..d.c_out).map(|o| o as f32 * 0.5).collect();

        let results = run_all(&d, &input, &weight, &bias);
        for other in &results[1..] {
            for (a, b) in results[0].iter().zip(other.iter()) {
                assert!((a - b).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_identity_filter() {
        // 1x1 filter with identity channel mixing passes the input through
        let d = Conv2dDims {
            in_h: 2,
            in_w: 2,
            c_in: 2,
            filter_h: 1,
            filter_w: 1,
            c_out: 2,
            out_h: 2,
            out_w: 2,
        };
        let input = vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        // w[0][0][c][o] = identity matrix
        let weight = vec![1.0f32, 0.0, 0.0, 1.0];
        let bias = vec![0.0f32, 0.0];

        let mut out = vec![0.0f32; 8];
        conv2d_naive(&input, &weight, &bias, &mut out, &d);
        assert_eq!(out, input);
    }

    #[test]
    fn test_bias_only() {
        let d = small_dims();
        let input = vec![0.0f32; d.in_h * d.in_w * d.c_in];
        let weight = vec![0.0f32; d.filter_h * d.filter_w * d.c_in * d.c_out];
        let bias = vec![1.0f32, 2.0, 3.0];

        let mut out = vec![0.0f32; d.out_h * d.out_w * d.c_out];
        conv2d_naive(&input, &weight, &bias, &mut out, &d);
        for pos in out.chunks(d.c_out) {
            assert_eq!(pos, &bias[..]);
        }
    }
}
