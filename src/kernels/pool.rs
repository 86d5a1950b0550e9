//! Max-pooling kernels
//!
//! Non-overlapping square window with stride equal to the window edge;
//! channel count is preserved. Channel-last layout throughout.

use crate::dtype::Element;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Dimension parameters for 2-D max pooling
#[derive(Debug, Clone, Copy)]
pub struct Pool2dDims {
    /// Input height
    pub in_h: usize,
    /// Input width
    pub in_w: usize,
    /// Channels (preserved)
    pub channels: usize,
    /// Window edge and stride
    pub pool: usize,
    /// Output height (`in_h / pool`)
    pub out_h: usize,
    /// Output width (`in_w / pool`)
    pub out_w: usize,
}

impl Pool2dDims {
    fn assert_slices<T>(&self, input: &[T], output: &[T]) {
        debug_assert_eq!(input.len(), self.in_h * self.in_w * self.channels);
        debug_assert_eq!(output.len(), self.out_h * self.out_w * self.channels);
    }
}

/// Compute one output row; shared by the threaded variant
fn pool_row<T: Element>(input: &[T], row: &mut [T], y: usize, d: &Pool2dDims) {
    for x in 0..d.out_w {
        for c in 0..d.channels {
            // Seed from the window's first element instead of a minimum
            // sentinel, so no Element::MIN is needed
            let mut best = input[(y * d.pool * d.in_w + x * d.pool) * d.channels + c];
            for wy in 0..d.pool {
                for wx in 0..d.pool {
                    let v = input[((y * d.pool + wy) * d.in_w + (x * d.pool + wx)) * d.channels + c];
                    if v > best {
                        best = v;
                    }
                }
            }
            row[x * d.channels + c] = best;
        }
    }
}

/// Sequential baseline
pub fn maxpool2d_naive<T: Element>(input: &[T], output: &mut [T], d: &Pool2dDims) {
    d.assert_slices(input, output);

    for (y, row) in output.chunks_mut(d.out_w * d.channels).enumerate() {
        pool_row(input, row, y, d);
    }
}

/// Thread-parallel variant: one rayon task per output row
#[cfg(feature = "rayon")]
pub fn maxpool2d_threaded<T: Element>(input: &[T], output: &mut [T], d: &Pool2dDims) {
    d.assert_slices(input, output);

    output
        .par_chunks_mut(d.out_w * d.channels)
        .enumerate()
        .for_each(|(y, row)| pool_row(input, row, y, d));
}
