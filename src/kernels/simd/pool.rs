//! Vectorized max pooling
//!
//! The channel axis is contiguous, so one vector register holds the same
//! window position across 8 (f32) or 4 (f64) channels and the window
//! reduce is a chain of vector-max operations.

use super::super::pool::{maxpool2d_naive, Pool2dDims};
use crate::dtype::Element;

#[cfg(target_arch = "x86_64")]
use super::{detect_simd, SimdLevel};
#[cfg(target_arch = "x86_64")]
use crate::dtype::DType;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Vectorized max-pool entry point with runtime dispatch
///
/// Falls back to the scalar baseline when AVX2+FMA is unavailable.
pub fn maxpool2d_simd<T: Element>(input: &[T], output: &mut [T], d: &Pool2dDims) {
    #[cfg(target_arch = "x86_64")]
    if detect_simd() == SimdLevel::Avx2Fma {
        match T::DTYPE {
            DType::F32 => {
                unsafe {
                    maxpool2d_avx2_f32(
                        bytemuck::cast_slice(input),
                        bytemuck::cast_slice_mut(output),
                        d,
                    );
                }
                return;
            }
            DType::F64 => {
                unsafe {
                    maxpool2d_avx2_f64(
                        bytemuck::cast_slice(input),
                        bytemuck::cast_slice_mut(output),
                        d,
                    );
                }
                return;
            }
        }
    }

    maxpool2d_naive(input, output, d);
}

/// AVX2 f32 kernel: 8 channels per vector-max chain
///
/// # Safety
/// Caller must ensure AVX2 is available and slice lengths match `d`.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn maxpool2d_avx2_f32(input: &[f32], output: &mut [f32], d: &Pool2dDims) {
    const LANES: usize = 8;
    let chunks = d.channels / LANES;

    for y in 0..d.out_h {
        for x in 0..d.out_w {
            let out_base = (y * d.out_w + x) * d.channels;
            let win_base = (y * d.pool * d.in_w + x * d.pool) * d.channels;

            for ch in 0..chunks {
                let c0 = ch * LANES;
                let mut best = _mm256_loadu_ps(input.as_ptr().add(win_base + c0));

                for wy in 0..d.pool {
                    for wx in 0..d.pool {
                        let base =
                            ((y * d.pool + wy) * d.in_w + (x * d.pool + wx)) * d.channels + c0;
                        let v = _mm256_loadu_ps(input.as_ptr().add(base));
                        best = _mm256_max_ps(best, v);
                    }
                }

                _mm256_storeu_ps(output.as_mut_ptr().add(out_base + c0), best);
            }

            // Scalar tail over the remaining channels
            for c in (chunks * LANES)..d.channels {
                let mut best = *input.get_unchecked(win_base + c);
                for wy in 0..d.pool {
                    for wx in 0..d.pool {
                        let v = *input.get_unchecked(
                            ((y * d.pool + wy) * d.in_w + (x * d.pool + wx)) * d.channels + c,
                        );
                        if v > best {
                            best = v;
                        }
                    }
                }
                output[out_base + c] = best;
            }
        }
    }
}

/// AVX2 f64 kernel: 4 channels per vector-max chain
///
/// # Safety
/// Caller must ensure AVX2 is available and slice lengths match `d`.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn maxpool2d_avx2_f64(input: &[f64], output: &mut [f64], d: &Pool2dDims) {
    const LANES: usize = 4;
    let chunks = d.channels / LANES;

    for y in 0..d.out_h {
        for x in 0..d.out_w {
            let out_base = (y * d.out_w + x) * d.channels;
            let win_base = (y * d.pool * d.in_w + x * d.pool) * d.channels;

            for ch in 0..chunks {
                let c0 = ch * LANES;
                let mut best = _mm256_loadu_pd(input.as_ptr().add(win_base + c0));

                for wy in 0..d.pool {
                    for wx in 0..d.pool {
                        let base =
                            ((y * d.pool + wy) * d.in_w + (x * d.pool + wx)) * d.channels + c0;
                        let v = _mm256_loadu_pd(input.as_ptr().add(base));
                        best = _mm256_max_pd(best, v);
                    }
                }

                _mm256_storeu_pd(output.as_mut_ptr().add(out_base + c0), best);
            }

            for c in (chunks * LANES)..d.channels {
                let mut best = *input.get_unchecked(win_base + c);
                for wy in 0..d.pool {
                    for wx in 0..d.pool {
                        let v = *input.get_unchecked(
                            ((y * d.pool + wy) * d.in_w + (x * d.pool + wx)) * d.channels + c,
                        );
                        if v > best {
                            best = v;
                        }
                    }
                }
                output[out_base + c] = best;
            }
        }
    }
}
