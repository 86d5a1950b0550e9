//! Vectorized 2-D convolution
//!
//! One AVX2 accumulator covers 8 (f32) or 4 (f64) output channels; each
//! input value is broadcast and FMA'd against the corresponding weight
//! vector. Output channels beyond the last full vector take the scalar
//! path.

use super::super::conv::{conv2d_naive, Conv2dDims};
use crate::dtype::Element;

#[cfg(target_arch = "x86_64")]
use super::{detect_simd, SimdLevel};
#[cfg(target_arch = "x86_64")]
use crate::dtype::DType;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Vectorized convolution entry point with runtime dispatch
///
/// Falls back to the scalar baseline when AVX2+FMA is unavailable or the
/// element type has no vectorized kernel; the result is identical either
/// way.
pub fn conv2d_simd<T: Element>(
    input: &[T],
    weight: &[T],
    bias: &[T],
    output: &mut [T],
    d: &Conv2dDims,
) {
    #[cfg(target_arch = "x86_64")]
    if detect_simd() == SimdLevel::Avx2Fma {
        match T::DTYPE {
            DType::F32 => {
                // Safe casts: T::DTYPE == F32 implies T is f32 (checked by bytemuck)
                unsafe {
                    conv2d_avx2_f32(
                        bytemuck::cast_slice(input),
                        bytemuck::cast_slice(weight),
                        bytemuck::cast_slice(bias),
                        bytemuck::cast_slice_mut(output),
                        d,
                    );
                }
                return;
            }
            DType::F64 => {
                unsafe {
                    conv2d_avx2_f64(
                        bytemuck::cast_slice(input),
                        bytemuck::cast_slice(weight),
                        bytemuck::cast_slice(bias),
                        bytemuck::cast_slice_mut(output),
                        d,
                    );
                }
                return;
            }
        }
    }

    conv2d_naive(input, weight, bias, output, d);
}

/// AVX2 f32 kernel: 8 output channels per accumulator
///
/// # Safety
/// Caller must ensure AVX2+FMA are available and slice lengths match `d`.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn conv2d_avx2_f32(
    input: &[f32],
    weight: &[f32],
    bias: &[f32],
    output: &mut [f32],
    d: &Conv2dDims,
) {
    const LANES: usize = 8;
    let chunks = d.c_out / LANES;

    for y in 0..d.out_h {
        for x in 0..d.out_w {
            let out_base = (y * d.out_w + x) * d.c_out;

            for ch in 0..chunks {
                let o0 = ch * LANES;
                let mut acc = _mm256_loadu_ps(bias.as_ptr().add(o0));

                for fy in 0..d.filter_h {
                    for fx in 0..d.filter_w {
                        let in_base = ((y + fy) * d.in_w + (x + fx)) * d.c_in;
                        let w_base = (fy * d.filter_w + fx) * d.c_in * d.c_out + o0;

                        for c in 0..d.c_in {
                            let xv = _mm256_set1_ps(*input.get_unchecked(in_base + c));
                            let wv = _mm256_loadu_ps(weight.as_ptr().add(w_base + c * d.c_out));
                            acc = _mm256_fmadd_ps(xv, wv, acc);
                        }
                    }
                }

                _mm256_storeu_ps(output.as_mut_ptr().add(out_base + o0), acc);
            }

            // Scalar tail over the remaining output channels
            for o in (chunks * LANES)..d.c_out {
                let mut sum = bias[o];
                for fy in 0..d.filter_h {
                    for fx in 0..d.filter_w {
                        let in_base = ((y + fy) * d.in_w + (x + fx)) * d.c_in;
                        let w_base = (fy * d.filter_w + fx) * d.c_in * d.c_out + o;
                        for c in 0..d.c_in {
                            sum += input.get_unchecked(in_base + c)
                                * weight.get_unchecked(w_base + c * d.c_out);
                        }
                    }
                }
                output[out_base + o] = sum;
            }
        }
    }
}

/// AVX2 f64 kernel: 4 output channels per accumulator
///
/// # Safety
/// Caller must ensure AVX2+FMA are available and slice lengths match `d`.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn conv2d_avx2_f64(
    input: &[f64],
    weight: &[f64],
    bias: &[f64],
    output: &mut [f64],
    d: &Conv2dDims,
) {
    const LANES: usize = 4;
    let chunks = d.c_out / LANES;

    for y in 0..d.out_h {
        for x in 0..d.out_w {
            let out_base = (y * d.out_w + x) * d.c_out;

            for ch in 0..chunks {
                let o0 = ch * LANES;
                let mut acc = _mm256_loadu_pd(bias.as_ptr().add(o0));

                for fy in 0..d.filter_h {
                    for fx in 0..d.filter_w {
                        let in_base = ((y + fy) * d.in_w + (x + fx)) * d.c_in;
                        let w_base = (fy * d.filter_w + fx) * d.c_in * d.c_out + o0;

                        for c in 0..d.c_in {
                            let xv = _mm256_set1_pd(*input.get_unchecked(in_base + c));
                            let wv = _mm256_loadu_pd(weight.as_ptr().add(w_base + c * d.c_out));
                            acc = _mm256_fmadd_pd(xv, wv, acc);
                        }
                    }
                }

                _mm256_storeu_pd(output.as_mut_ptr().add(out_base + o0), acc);
            }

            for o in (chunks * LANES)..d.c_out {
                let mut sum = bias[o];
                for fy in 0..d.filter_h {
                    for fx in 0..d.filter_w {
                        let in_base = ((y + fy) * d.in_w + (x + fx)) * d.c_in;
                        let w_base = (fy * d.filter_w + fx) * d.c_in * d.c_out + o;
                        for c in 0..d.c_in {
                            sum += input.get_unchecked(in_base + c)
                                * weight.get_unchecked(w_base + c * d.c_out);
                        }
                    }
                }
                output[out_base + o] = sum;
            }
        }
    }
}
