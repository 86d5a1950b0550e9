//! Vectorized dense (fully-connected) kernel
//!
//! Broadcast each input value against a vector of weight-matrix columns
//! and accumulate with FMA, 8 (f32) or 4 (f64) outputs at a time.

use super::super::dense::{dense_naive, DenseDims};
use crate::dtype::Element;

#[cfg(target_arch = "x86_64")]
use super::{detect_simd, SimdLevel};
#[cfg(target_arch = "x86_64")]
use crate::dtype::DType;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

/// Vectorized dense entry point with runtime dispatch
///
/// Falls back to the scalar baseline when AVX2+FMA is unavailable.
pub fn dense_simd<T: Element>(
    input: &[T],
    weight: &[T],
    bias: &[T],
    output: &mut [T],
    d: &DenseDims,
) {
    #[cfg(target_arch = "x86_64")]
    if detect_simd() == SimdLevel::Avx2Fma {
        match T::DTYPE {
            DType::F32 => {
                unsafe {
                    dense_avx2_f32(
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
                    dense_avx2_f64(
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

    dense_naive(input, weight, bias, output, d);
}

/// AVX2 f32 kernel: 8 outputs per accumulator
///
/// # Safety
/// Caller must ensure AVX2+FMA are available and slice lengths match `d`.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn dense_avx2_f32(
    input: &[f32],
    weight: &[f32],
    bias: &[f32],
    output: &mut [f32],
    d: &DenseDims,
) {
    const LANES: usize = 8;
    let chunks = d.out_w / LANES;

    for ch in 0..chunks {
        let o0 = ch * LANES;
        let mut acc = _mm256_loadu_ps(bias.as_ptr().add(o0));

        for h in 0..d.in_w {
            let xv = _mm256_set1_ps(*input.get_unchecked(h));
            let wv = _mm256_loadu_ps(weight.as_ptr().add(h * d.out_w + o0));
            acc = _mm256_fmadd_ps(xv, wv, acc);
        }

        _mm256_storeu_ps(output.as_mut_ptr().add(o0), acc);
    }

    for o in (chunks * LANES)..d.out_w {
        let mut sum = bias[o];
        for h in 0..d.in_w {
            sum += input.get_unchecked(h) * weight.get_unchecked(h * d.out_w + o);
        }
        output[o] = sum;
    }
}

/// AVX2 f64 kernel: 4 outputs per accumulator
///
/// # Safety
/// Caller must ensure AVX2+FMA are available and slice lengths match `d`.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn dense_avx2_f64(
    input: &[f64],
    weight: &[f64],
    bias: &[f64],
    output: &mut [f64],
    d: &DenseDims,
) {
    const LANES: usize = 4;
    let chunks = d.out_w / LANES;

    for ch in 0..chunks {
        let o0 = ch * LANES;
        let mut acc = _mm256_loadu_pd(bias.as_ptr().add(o0));

        for h in 0..d.in_w {
            let xv = _mm256_set1_pd(*input.get_unchecked(h));
            let wv = _mm256_loadu_pd(weight.as_ptr().add(h * d.out_w + o0));
            acc = _mm256_fmadd_pd(xv, wv, acc);
        }

        _mm256_storeu_pd(output.as_mut_ptr().add(o0), acc);
    }

    for o in (chunks * LANES)..d.out_w {
        let mut sum = bias[o];
        for h in 0..d.in_w {
            sum += input.get_unchecked(h) * weight.get_unchecked(h * d.out_w + o);
        }
        output[o] = sum;
    }
}
