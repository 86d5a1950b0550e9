//! SIMD detection and dispatch for the vectorized kernels
//!
//! The SIMD strategy vectorizes over the output-channel axis, which is
//! contiguous in both the channel-last activations and the
//! `[fh][fw][c_in][c_out]` filter banks - a broadcast of one input value
//! against a vector of per-channel weights, accumulated with FMA.
//!
//! Dispatch is by runtime CPU feature detection; on machines without
//! AVX2+FMA (or on non-x86-64 targets) the vectorized entry points fall
//! back to the scalar baseline, which computes the identical transform.

pub mod conv;
pub mod dense;
pub mod pool;

use std::sync::OnceLock;

/// SIMD capability level detected at runtime
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SimdLevel {
    /// AVX2 with FMA support (256-bit vectors, 8 f32s or 4 f64s)
    Avx2Fma = 1,
    /// Scalar fallback (no SIMD)
    Scalar = 0,
}

impl SimdLevel {
    /// Number of f32 elements per vector register
    #[inline]
    pub const fn f32_lanes(self) -> usize {
        match self {
            Self::Avx2Fma => 8,
            Self::Scalar => 1,
        }
    }

    /// Number of f64 elements per vector register
    #[inline]
    pub const fn f64_lanes(self) -> usize {
        match self {
            Self::Avx2Fma => 4,
            Self::Scalar => 1,
        }
    }

    /// Name of this SIMD level as a string
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Avx2Fma => "AVX2+FMA",
            Self::Scalar => "Scalar",
        }
    }
}

impl std::fmt::Display for SimdLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached SIMD level detection
static SIMD_LEVEL: OnceLock<SimdLevel> = OnceLock::new();

/// Detect the best available SIMD level for the current CPU
///
/// The first call performs detection; subsequent calls return the cached
/// result.
#[inline]
pub fn detect_simd() -> SimdLevel {
    *SIMD_LEVEL.get_or_init(detect_simd_uncached)
}

#[cold]
fn detect_simd_uncached() -> SimdLevel {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return SimdLevel::Avx2Fma;
        }
    }

    SimdLevel::Scalar
}
