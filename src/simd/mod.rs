//! SIMD-optimized warp implementations

#[cfg(target_arch = "x86_64")]
pub mod avx2;
