//! AVX2-optimized bilinear flow warp
//!
//! Processes 8 output pixels per iteration: sample positions, floors and
//! blend weights are computed in 256-bit registers and the four corners are
//! fetched with gathers. No fused multiply-add is used so the results match
//! the scalar kernel bit for bit.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use ndarray::{ArrayView3, ArrayViewMut3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::scalar;

/// Largest plane (in elements) that 32-bit gather offsets can address.
pub const MAX_GATHER_PLANE: usize = i32::MAX as usize;

/// AVX2 bilinear backward warp of a planar `(c, h, w)` f32 image
///
/// # Safety
///
/// Requires the AVX2 CPU feature. Caller must verify it is available, that
/// all arrays are C-contiguous with validated shapes, and that
/// `h * w <= MAX_GATHER_PLANE`.
///
/// # Panics
///
/// Panics if `output` and `image` differ in shape, if `flow` is not
/// `(>=2, h, w)`, or if any array is not C-contiguous.
#[target_feature(enable = "avx2")]
pub unsafe fn warp_bilinear_f32_avx2(
    image: &ArrayView3<f32>,
    flow: &ArrayView3<f32>,
    output: &mut ArrayViewMut3<f32>,
) {
    let (_c, h, w) = image.dim();
    assert_eq!(output.dim(), image.dim(), "output shape must match image");
    assert!(
        flow.dim().0 >= 2 && (flow.dim().1, flow.dim().2) == (h, w),
        "flow must be (>=2, {h}, {w}), got {:?}",
        flow.dim()
    );
    if w == 0 || h == 0 {
        return;
    }
    let plane_len = h * w;

    let image_slice = image.as_slice().expect("Image must be C-contiguous");
    let flow_slice = flow.as_slice().expect("Flow must be C-contiguous");
    let output_slice = output.as_slice_mut().expect("Output must be C-contiguous");

    let flow_x = &flow_slice[..plane_len];
    let flow_y = &flow_slice[plane_len..2 * plane_len];

    let process = |(i, out_row): (usize, &mut [f32])| {
        let q = i / h;
        let y = i % h;
        let plane = &image_slice[q * plane_len..(q + 1) * plane_len];
        let row = y * w..(y + 1) * w;
        // SAFETY: AVX2 availability is guaranteed by the caller of this function.
        unsafe { warp_row_f32_avx2(plane, &flow_x[row.clone()], &flow_y[row], y, w, h, out_row) };
    };

    #[cfg(feature = "parallel")]
    output_slice.par_chunks_mut(w).enumerate().for_each(process);

    #[cfg(not(feature = "parallel"))]
    output_slice.chunks_mut(w).enumerate().for_each(process);
}

/// Warp one output row of one channel, 8 pixels at a time.
///
/// # Safety
///
/// Requires AVX2. `plane` must hold `w * h` values with `w * h <= MAX_GATHER_PLANE`;
/// the flow rows and `out_row` must hold at least `w` values.
#[target_feature(enable = "avx2")]
#[allow(clippy::too_many_arguments)]
pub unsafe fn warp_row_f32_avx2(
    plane: &[f32],
    flow_x_row: &[f32],
    flow_y_row: &[f32],
    y: usize,
    w: usize,
    h: usize,
    out_row: &mut [f32],
) {
    let one = _mm256_set1_ps(1.0);
    let lane_offsets = _mm256_setr_ps(0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0);

    // Floors are pre-clamped to [-1, len] so the i32 conversion cannot
    // overflow; clamping the corners afterwards gives the same indices.
    let x_lo = _mm256_set1_ps(-1.0);
    let x_hi = _mm256_set1_ps(w as f32);
    let y_lo = _mm256_set1_ps(-1.0);
    let y_hi = _mm256_set1_ps(h as f32);

    let zero_i = _mm256_setzero_si256();
    let one_i = _mm256_set1_epi32(1);
    let max_x = _mm256_set1_epi32(w as i32 - 1);
    let max_y = _mm256_set1_epi32(h as i32 - 1);
    let stride = _mm256_set1_epi32(w as i32);

    let vy = _mm256_set1_ps(y as f32);
    let base = plane.as_ptr();

    let mut x = 0usize;
    while x + 8 <= w {
        let vx = _mm256_add_ps(_mm256_set1_ps(x as f32), lane_offsets);

        let sx = _mm256_add_ps(vx, _mm256_loadu_ps(flow_x_row.as_ptr().add(x)));
        let sy = _mm256_add_ps(vy, _mm256_loadu_ps(flow_y_row.as_ptr().add(x)));

        let sx_floor = _mm256_floor_ps(sx);
        let sy_floor = _mm256_floor_ps(sy);

        let alpha = _mm256_sub_ps(sx, sx_floor);
        let beta = _mm256_sub_ps(sy, sy_floor);

        let xi = _mm256_cvttps_epi32(_mm256_min_ps(_mm256_max_ps(sx_floor, x_lo), x_hi));
        let yi = _mm256_cvttps_epi32(_mm256_min_ps(_mm256_max_ps(sy_floor, y_lo), y_hi));

        let x0 = _mm256_min_epi32(_mm256_max_epi32(xi, zero_i), max_x);
        let x1 = _mm256_min_epi32(_mm256_max_epi32(_mm256_add_epi32(xi, one_i), zero_i), max_x);
        let y0 = _mm256_min_epi32(_mm256_max_epi32(yi, zero_i), max_y);
        let y1 = _mm256_min_epi32(_mm256_max_epi32(_mm256_add_epi32(yi, one_i), zero_i), max_y);

        let row0 = _mm256_mullo_epi32(y0, stride);
        let row1 = _mm256_mullo_epi32(y1, stride);

        let v0 = _mm256_i32gather_ps::<4>(base, _mm256_add_epi32(row0, x0));
        let v1 = _mm256_i32gather_ps::<4>(base, _mm256_add_epi32(row0, x1));
        let v2 = _mm256_i32gather_ps::<4>(base, _mm256_add_epi32(row1, x0));
        let v3 = _mm256_i32gather_ps::<4>(base, _mm256_add_epi32(row1, x1));

        let one_minus_alpha = _mm256_sub_ps(one, alpha);
        let one_minus_beta = _mm256_sub_ps(one, beta);

        let top = _mm256_add_ps(_mm256_mul_ps(v0, one_minus_alpha), _mm256_mul_ps(v1, alpha));
        let bottom = _mm256_add_ps(_mm256_mul_ps(v2, one_minus_alpha), _mm256_mul_ps(v3, alpha));
        let result = _mm256_add_ps(_mm256_mul_ps(top, one_minus_beta), _mm256_mul_ps(bottom, beta));

        _mm256_storeu_ps(out_row.as_mut_ptr().add(x), result);

        x += 8;
    }

    // Scalar cleanup
    let y_f = y as f32;
    while x < w {
        let sx = x as f32 + flow_x_row[x];
        let sy = y_f + flow_y_row[x];
        out_row[x] = scalar::sample_bilinear_clamped(plane, w, h, sx, sy);
        x += 1;
    }
}
