//! Scalar (non-SIMD) implementation of the bilinear flow warp
//!
//! This is the fallback when AVX2 is not available and the reference the
//! vector path is tested against. Both paths perform the same sequence of
//! f32 operations per pixel, so their outputs are bit-identical.

use crate::Interpolate;
use ndarray::{ArrayView3, ArrayViewMut3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Clamp a (possibly negative) sample index into `[0, len - 1]`.
#[inline(always)]
pub(crate) fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Bilinear sample of a `w x h` plane at `(sx, sy)` with edge replication
///
/// Each of the four corner indices is clamped on its own, while the blend
/// weights come from the unclamped fractional position. A location far
/// outside the plane therefore blends edge pixels instead of extrapolating.
#[inline]
pub fn sample_bilinear_clamped<T: Interpolate>(
    plane: &[T],
    w: usize,
    h: usize,
    sx: f32,
    sy: f32,
) -> f32 {
    let sx_floor = sx.floor();
    let sy_floor = sy.floor();

    let xi = sx_floor as isize;
    let yi = sy_floor as isize;

    let x0 = clamp_index(xi, w);
    let x1 = clamp_index(xi.saturating_add(1), w);
    let y0 = clamp_index(yi, h);
    let y1 = clamp_index(yi.saturating_add(1), h);

    let alpha = sx - sx_floor;
    let beta = sy - sy_floor;

    let v0 = plane[y0 * w + x0].to_f32();
    let v1 = plane[y0 * w + x1].to_f32();
    let v2 = plane[y1 * w + x0].to_f32();
    let v3 = plane[y1 * w + x1].to_f32();

    let top = v0 * (1.0 - alpha) + v1 * alpha;
    let bottom = v2 * (1.0 - alpha) + v3 * alpha;

    top * (1.0 - beta) + bottom * beta
}

/// Warp one output row of one channel.
#[inline]
pub fn warp_row<T: Interpolate>(
    plane: &[T],
    flow_x_row: &[f32],
    flow_y_row: &[f32],
    y: usize,
    w: usize,
    h: usize,
    out_row: &mut [T],
) {
    let y_f = y as f32;
    for (x, out) in out_row.iter_mut().enumerate().take(w) {
        let sx = x as f32 + flow_x_row[x];
        let sy = y_f + flow_y_row[x];
        *out = T::from_f32(sample_bilinear_clamped(plane, w, h, sx, sy));
    }
}

/// Scalar bilinear backward warp of a planar `(c, h, w)` image
///
/// `flow` is planar `(>=2, h, w)`: channel 0 is dx, channel 1 is dy.
/// Prefer [`crate::warp_bilinear`], which validates and returns errors.
///
/// # Panics
///
/// Panics if `output` and `image` differ in shape, if `flow` is not
/// `(>=2, h, w)`, or if any array is not C-contiguous.
pub fn warp_bilinear_scalar<T: Interpolate>(
    image: &ArrayView3<T>,
    flow: &ArrayView3<f32>,
    output: &mut ArrayViewMut3<T>,
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

    // One chunk per (channel, row); channel = i / h, row = i % h.
    let process = |(i, out_row): (usize, &mut [T])| {
        let q = i / h;
        let y = i % h;
        let plane = &image_slice[q * plane_len..(q + 1) * plane_len];
        let row = y * w..(y + 1) * w;
        warp_row(plane, &flow_x[row.clone()], &flow_y[row], y, w, h, out_row);
    };

    #[cfg(feature = "parallel")]
    output_slice.par_chunks_mut(w).enumerate().for_each(process);

    #[cfg(not(feature = "parallel"))]
    output_slice.chunks_mut(w).enumerate().for_each(process);
}
