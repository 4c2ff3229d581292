//! Bilinear backward warp driven by a dense flow field
//!
//! For every output pixel `(x, y)` the flow gives a displacement `(dx, dy)`
//! and the output pulls from the source location `(x + dx, y + dy)`:
//!
//! ```text
//! x0 = floor(sx), x1 = x0 + 1      (each clamped to [0, w-1])
//! y0 = floor(sy), y1 = y0 + 1      (each clamped to [0, h-1])
//! alpha = sx - floor(sx), beta = sy - floor(sy)
//! top    = v(y0,x0) * (1-alpha) + v(y0,x1) * alpha
//! bottom = v(y1,x0) * (1-alpha) + v(y1,x1) * alpha
//! out    = top * (1-beta) + bottom * beta
//! ```
//!
//! Image and flow are planar. The flow is `(2, h, w)` with dx in channel 0
//! and dy in channel 1; every image channel is warped with the same flow.

use std::sync::atomic::{AtomicBool, Ordering};

use half::f16;
use ndarray::{Array3, ArrayView3, ArrayViewMut3};

use crate::error::{Error, Result};
use crate::Interpolate;

static SCALAR_FALLBACK_ALLOWED: AtomicBool = AtomicBool::new(true);

/// Allow or forbid the scalar path for f32 warps.
///
/// With the fallback forbidden, a warp that cannot run on a SIMD backend
/// returns [`Error::ScalarFallbackDisabled`] instead of silently running scalar.
pub fn set_scalar_fallback_allowed(allowed: bool) {
    SCALAR_FALLBACK_ALLOWED.store(allowed, Ordering::Relaxed);
}

pub fn scalar_fallback_allowed() -> bool {
    SCALAR_FALLBACK_ALLOWED.load(Ordering::Relaxed)
}

/// Kernel implementation selected for a warp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Avx2,
    Scalar,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Avx2 => "avx2",
            Backend::Scalar => "scalar",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend an f32 warp of a `plane_len`-pixel image would use on this CPU.
pub fn backend_for(plane_len: usize) -> Backend {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && plane_len <= crate::simd::avx2::MAX_GATHER_PLANE {
            return Backend::Avx2;
        }
    }
    let _ = plane_len;
    Backend::Scalar
}

/// Best backend available on this CPU.
pub fn active_backend() -> Backend {
    backend_for(0)
}

/// Check that `image` is `(c, h, w)` with `h, w >= 1` and `flow` is `(>=2, h, w)`.
pub fn validate_shapes<T>(image: &ArrayView3<T>, flow: &ArrayView3<f32>) -> Result<()> {
    let (_channels, h, w) = image.dim();
    let (flow_channels, flow_h, flow_w) = flow.dim();

    if w == 0 || h == 0 {
        return Err(Error::EmptyDimension { width: w, height: h });
    }
    if flow_channels < 2 {
        return Err(Error::FlowChannels(flow_channels));
    }
    if (flow_w, flow_h) != (w, h) {
        return Err(Error::DimensionMismatch {
            expected: (w, h),
            actual: (flow_w, flow_h),
        });
    }
    Ok(())
}

/// Warp a planar f32 image with a dense flow field
///
/// # Arguments
///
/// * `image` - Planar image `(channels, h, w)`
/// * `flow` - Planar flow `(2, h, w)`, channel 0 = dx, channel 1 = dy, in pixels.
///   Extra channels are ignored.
///
/// # Returns
///
/// Warped image with the same shape as `image`
pub fn warp_bilinear(image: &ArrayView3<f32>, flow: &ArrayView3<f32>) -> Result<Array3<f32>> {
    let mut output = Array3::<f32>::zeros(image.dim());
    warp_bilinear_into(image, flow, &mut output.view_mut())?;
    Ok(output)
}

/// Warp into a caller-provided output buffer of the same shape as `image`.
pub fn warp_bilinear_into(
    image: &ArrayView3<f32>,
    flow: &ArrayView3<f32>,
    output: &mut ArrayViewMut3<f32>,
) -> Result<()> {
    validate_shapes(image, flow)?;
    check_output_shape(image.dim(), output.dim())?;

    let (_c, h, w) = image.dim();
    let image = image.as_standard_layout();
    let flow = two_channel_flow(flow);

    let backend = backend_for(h * w);
    if backend == Backend::Scalar && !scalar_fallback_allowed() {
        return Err(Error::ScalarFallbackDisabled);
    }

    with_contiguous_output(output, |out| match backend {
        #[cfg(target_arch = "x86_64")]
        Backend::Avx2 => unsafe {
            crate::simd::avx2::warp_bilinear_f32_avx2(&image.view(), &flow.view(), out);
        },
        _ => crate::scalar::warp_bilinear_scalar(&image.view(), &flow.view(), out),
    });
    Ok(())
}

/// Warp an f16 image with an f32 flow field.
///
/// Samples are widened to f32, blended in f32 and rounded once to f16.
pub fn warp_bilinear_f16(image: &ArrayView3<f16>, flow: &ArrayView3<f32>) -> Result<Array3<f16>> {
    validate_shapes(image, flow)?;
    let image = image.as_standard_layout();
    let flow = two_channel_flow(flow);

    let mut output = Array3::from_elem(image.dim(), f16::ZERO);
    crate::scalar::warp_bilinear_scalar(&image.view(), &flow.view(), &mut output.view_mut());
    Ok(output)
}

/// Scalar warp for any [`Interpolate`] sample type, bypassing SIMD dispatch.
pub fn warp_bilinear_generic<T: Interpolate>(
    image: &ArrayView3<T>,
    flow: &ArrayView3<f32>,
) -> Result<Array3<T>> {
    validate_shapes(image, flow)?;
    let image = image.as_standard_layout();
    let flow = two_channel_flow(flow);

    let mut output = Array3::from_elem(image.dim(), T::default());
    crate::scalar::warp_bilinear_scalar(&image.view(), &flow.view(), &mut output.view_mut());
    Ok(output)
}

fn check_output_shape(
    expected: (usize, usize, usize),
    actual: (usize, usize, usize),
) -> Result<()> {
    if expected != actual {
        return Err(Error::OutputShape { expected, actual });
    }
    Ok(())
}

/// Contiguous copy of the first two flow channels (dx, dy).
fn two_channel_flow(flow: &ArrayView3<f32>) -> Array3<f32> {
    flow.slice(ndarray::s![..2, .., ..]).as_standard_layout().into_owned()
}

/// Run `f` on `output` directly when it is C-contiguous, otherwise through a scratch buffer.
fn with_contiguous_output<F>(output: &mut ArrayViewMut3<f32>, f: F)
where
    F: FnOnce(&mut ArrayViewMut3<f32>),
{
    if output.is_standard_layout() {
        f(output);
    } else {
        let mut scratch = Array3::<f32>::zeros(output.dim());
        f(&mut scratch.view_mut());
        output.assign(&scratch);
    }
}
