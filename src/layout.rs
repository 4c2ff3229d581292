//! Pixel layout conversion at the host boundary
//!
//! Hosts hand over interleaved row-major pixels (`RGBRGB...`); the warp
//! kernel and the model work on planar `(channels, height, width)` arrays.

use ndarray::{Array3, ArrayView3};

use crate::error::{Error, Result};

/// Element count of a `width x height` interleaved image with `channels` values per pixel.
fn interleaved_len(width: usize, height: usize, channels: usize) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(Error::EmptyDimension { width, height });
    }
    width
        .checked_mul(height)
        .and_then(|pixels| pixels.checked_mul(channels))
        .ok_or(Error::SizeOverflow {
            width,
            height,
            channels,
        })
}

/// Borrowed interleaved image: `width * height * channels` values, pixel-major.
#[derive(Debug, Clone, Copy)]
pub struct InterleavedImage<'a> {
    pub data: &'a [f32],
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

impl<'a> InterleavedImage<'a> {
    /// Wrap an interleaved RGB buffer, checking its length.
    pub fn rgb(data: &'a [f32], width: usize, height: usize) -> Result<Self> {
        Self::new(data, width, height, 3)
    }

    pub fn new(data: &'a [f32], width: usize, height: usize, channels: usize) -> Result<Self> {
        let expected = interleaved_len(width, height, channels)?;
        if data.len() != expected {
            return Err(Error::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// De-interleave into a planar `(channels, height, width)` array.
    pub fn to_planar(&self) -> Array3<f32> {
        let (w, c) = (self.width, self.channels);
        Array3::from_shape_fn((c, self.height, w), |(q, y, x)| self.data[(y * w + x) * c + q])
    }
}

/// De-interleave `width * height * channels` values into a planar array.
pub fn interleaved_to_planar(
    data: &[f32],
    width: usize,
    height: usize,
    channels: usize,
) -> Result<Array3<f32>> {
    Ok(InterleavedImage::new(data, width, height, channels)?.to_planar())
}

/// Interleave a planar `(channels, height, width)` array into a flat pixel-major buffer.
pub fn planar_to_interleaved(planar: &ArrayView3<f32>) -> Vec<f32> {
    let hwc = planar.view().permuted_axes([1, 2, 0]);
    hwc.iter().copied().collect()
}

/// Normalise 8-bit interleaved pixels to `[0, 1]` and de-interleave.
pub fn interleaved_u8_to_planar(
    data: &[u8],
    width: usize,
    height: usize,
    channels: usize,
) -> Result<Array3<f32>> {
    let expected = interleaved_len(width, height, channels)?;
    if data.len() != expected {
        return Err(Error::BufferLength {
            expected,
            actual: data.len(),
        });
    }
    Ok(Array3::from_shape_fn((channels, height, width), |(q, y, x)| {
        data[(y * width + x) * channels + q] as f32 / 255.0
    }))
}

/// Interleave a planar `[0, 1]` array into 8-bit pixels, rounding and clamping.
pub fn planar_to_interleaved_u8(planar: &ArrayView3<f32>) -> Vec<u8> {
    planar
        .view()
        .permuted_axes([1, 2, 0])
        .iter()
        .map(|&v| (v * 255.0 + 0.5).clamp(0.0, 255.0) as u8)
        .collect()
}
