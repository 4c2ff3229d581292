//! Stride alignment for inference inputs
//!
//! The interpolation graph only accepts spatial dimensions that are a
//! multiple of a fixed stride. Inputs are zero-padded on the bottom and right
//! edges before inference and the output is cropped back afterwards, so pixel
//! coordinates are identical in the padded and unpadded buffers.
//!
//! All buffers are planar `(channels, height, width)`.

use ndarray::{s, Array3, ArrayView3};

use crate::error::{Error, Result};

/// Default alignment stride of the interpolation graph.
pub const PAD_STRIDE: usize = 32;

/// Round `(width, height)` up to the next multiple of `stride`.
pub fn padded_size(width: usize, height: usize, stride: usize) -> Result<(usize, usize)> {
    if stride == 0 {
        return Err(Error::InvalidStride);
    }
    if width == 0 || height == 0 {
        return Err(Error::EmptyDimension { width, height });
    }
    let overflow = || Error::SizeOverflow {
        width,
        height,
        channels: 1,
    };
    let padded_width = width.checked_next_multiple_of(stride).ok_or_else(overflow)?;
    let padded_height = height.checked_next_multiple_of(stride).ok_or_else(overflow)?;
    Ok((padded_width, padded_height))
}

/// Copy `image` into the top-left corner of a zeroed `(c, padded_height, padded_width)` buffer.
pub fn pad(image: &ArrayView3<f32>, padded_width: usize, padded_height: usize) -> Result<Array3<f32>> {
    let (channels, height, width) = image.dim();
    if padded_width < width || padded_height < height {
        return Err(Error::PadTooSmall {
            source_size: (width, height),
            target: (padded_width, padded_height),
        });
    }

    let mut padded = Array3::<f32>::zeros((channels, padded_height, padded_width));
    padded.slice_mut(s![.., ..height, ..width]).assign(image);
    Ok(padded)
}

/// Extract the top-left `width x height` region of every channel.
pub fn crop(padded: &ArrayView3<f32>, width: usize, height: usize) -> Result<Array3<f32>> {
    let (_channels, padded_height, padded_width) = padded.dim();
    if width > padded_width || height > padded_height {
        return Err(Error::CropOutOfBounds {
            region: (width, height),
            buffer: (padded_width, padded_height),
        });
    }
    Ok(padded.slice(s![.., ..height, ..width]).to_owned())
}

/// Source and padded dimensions for one frame pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    pub width: usize,
    pub height: usize,
    pub padded_width: usize,
    pub padded_height: usize,
}

impl Alignment {
    pub fn new(width: usize, height: usize, stride: usize) -> Result<Self> {
        let (padded_width, padded_height) = padded_size(width, height, stride)?;
        Ok(Self {
            width,
            height,
            padded_width,
            padded_height,
        })
    }

    /// True when no padding is needed.
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.width == self.padded_width && self.height == self.padded_height
    }

    pub fn pad(&self, image: &ArrayView3<f32>) -> Result<Array3<f32>> {
        let (_c, h, w) = image.dim();
        if (w, h) != (self.width, self.height) {
            return Err(Error::DimensionMismatch {
                expected: (self.width, self.height),
                actual: (w, h),
            });
        }
        pad(image, self.padded_width, self.padded_height)
    }

    pub fn crop(&self, padded: &ArrayView3<f32>) -> Result<Array3<f32>> {
        crop(padded, self.width, self.height)
    }
}
