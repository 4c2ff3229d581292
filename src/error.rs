use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("[interpolator] model not initialized, call init() first")]
    NotReady,

    #[error("[interpolator] failed to load model {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    #[error("[interpolator] inference failed: {0}")]
    Inference(String),

    #[error("[warp] dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("[align] empty dimensions {width}x{height}")]
    EmptyDimension { width: usize, height: usize },

    #[error("[warp] flow field needs at least 2 channels (dx, dy), got {0}")]
    FlowChannels(usize),

    #[error("[align] stride must be non-zero")]
    InvalidStride,

    #[error("[align] padded size {target:?} is smaller than source {source_size:?}")]
    PadTooSmall {
        source_size: (usize, usize),
        target: (usize, usize),
    },

    #[error("[align] crop region {region:?} exceeds buffer {buffer:?}")]
    CropOutOfBounds {
        region: (usize, usize),
        buffer: (usize, usize),
    },

    #[error("[layout] size {width}x{height}x{channels} overflows usize")]
    SizeOverflow {
        width: usize,
        height: usize,
        channels: usize,
    },

    #[error("[layout] buffer length mismatch: expected {expected}, got {actual}")]
    BufferLength { expected: usize, actual: usize },

    #[error("[interpolator] model output shape {actual:?}, expected {expected:?}")]
    OutputShape {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    #[error("[warp] scalar fallback is disabled and no SIMD backend is available")]
    ScalarFallbackDisabled,

    #[error("[config] {0}")]
    Config(String),
}

impl Error {
    /// Only a call made before `init` can succeed by retrying later.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NotReady)
    }
}
