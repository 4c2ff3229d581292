//! Frame-pair interpolation pipeline
//!
//! Sequences one inference call: interleaved → planar, pad both frames to the
//! model stride, broadcast the timestep into a `(1, h_padded, w_padded)` field,
//! run the model, crop back and re-interleave.
//!
//! The model is an external collaborator behind [`FrameModel`]. It receives
//! two planar 3-channel frames and the timestep field, bound to the names in
//! [`TensorNames`], and returns a planar 3-channel frame of the padded size.
//! An [`Interpolator`] owns exactly one model handle; calls take `&mut self`
//! so inference against a single model is always serialised.

use std::time::Instant;

use ndarray::{Array3, ArrayView3};
use tracing::{debug, info};

use crate::align::Alignment;
use crate::config::{InterpolatorConfig, TensorNames};
use crate::error::{Error, Result};
use crate::layout::{planar_to_interleaved, InterleavedImage};

/// Inputs of one model invocation, all of the padded spatial size.
#[derive(Debug, Clone, Copy)]
pub struct ModelInputs<'a> {
    pub image0: ArrayView3<'a, f32>,
    pub image1: ArrayView3<'a, f32>,
    /// `(1, h, w)` field holding the timestep at every pixel.
    pub timestep: ArrayView3<'a, f32>,
    pub names: &'a TensorNames,
}

impl<'a> ModelInputs<'a> {
    /// Inputs paired with the tensor names they bind to.
    pub fn bindings(&self) -> [(&'a str, ArrayView3<'a, f32>); 3] {
        [
            (self.names.image0.as_str(), self.image0),
            (self.names.image1.as_str(), self.image1),
            (self.names.timestep.as_str(), self.timestep),
        ]
    }

    /// Padded `(width, height)` shared by all inputs.
    pub fn size(&self) -> (usize, usize) {
        let (_c, h, w) = self.image0.dim();
        (w, h)
    }
}

/// Tensor-in / tensor-out interpolation model.
pub trait FrameModel {
    /// Produce the intermediate frame as a planar array of the inputs' padded size.
    fn infer(&mut self, inputs: &ModelInputs<'_>) -> Result<Array3<f32>>;
}

impl<M: FrameModel + ?Sized> FrameModel for Box<M> {
    fn infer(&mut self, inputs: &ModelInputs<'_>) -> Result<Array3<f32>> {
        (**self).infer(inputs)
    }
}

/// One-time model acquisition used by [`Interpolator::init`].
pub trait ModelLoader {
    type Model: FrameModel;

    fn load(&self, config: &InterpolatorConfig) -> Result<Self::Model>;
}

impl<F, M> ModelLoader for F
where
    F: Fn(&InterpolatorConfig) -> Result<M>,
    M: FrameModel,
{
    type Model = M;

    fn load(&self, config: &InterpolatorConfig) -> Result<M> {
        self(config)
    }
}

/// Evenly spaced timesteps for an N× frame-rate multiplier.
///
/// 2× → `[0.5]`, 3× → `[1/3, 2/3]`, 4× → `[0.25, 0.5, 0.75]`. Multipliers below 2 yield nothing.
pub fn timesteps_for_multiplier(multiplier: u32) -> Vec<f32> {
    (1..multiplier.max(1))
        .map(|i| i as f32 / multiplier as f32)
        .collect()
}

/// Pads, runs and crops frame pairs against an owned model handle.
pub struct Interpolator<M> {
    config: InterpolatorConfig,
    model: Option<M>,
}

impl<M: FrameModel> Interpolator<M> {
    /// Uninitialised interpolator; call [`init`](Self::init) before inference.
    pub fn new(config: InterpolatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            model: None,
        })
    }

    /// Interpolator around an already loaded model.
    pub fn with_model(config: InterpolatorConfig, model: M) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            model: Some(model),
        })
    }

    pub fn config(&self) -> &InterpolatorConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    /// Release the model handle.
    pub fn into_model(self) -> Option<M> {
        self.model
    }

    /// Load the model once. Calling again after a successful load does nothing.
    ///
    /// A failed load leaves the interpolator uninitialised.
    pub fn init<L>(&mut self, loader: &L) -> Result<()>
    where
        L: ModelLoader<Model = M>,
    {
        if self.model.is_some() {
            debug!("model already loaded, skipping init");
            return Ok(());
        }

        let started = Instant::now();
        let model = loader.load(&self.config)?;
        info!(
            model = %self.config.model_path.display(),
            elapsed_ms = format!("{:.1}", started.elapsed().as_secs_f64() * 1000.0),
            "interpolation model loaded"
        );
        self.model = Some(model);
        Ok(())
    }

    /// Interpolate between two interleaved RGB frames.
    ///
    /// Both buffers hold `width * height * 3` values in row-major pixel order.
    /// Returns an interleaved buffer of the same size.
    pub fn interpolate(
        &mut self,
        image0: &[f32],
        image1: &[f32],
        width: usize,
        height: usize,
        timestep: f32,
    ) -> Result<Vec<f32>> {
        let mut frames = self.interpolate_many(image0, image1, width, height, &[timestep])?;
        frames.pop().ok_or_else(|| Error::Inference("no frame produced".to_string()))
    }

    /// Interpolate one frame per timestep, padding the input pair only once.
    pub fn interpolate_many(
        &mut self,
        image0: &[f32],
        image1: &[f32],
        width: usize,
        height: usize,
        timesteps: &[f32],
    ) -> Result<Vec<Vec<f32>>> {
        if self.model.is_none() {
            return Err(Error::NotReady);
        }
        let planar0 = InterleavedImage::rgb(image0, width, height)?.to_planar();
        let planar1 = InterleavedImage::rgb(image1, width, height)?.to_planar();

        let frames = self.interpolate_planar_many(&planar0.view(), &planar1.view(), timesteps)?;
        Ok(frames
            .iter()
            .map(|frame| planar_to_interleaved(&frame.view()))
            .collect())
    }

    /// Interpolate between two planar `(c, h, w)` frames.
    pub fn interpolate_planar(
        &mut self,
        image0: &ArrayView3<f32>,
        image1: &ArrayView3<f32>,
        timestep: f32,
    ) -> Result<Array3<f32>> {
        let mut frames = self.interpolate_planar_many(image0, image1, &[timestep])?;
        frames.pop().ok_or_else(|| Error::Inference("no frame produced".to_string()))
    }

    pub fn interpolate_planar_many(
        &mut self,
        image0: &ArrayView3<f32>,
        image1: &ArrayView3<f32>,
        timesteps: &[f32],
    ) -> Result<Vec<Array3<f32>>> {
        let model = self.model.as_mut().ok_or(Error::NotReady)?;

        let (channels, height, width) = image0.dim();
        let (_c1, h1, w1) = image1.dim();
        if image0.dim() != image1.dim() {
            return Err(Error::DimensionMismatch {
                expected: (width, height),
                actual: (w1, h1),
            });
        }

        let started = Instant::now();
        let alignment = Alignment::new(width, height, self.config.stride)?;
        let padded0 = alignment.pad(image0)?;
        let padded1 = alignment.pad(image1)?;
        let pad_ms = started.elapsed().as_secs_f64() * 1000.0;

        let expected = (channels, alignment.padded_height, alignment.padded_width);
        let mut frames = Vec::with_capacity(timesteps.len());
        let mut infer_ms = 0.0;
        let mut crop_ms = 0.0;

        for &t in timesteps {
            let timestep_field =
                Array3::from_elem((1, alignment.padded_height, alignment.padded_width), t);
            let inputs = ModelInputs {
                image0: padded0.view(),
                image1: padded1.view(),
                timestep: timestep_field.view(),
                names: &self.config.tensors,
            };

            let t_infer = Instant::now();
            let output = model.infer(&inputs)?;
            infer_ms += t_infer.elapsed().as_secs_f64() * 1000.0;

            if output.dim() != expected {
                return Err(Error::OutputShape {
                    expected,
                    actual: output.dim(),
                });
            }

            let t_crop = Instant::now();
            frames.push(alignment.crop(&output.view())?);
            crop_ms += t_crop.elapsed().as_secs_f64() * 1000.0;
        }

        debug!(
            width,
            height,
            padded_width = alignment.padded_width,
            padded_height = alignment.padded_height,
            timesteps = timesteps.len(),
            pad_ms = format!("{pad_ms:.1}"),
            infer_ms = format!("{infer_ms:.1}"),
            crop_ms = format!("{crop_ms:.1}"),
            total_ms = format!("{:.1}", started.elapsed().as_secs_f64() * 1000.0),
            "frame pair interpolated"
        );

        Ok(frames)
    }
}
