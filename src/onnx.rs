//! ONNX Runtime model backend

use std::fmt::Display;
use std::path::Path;
use std::time::Instant;

use ndarray::{Array3, ArrayView3};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use crate::config::InterpolatorConfig;
use crate::error::{Error, Result};
use crate::pipeline::{FrameModel, ModelInputs};

fn model_load_error<E: Display>(path: &Path, err: E) -> Error {
    Error::ModelLoad {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn inference_error<E: Display>(err: E) -> Error {
    Error::Inference(err.to_string())
}

/// Batch-of-one NCHW tensor over a planar `(c, h, w)` array.
fn nchw_tensor(plane: &ArrayView3<f32>) -> Result<Tensor<f32>> {
    let (c, h, w) = plane.dim();
    let data: Vec<f32> = plane.iter().copied().collect();
    Tensor::from_array(([1usize, c, h, w], data)).map_err(inference_error)
}

/// Interpolation network loaded into an ONNX Runtime session.
pub struct OnnxModel {
    session: Session,
}

impl OnnxModel {
    /// Load the network at `config.model_path`.
    pub fn load(config: &InterpolatorConfig) -> Result<Self> {
        let path = config.model_path.as_path();
        if !path.exists() {
            return Err(model_load_error(path, "file not found"));
        }

        let started = Instant::now();
        let session = Session::builder()
            .map_err(|e| model_load_error(path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| model_load_error(path, e))?
            .commit_from_file(path)
            .map_err(|e| model_load_error(path, e))?;

        info!(
            model = %path.display(),
            elapsed_ms = format!("{:.1}", started.elapsed().as_secs_f64() * 1000.0),
            "ONNX session created"
        );
        Ok(Self { session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl FrameModel for OnnxModel {
    fn infer(&mut self, inputs: &ModelInputs<'_>) -> Result<Array3<f32>> {
        let [(name0, view0), (name1, view1), (name_t, view_t)] = inputs.bindings();
        let tensor0 = nchw_tensor(&view0)?;
        let tensor1 = nchw_tensor(&view1)?;
        let tensor_t = nchw_tensor(&view_t)?;

        let t_run = Instant::now();
        let outputs = self
            .session
            .run(ort::inputs![name0 => &tensor0, name1 => &tensor1, name_t => &tensor_t])
            .map_err(inference_error)?;
        let session_run_ms = t_run.elapsed().as_secs_f64() * 1000.0;

        let output_name = inputs.names.output.as_str();
        let (shape, data) = outputs[output_name]
            .try_extract_tensor::<f32>()
            .map_err(inference_error)?;

        let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        let (c, h, w) = match dims.as_slice() {
            [1, c, h, w] | [c, h, w] => (*c, *h, *w),
            other => {
                return Err(Error::Inference(format!(
                    "output '{output_name}' has unexpected shape {other:?}"
                )))
            }
        };

        debug!(
            session_run_ms = format!("{session_run_ms:.1}"),
            width = w,
            height = h,
            "ONNX inference"
        );

        Array3::from_shape_vec((c, h, w), data.to_vec()).map_err(inference_error)
    }
}
