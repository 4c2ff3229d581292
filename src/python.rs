//! Python bindings using PyO3

use std::path::PathBuf;

use numpy::{IntoPyArray, PyArray1, PyArray3, PyReadonlyArray1, PyReadonlyArray3};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::{
    build_info as native_build_info, padded_size as native_padded_size,
    set_scalar_fallback_allowed, warp_bilinear, Error, Interpolator, InterpolatorConfig,
    OnnxModel, PAD_STRIDE,
};

impl From<Error> for PyErr {
    fn from(err: Error) -> PyErr {
        match err {
            Error::NotReady
            | Error::ModelLoad { .. }
            | Error::Inference(_)
            | Error::ScalarFallbackDisabled => PyRuntimeError::new_err(err.to_string()),
            _ => PyValueError::new_err(err.to_string()),
        }
    }
}

/// Frame interpolator backed by an ONNX model
///
/// Call init() once before run_inference().
#[pyclass(name = "Interpolator")]
struct PyInterpolator {
    inner: Interpolator<OnnxModel>,
}

#[pymethods]
impl PyInterpolator {
    /// Args:
    ///     model_path: Path to the ONNX network (default: flownet.onnx)
    ///     config_path: Optional TOML file with stride / tensor names
    #[new]
    #[pyo3(signature = (model_path=None, config_path=None))]
    fn new(model_path: Option<PathBuf>, config_path: Option<PathBuf>) -> PyResult<Self> {
        let mut config = match config_path {
            Some(path) => InterpolatorConfig::load_from_path(&path)?,
            None => InterpolatorConfig::default(),
        };
        if let Some(path) = model_path {
            config.model_path = path;
        }
        Ok(Self {
            inner: Interpolator::new(config)?,
        })
    }

    /// Load the model. Idempotent.
    fn init(&mut self) -> PyResult<()> {
        self.inner.init(&OnnxModel::load)?;
        Ok(())
    }

    #[getter]
    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    /// Interpolate between two interleaved RGB float32 buffers
    ///
    /// Args:
    ///     img0, img1: 1D float32 arrays of width * height * 3 values
    ///     width, height: Frame size in pixels
    ///     timestep: Position between the frames, 0.0 = img0, 1.0 = img1
    ///
    /// Returns:
    ///     1D float32 array of the same length as the inputs
    ///
    /// Raises:
    ///     RuntimeError: If init() has not succeeded or inference fails
    ///     ValueError: If buffer lengths do not match width * height * 3
    #[pyo3(signature = (img0, img1, width, height, timestep=0.5))]
    fn run_inference<'py>(
        &mut self,
        py: Python<'py>,
        img0: PyReadonlyArray1<'py, f32>,
        img1: PyReadonlyArray1<'py, f32>,
        width: usize,
        height: usize,
        timestep: f32,
    ) -> PyResult<Bound<'py, PyArray1<f32>>> {
        let img0 = img0.as_slice()?;
        let img1 = img1.as_slice()?;
        let inner = &mut self.inner;
        let frame = py.allow_threads(|| inner.interpolate(img0, img1, width, height, timestep))?;
        Ok(frame.into_pyarray(py))
    }
}

/// Backward-warp a planar (channels, height, width) float32 image by a
/// (2, height, width) flow field with bilinear sampling and edge clamping
///
/// Channel 0 of the flow is the x displacement, channel 1 the y displacement.
#[pyfunction]
fn warp<'py>(
    py: Python<'py>,
    image: PyReadonlyArray3<'py, f32>,
    flow: PyReadonlyArray3<'py, f32>,
) -> PyResult<Bound<'py, PyArray3<f32>>> {
    let output = warp_bilinear(&image.as_array(), &flow.as_array())?;
    Ok(output.into_pyarray(py))
}

/// Round (width, height) up to the next multiple of stride (default 32)
#[pyfunction]
#[pyo3(signature = (width, height, stride=PAD_STRIDE))]
fn padded_size(width: usize, height: usize, stride: usize) -> PyResult<(usize, usize)> {
    Ok(native_padded_size(width, height, stride)?)
}

/// Get build and runtime information
///
/// Returns a dictionary with version, backend, parallel, num_threads and onnx.
#[pyfunction]
fn build_info(py: Python<'_>) -> PyResult<Bound<'_, PyDict>> {
    let native = native_build_info();
    let info = PyDict::new(py);
    info.set_item("version", native.version)?;
    info.set_item("backend", native.backend.as_str())?;
    info.set_item("parallel", native.parallel)?;
    info.set_item("num_threads", native.num_threads)?;
    info.set_item("onnx", native.onnx)?;
    Ok(info)
}

/// Set whether scalar fallback is allowed (internal use)
///
/// When set to False, a warp that would take the scalar path raises RuntimeError.
#[pyfunction]
fn _set_scalar_fallback_allowed(allowed: bool) {
    set_scalar_fallback_allowed(allowed);
}

/// Flow-based frame interpolation with an AVX2 bilinear warp kernel
#[pymodule]
fn flowwarp(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyInterpolator>()?;
    m.add_function(wrap_pyfunction!(warp, m)?)?;
    m.add_function(wrap_pyfunction!(padded_size, m)?)?;
    m.add_function(wrap_pyfunction!(build_info, m)?)?;
    m.add_function(wrap_pyfunction!(_set_scalar_fallback_allowed, m)?)?;
    Ok(())
}
