use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::align::PAD_STRIDE;
use crate::error::{Error, Result};

pub const DEFAULT_MODEL_PATH: &str = "flownet.onnx";

/// Tensor names the model binds its inputs and output to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TensorNames {
    pub image0: String,
    pub image1: String,
    pub timestep: String,
    pub output: String,
}

impl Default for TensorNames {
    fn default() -> Self {
        Self {
            image0: "in0".to_string(),
            image1: "in1".to_string(),
            timestep: "in2".to_string(),
            output: "out0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InterpolatorConfig {
    /// Spatial alignment the model requires of its inputs.
    pub stride: usize,
    pub model_path: PathBuf,
    pub tensors: TensorNames,
}

impl Default for InterpolatorConfig {
    fn default() -> Self {
        Self {
            stride: PAD_STRIDE,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            tensors: TensorNames::default(),
        }
    }
}

impl InterpolatorConfig {
    pub fn with_model_path(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.stride == 0 {
            return Err(Error::InvalidStride);
        }
        if !self.stride.is_power_of_two() {
            tracing::warn!(stride = self.stride, "stride is not a power of two");
        }
        Ok(())
    }

    /// Missing or empty files yield the defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;

        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = toml::from_str(&raw).map_err(|e| {
            Error::Config(format!("failed to parse config TOML {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!(
                    "failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let encoded = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config TOML: {e}")))?;
        fs::write(path, encoded).map_err(|e| {
            Error::Config(format!("failed to write config file {}: {e}", path.display()))
        })
    }
}
