//! Model inference configuration shared by model builders.

use super::errors::{ConfigError, ConfigValidator};
use super::onnx::OrtSessionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for constructing an inference engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelInferenceConfig {
    /// The path to the model file (optional).
    pub model_path: Option<PathBuf>,
    /// The name of the model, used in logs and error messages (optional).
    pub model_name: Option<String>,
    /// ONNX Runtime session configuration for this model (optional)
    #[serde(default)]
    pub ort_session: Option<OrtSessionConfig>,
    /// Size of the session pool to allow concurrent callers (>=1).
    /// If None, defaults to 1 (single session)
    #[serde(default)]
    pub session_pool_size: Option<usize>,
}

impl ModelInferenceConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model path.
    pub fn model_path(mut self, model_path: impl Into<PathBuf>) -> Self {
        self.model_path = Some(model_path.into());
        self
    }

    /// Sets the model name.
    pub fn model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    /// Sets the ONNX Runtime session configuration.
    pub fn ort_session(mut self, config: OrtSessionConfig) -> Self {
        self.ort_session = Some(config);
        self
    }

    /// Sets the session pool size.
    pub fn session_pool_size(mut self, size: usize) -> Self {
        self.session_pool_size = Some(size);
        self
    }
}

impl ConfigValidator for ModelInferenceConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.model_path
            && !path.exists()
        {
            return Err(ConfigError::ModelPathNotFound { path: path.clone() });
        }
        if let Some(size) = self.session_pool_size {
            self.validate_positive_usize(size, "session_pool_size")?;
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}
