use super::*;
use crate::core::config::ModelInferenceConfig;
use ort::logging::LogLevel;
use ort::session::Session;
use std::path::Path;
use std::sync::Mutex;

impl OrtInfer {
    /// Creates a new OrtInfer instance with default ONNX Runtime settings and a single session.
    ///
    /// When `input_name` is `None` the first declared model input is used.
    pub fn new(model_path: impl AsRef<Path>, input_name: Option<&str>) -> Result<Self, OCRError> {
        let path = model_path.as_ref();
        let session = Session::builder()?
            .with_log_level(LogLevel::Error)?
            .commit_from_file(path)
            .map_err(|e| {
                OCRError::model_load_error(
                    path,
                    "failed to create ONNX session",
                    Some("verify model path and compatibility with selected execution providers"),
                    Some(e),
                )
            })?;

        Self::from_sessions(vec![session], path, None, input_name)
    }

    /// Creates a new OrtInfer instance from ModelInferenceConfig, applying ORT session
    /// configuration and constructing a session pool for concurrent predictions.
    pub fn from_config(
        common: &ModelInferenceConfig,
        model_path: impl AsRef<Path>,
        input_name: Option<&str>,
    ) -> Result<Self, OCRError> {
        let path = model_path.as_ref();
        let pool_size = common.session_pool_size.unwrap_or(1).max(1);
        let mut sessions = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let builder = Session::builder()?;
            let builder = if let Some(cfg) = &common.ort_session {
                Self::apply_ort_config(builder, cfg)?
            } else {
                // Set default log level to Error to suppress ORT logs
                builder.with_log_level(LogLevel::Error)?
            };
            let session = builder.commit_from_file(path).map_err(|e| {
                OCRError::model_load_error(
                    path,
                    "failed to create ONNX session",
                    Some("check device/EP configuration and model file"),
                    Some(e),
                )
            })?;
            sessions.push(session);
        }

        Self::from_sessions(sessions, path, common.model_name.as_deref(), input_name)
    }

    /// Sets the output tensor name to read instead of the first declared output.
    pub fn with_output_name(mut self, output_name: impl Into<String>) -> Self {
        self.output_name = Some(output_name.into());
        self
    }

    fn from_sessions(
        sessions: Vec<Session>,
        path: &Path,
        model_name: Option<&str>,
        input_name: Option<&str>,
    ) -> Result<Self, OCRError> {
        let input_name = match input_name {
            Some(name) => name.to_string(),
            None => sessions
                .first()
                .and_then(|s| s.inputs.first())
                .map(|input| input.name.clone())
                .ok_or_else(|| {
                    OCRError::model_load_error(
                        path,
                        "model declares no inputs",
                        Some("export the segmentation model with a single image input"),
                        None::<crate::core::errors::SimpleError>,
                    )
                })?,
        };

        let model_name = model_name
            .map(str::to_string)
            .or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| "unknown_model".to_string());

        tracing::debug!(
            "loaded model '{}' from {} ({} session(s), input '{}')",
            model_name,
            path.display(),
            sessions.len(),
            input_name
        );

        Ok(OrtInfer {
            sessions: sessions.into_iter().map(Mutex::new).collect(),
            next_idx: std::sync::atomic::AtomicUsize::new(0),
            input_name,
            output_name: None,
            model_path: path.to_path_buf(),
            model_name,
        })
    }
}
