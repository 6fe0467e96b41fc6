//! Error constructor utilities for the detection pipeline.
//!
//! Helper functions for creating [`OCRError`] instances with appropriate
//! context and error chaining.
//!
//! ## Model inference errors
//!
//! Model failures carry the batch index so callers can retry with a smaller
//! batch size:
//!
//! ```rust
//! use oar_segdet::core::OCRError;
//!
//! let error = OCRError::model_inference_error_builder("segformer", "forward_pass")
//!     .batch_index(2)
//!     .input_shape(&[8, 3, 1024, 1024])
//!     .context("device out of memory")
//!     .build(std::io::Error::new(std::io::ErrorKind::OutOfMemory, "oom"));
//! assert!(matches!(error, OCRError::ModelInference { batch_index: 2, .. }));
//! ```

use super::types::{OCRError, ProcessingStage, SimpleError};

/// Builder for composing detailed `ModelInference` errors without duplicating boilerplate.
#[derive(Clone, Debug)]
pub struct ModelInferenceErrorBuilder {
    model_name: String,
    operation: String,
    batch_index: usize,
    input_shape: Vec<usize>,
    context: String,
}

impl ModelInferenceErrorBuilder {
    /// Creates a new builder with the required model metadata.
    pub fn new(model_name: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            operation: operation.into(),
            batch_index: 0,
            input_shape: Vec::new(),
            context: String::new(),
        }
    }

    /// Sets the batch index associated with the failure.
    pub fn batch_index(mut self, batch_index: usize) -> Self {
        self.batch_index = batch_index;
        self
    }

    /// Stores the input tensor shape for contextual debugging.
    pub fn input_shape(mut self, shape: &[usize]) -> Self {
        self.input_shape = shape.to_vec();
        self
    }

    /// Adds free-form context to the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Consumes the builder and produces the final `OCRError`.
    pub fn build(self, error: impl std::error::Error + Send + Sync + 'static) -> OCRError {
        OCRError::ModelInference {
            model_name: self.model_name,
            operation: self.operation,
            batch_index: self.batch_index,
            input_shape: self.input_shape,
            context: self.context,
            source: Box::new(error),
        }
    }
}

impl OCRError {
    /// Internal helper to build a Processing error with minimal boilerplate.
    #[inline]
    fn processing_with_context(
        kind: ProcessingStage,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an OCRError for normalization operations.
    pub fn normalization(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(ProcessingStage::Normalization, context, error)
    }

    /// Creates an OCRError for resize operations.
    pub fn resize_error(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(ProcessingStage::Resize, context, error)
    }

    /// Creates an OCRError for tiling failures.
    pub fn tiling_error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::processing_with_context(
            ProcessingStage::Tiling,
            message.clone(),
            SimpleError::new(message),
        )
    }

    /// Creates an OCRError for violated stitching invariants.
    ///
    /// Stitching failures are never caused by the caller's data; they mean the
    /// tile bookkeeping was corrupted somewhere upstream.
    pub fn stitching_error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::processing_with_context(
            ProcessingStage::Stitching,
            message.clone(),
            SimpleError::new(message),
        )
    }

    /// Creates an OCRError for post-processing operations.
    pub fn post_processing(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(ProcessingStage::PostProcessing, context, error)
    }

    /// Creates an OCRError for a violated pipeline invariant.
    pub fn pipeline_invariant(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::processing_with_context(
            ProcessingStage::PipelineExecution,
            message.clone(),
            SimpleError::new(message),
        )
    }

    /// Creates an OCRError for batch processing operations.
    pub fn batch_processing(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_with_context(ProcessingStage::BatchProcessing, context, error)
    }

    /// Creates an OCRError for an input image that cannot be processed.
    pub fn invalid_image(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            index,
            reason: reason.into(),
        }
    }

    /// Creates an OCRError for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an OCRError for configuration problems.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates an OCRError for model inference with detailed context.
    pub fn model_inference_error(
        model_name: &str,
        operation: &str,
        batch_index: usize,
        input_shape: &[usize],
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::model_inference_error_builder(model_name, operation)
            .batch_index(batch_index)
            .input_shape(input_shape)
            .context(context)
            .build(error)
    }

    /// Creates a builder for constructing model inference errors with optional context pieces.
    pub fn model_inference_error_builder(
        model_name: impl Into<String>,
        operation: impl Into<String>,
    ) -> ModelInferenceErrorBuilder {
        ModelInferenceErrorBuilder::new(model_name, operation)
    }

    /// Creates an OCRError for inference operations with model context (simple variant).
    pub fn inference_error(
        model_name: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an OCRError for model load failures with contextual suggestions.
    ///
    /// # Arguments
    /// * `model_path` - Path to the model file
    /// * `reason` - Short reason description
    /// * `suggestion` - Optional suggestion message (without punctuation)
    /// * `source` - Optional underlying error
    pub fn model_load_error(
        model_path: impl AsRef<std::path::Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        let suggestion = suggestion
            .map(|s| format!("; suggested fix: {}", s))
            .unwrap_or_default();
        Self::ModelLoad {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.into(),
            suggestion,
            source: source.map(|e| Box::new(e) as _),
        }
    }

    /// Creates an OCRError for tensor operations with detailed shape information.
    pub fn tensor_operation_error(
        operation: &str,
        expected_shape: &[usize],
        actual_shape: &[usize],
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::TensorOperation {
            operation: operation.to_string(),
            expected_shape: expected_shape.to_vec(),
            actual_shape: actual_shape.to_vec(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_inference_builder_keeps_batch_context() {
        let err = OCRError::model_inference_error_builder("stub", "forward_pass")
            .batch_index(4)
            .input_shape(&[2, 3, 8, 8])
            .context("boom")
            .build(SimpleError::new("device lost"));

        match err {
            OCRError::ModelInference {
                model_name,
                batch_index,
                input_shape,
                ..
            } => {
                assert_eq!(model_name, "stub");
                assert_eq!(batch_index, 4);
                assert_eq!(input_shape, vec![2, 3, 8, 8]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_model_load_error_suggestion_prefix() {
        let err = OCRError::model_load_error(
            "models/missing.onnx",
            "file not found",
            Some("check the path"),
            None::<std::io::Error>,
        );
        let msg = err.to_string();
        assert!(msg.contains("models/missing.onnx"));
        assert!(msg.ends_with("; suggested fix: check the path"));
    }

    #[test]
    fn test_stitching_error_stage() {
        let err = OCRError::stitching_error("missing tile");
        assert!(matches!(
            err,
            OCRError::Processing {
                kind: ProcessingStage::Stitching,
                ..
            }
        ));
    }
}
