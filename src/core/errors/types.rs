//! Core error types for the detection pipeline.
//!
//! This module defines the fundamental error types used throughout the crate,
//! including the main [`OCRError`] enum and the [`ProcessingStage`] enum that
//! tags which part of the pipeline failed.

use thiserror::Error;

/// Errors that can occur during image processing operations.
#[derive(Debug, Error)]
pub enum ImageProcessError {
    /// The requested resize target is invalid (e.g., zero dimensions).
    #[error("invalid target size {width}x{height}")]
    InvalidTargetSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The input data is invalid.
    #[error("Invalid input")]
    InvalidInput,
}

/// A plain message error used as the `source` of wrapped errors when there
/// is no underlying library error to chain.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SimpleError {
    message: String,
}

impl SimpleError {
    /// Creates a new simple error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Enum representing different stages of processing in the detection pipeline.
///
/// This enum is used to identify which stage an error occurred in,
/// providing context for debugging and error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred while splitting images into tiles.
    Tiling,
    /// Error occurred during tensor operations.
    TensorOperation,
    /// Error occurred during image normalization.
    Normalization,
    /// Error occurred during image or map resizing.
    Resize,
    /// Error occurred during batch processing.
    BatchProcessing,
    /// Error occurred while reassembling per-tile maps.
    Stitching,
    /// Error occurred during post-processing (box/line decoding).
    PostProcessing,
    /// Error occurred during pipeline execution.
    PipelineExecution,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Tiling => write!(f, "tiling"),
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::Normalization => write!(f, "normalization"),
            ProcessingStage::Resize => write!(f, "resize"),
            ProcessingStage::BatchProcessing => write!(f, "batch processing"),
            ProcessingStage::Stitching => write!(f, "stitching"),
            ProcessingStage::PostProcessing => write!(f, "post-processing"),
            ProcessingStage::PipelineExecution => write!(f, "pipeline execution"),
        }
    }
}

/// Enum representing various errors that can occur in the detection pipeline.
///
/// Model failures are surfaced unmodified with the batch index attached so the
/// caller can decide on a retry policy (for example a smaller batch size).
#[derive(Error, Debug)]
pub enum OCRError {
    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// An element of the input image sequence is not a usable raster.
    #[error("invalid image at index {index}: {reason}")]
    InvalidImage {
        /// Position of the offending image in the input sequence.
        index: usize,
        /// Why the image was rejected.
        reason: String,
    },

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred during inference.
    #[error("inference failed in model '{model_name}': {context}")]
    Inference {
        /// The name of the model where inference failed.
        model_name: String,
        /// Additional context about the inference error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred during model inference with detailed context.
    #[error(
        "model '{model_name}' inference failed: {operation} on batch[{batch_index}] with input shape {input_shape:?}: {context}"
    )]
    ModelInference {
        /// The name of the model where inference failed.
        model_name: String,
        /// The operation that failed (e.g., "forward_pass", "output_validation").
        operation: String,
        /// The batch index where the error occurred.
        batch_index: usize,
        /// The input tensor shape.
        input_shape: Vec<usize>,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations with detailed context.
    #[error(
        "tensor operation '{operation}' failed: expected shape {expected_shape:?}, got {actual_shape:?} in {context}"
    )]
    TensorOperation {
        /// The tensor operation that failed.
        operation: String,
        /// The expected tensor shape.
        expected_shape: Vec<usize>,
        /// The actual tensor shape.
        actual_shape: Vec<usize>,
        /// Additional context about where the error occurred.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error from basic tensor operations (fallback for ndarray errors).
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// Error loading a model file, with context and suggestions.
    #[error("model load failed for '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path to the model that failed to load
        model_path: String,
        /// Short reason string
        reason: String,
        /// Optional suggestion (prefixed with '; ' when present)
        suggestion: String,
        /// Underlying source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl From<image::ImageError> for OCRError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for OCRError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_image_message_names_index() {
        let err = OCRError::InvalidImage {
            index: 3,
            reason: "zero width".to_string(),
        };
        assert_eq!(err.to_string(), "invalid image at index 3: zero width");
    }

    #[test]
    fn test_processing_stage_display() {
        assert_eq!(ProcessingStage::Stitching.to_string(), "stitching");
        assert_eq!(ProcessingStage::Tiling.to_string(), "tiling");
    }
}
