//! The core module of the detection pipeline.
//!
//! This module contains the fundamental components shared by every stage:
//! - Batch processing utilities and tensor aliases
//! - Configuration management
//! - Constants used throughout the pipeline
//! - Error handling
//! - ONNX Runtime inference engine
//! - The model trait the pipeline runs against
//! - Input validation helpers
//!
//! It also provides re-exports of commonly used types and functions for convenience.

pub mod batch;
pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;
pub mod traits;
pub mod validation;

pub use batch::{BatchSampler, Tensor4D};
pub use config::{ConfigError, ConfigValidator, ModelInferenceConfig, ParallelPolicy};
pub use constants::*;
pub use errors::{OCRError, OcrResult, ProcessingStage};
pub use inference::OrtInfer;
pub use traits::SegmentationModel;

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
