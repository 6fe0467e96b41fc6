//! Error types for the detection pipeline.
//!
//! This module provides the error handling system for the crate: the error
//! enums themselves plus helper constructors for well-structured errors with
//! context and error chaining.
//!
//! # Usage
//!
//! ```rust
//! use oar_segdet::core::errors::{OCRError, ProcessingStage};
//!
//! let error = OCRError::stitching_error("image 0 has no tiles");
//! assert!(matches!(
//!     error,
//!     OCRError::Processing { kind: ProcessingStage::Stitching, .. }
//! ));
//!
//! let config_error = OCRError::config_error("batch_size must be positive");
//! assert!(matches!(config_error, OCRError::ConfigError { .. }));
//! ```

pub mod constructors;
pub mod types;

pub use constructors::ModelInferenceErrorBuilder;
pub use types::{ImageProcessError, OCRError, ProcessingStage, SimpleError};

/// Convenient result alias for pipeline operations.
pub type OcrResult<T> = Result<T, OCRError>;
