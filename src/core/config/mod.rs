//! Configuration management for the detection pipeline.
//!
//! This module provides configuration types, validation traits, and utilities
//! shared by the inference engine and the pipeline stages.

pub mod builder;
pub mod errors;
pub mod onnx;
pub mod parallel;

pub use builder::ModelInferenceConfig;
pub use errors::{ConfigError, ConfigValidator};
pub use onnx::*;
pub use parallel::ParallelPolicy;
