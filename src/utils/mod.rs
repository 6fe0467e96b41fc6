//! Utility functions for the detection pipeline.
//!
//! This module provides image loading helpers, logging setup and, behind the
//! `visualization` feature, overlay rendering of detection results.

pub mod image;
#[cfg(feature = "visualization")]
pub mod visualization;

pub use self::image::{load_image, load_images_batch, load_images_batch_with_policy};
pub use crate::core::init_tracing;
