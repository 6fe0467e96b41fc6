//! Structures and helpers for ONNX Runtime inference.
//!
//! This module holds the ONNX Runtime engine that implements
//! [`SegmentationModel`](crate::core::traits::SegmentationModel).

pub mod ort_infer;

pub use ort_infer::OrtInfer;
