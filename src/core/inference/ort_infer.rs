//! Core ONNX Runtime inference engine with support for pooling and configurable sessions.

use crate::core::{batch::Tensor4D, errors::OCRError, traits::SegmentationModel};
use ort::{session::Session, value::ValueType};
use std::sync::Mutex;

#[path = "ort_infer_builders.rs"]
mod ort_infer_builders;
#[path = "ort_infer_config.rs"]
mod ort_infer_config;
#[path = "ort_infer_execution.rs"]
mod ort_infer_execution;
#[cfg(test)]
#[path = "ort_infer_tests.rs"]
mod ort_infer_tests;

/// An ONNX Runtime segmentation engine.
///
/// Holds one or more sessions for the same model. Each call picks the next
/// session round-robin and locks it for the duration of the forward pass.
pub struct OrtInfer {
    pub(super) sessions: Vec<Mutex<Session>>,
    pub(super) next_idx: std::sync::atomic::AtomicUsize,
    pub(super) input_name: String,
    pub(super) output_name: Option<String>,
    pub(super) model_path: std::path::PathBuf,
    pub(super) model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("sessions", &self.sessions.len())
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Attempts to retrieve the primary input tensor shape from the first session.
    ///
    /// Returns a vector of dimensions if available. Dynamic dimensions (e.g., -1) are returned as-is.
    pub fn primary_input_shape(&self) -> Option<Vec<i64>> {
        let session_mutex = self.sessions.first()?;
        let session_guard = session_mutex.lock().ok()?;
        let input = session_guard.inputs.first()?;
        match &input.input_type {
            ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
            _ => None,
        }
    }

    /// Returns the number of sessions in the pool.
    pub fn pool_size(&self) -> usize {
        self.sessions.len()
    }
}

/// Reads a static `(width, height)` from an NCHW input shape.
///
/// Returns `None` when the shape is not 4-D or either spatial dimension is dynamic.
pub(crate) fn static_spatial_size(shape: &[i64]) -> Option<(u32, u32)> {
    if shape.len() != 4 {
        return None;
    }
    let height = u32::try_from(shape[2]).ok().filter(|&h| h > 0)?;
    let width = u32::try_from(shape[3]).ok().filter(|&w| w > 0)?;
    Some((width, height))
}

impl SegmentationModel for OrtInfer {
    fn invoke(&self, batch: &Tensor4D) -> Result<Tensor4D, OCRError> {
        self.infer_4d(batch)
    }

    fn name(&self) -> &str {
        &self.model_name
    }

    fn input_size(&self) -> Option<(u32, u32)> {
        self.primary_input_shape()
            .as_deref()
            .and_then(static_spatial_size)
    }
}
