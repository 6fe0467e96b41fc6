//! Trait definitions for the detection pipeline.
//!
//! The pipeline talks to the network through a single seam,
//! [`SegmentationModel`]. The ONNX Runtime engine implements it, and so do
//! the deterministic stub models used in tests.

use crate::core::{OCRError, batch::Tensor4D};
use std::fmt::Debug;
use std::sync::Arc;

/// A segmentation network that maps a batch of normalised tiles to per-pixel
/// score maps.
///
/// Input is `[batch, 3, tile_height, tile_width]`. Output must be
/// `[batch, channels, out_height, out_width]` with `channels >= 2`:
/// channel 0 is the text-region heatmap, channel 1 the affinity map. The
/// output resolution may differ from the tile resolution; the pipeline
/// resamples it.
///
/// Implementations take `&self` and must be safe to share across threads.
/// The pipeline itself never invokes a model concurrently.
pub trait SegmentationModel: Send + Sync + Debug {
    /// Runs the network on one batch.
    fn invoke(&self, batch: &Tensor4D) -> Result<Tensor4D, OCRError>;

    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Static `(width, height)` the network expects, if it declares one.
    fn input_size(&self) -> Option<(u32, u32)> {
        None
    }

    /// Validate that the batch is suitable for inference.
    fn validate_input(&self, batch: &Tensor4D) -> Result<(), OCRError> {
        if batch.shape()[1] != 3 {
            return Err(OCRError::InvalidInput {
                message: format!(
                    "model '{}' expects 3 input channels, got batch shape {:?}",
                    self.name(),
                    batch.shape()
                ),
            });
        }
        Ok(())
    }
}

impl<T: SegmentationModel + ?Sized> SegmentationModel for Arc<T> {
    fn invoke(&self, batch: &Tensor4D) -> Result<Tensor4D, OCRError> {
        (**self).invoke(batch)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn input_size(&self) -> Option<(u32, u32)> {
        (**self).input_size()
    }

    fn validate_input(&self, batch: &Tensor4D) -> Result<(), OCRError> {
        (**self).validate_input(batch)
    }
}
