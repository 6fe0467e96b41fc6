//! Sequential batched inference over prepared tiles.

use crate::core::batch::{BatchSampler, stack_chw};
use crate::core::errors::SimpleError;
use crate::core::traits::SegmentationModel;
use crate::core::{OCRError, OcrResult, SEGMENTATION_OUTPUT_CHANNELS};
use crate::pipeline::preprocess::PreparedTile;
use crate::pipeline::tiling::TileTag;
use crate::processors::resize_bilinear;
use ndarray::{Array2, s};
use tracing::debug;

/// Region heatmap and affinity map of one tile at tile resolution.
#[derive(Debug, Clone)]
pub struct HeatmapPair {
    /// Origin of the tile.
    pub tag: TileTag,
    /// Rows of real content before padding.
    pub content_height: u32,
    /// Channel 0 of the model output, `tile_height x tile_width`.
    pub heatmap: Array2<f32>,
    /// Channel 1 of the model output, `tile_height x tile_width`.
    pub affinity: Array2<f32>,
}

/// Feeds prepared tiles to a model in fixed-size batches.
#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    sampler: BatchSampler,
    tile_width: usize,
    tile_height: usize,
}

impl BatchRunner {
    /// Creates a runner producing maps of `tile_width x tile_height`.
    pub fn new(batch_size: usize, tile_width: u32, tile_height: u32) -> OcrResult<Self> {
        if batch_size == 0 {
            return Err(OCRError::config_error("batch_size must be greater than 0"));
        }
        Ok(Self {
            sampler: BatchSampler::new(batch_size),
            tile_width: tile_width as usize,
            tile_height: tile_height as usize,
        })
    }

    /// Tiles per model call.
    pub fn batch_size(&self) -> usize {
        self.sampler.batch_size()
    }

    /// Runs every tile through `model` and returns one pair per tile, in
    /// submission order.
    ///
    /// Batches are submitted one after another. The first failing batch
    /// aborts the run with [`OCRError::ModelInference`] carrying its index.
    pub fn run(
        &self,
        model: &dyn SegmentationModel,
        tiles: &[PreparedTile],
    ) -> OcrResult<Vec<HeatmapPair>> {
        let total_batches = self.sampler.num_batches(tiles.len());
        let mut pairs = Vec::with_capacity(tiles.len());

        for (batch_index, chunk) in self.sampler.batches(tiles).enumerate() {
            let tensors: Vec<_> = chunk.iter().map(|t| &t.tensor).collect();
            let batch = stack_chw(&tensors)
                .map_err(|e| OCRError::batch_processing(&format!("stacking batch {batch_index}"), e))?;
            let input_shape = batch.shape().to_vec();

            debug!(
                "invoking '{}' on batch {}/{} with {} tiles, input shape {:?}",
                model.name(),
                batch_index + 1,
                total_batches,
                chunk.len(),
                input_shape
            );

            let output = model
                .validate_input(&batch)
                .and_then(|_| model.invoke(&batch))
                .map_err(|e| with_batch_context(e, model.name(), batch_index, &input_shape))?;
            let output_shape = output.shape().to_vec();
            debug!("batch {} output shape {:?}", batch_index + 1, output_shape);

            if output_shape[0] != chunk.len() || output_shape[1] < SEGMENTATION_OUTPUT_CHANNELS {
                return Err(OCRError::model_inference_error(
                    model.name(),
                    "output_validation",
                    batch_index,
                    &input_shape,
                    &format!(
                        "expected output [{}, >={}, h, w], got {:?}",
                        chunk.len(),
                        SEGMENTATION_OUTPUT_CHANNELS,
                        output_shape
                    ),
                    SimpleError::new("unexpected model output shape"),
                ));
            }
            if output_shape[2] == 0 || output_shape[3] == 0 {
                return Err(OCRError::model_inference_error(
                    model.name(),
                    "output_validation",
                    batch_index,
                    &input_shape,
                    &format!("model returned empty maps {output_shape:?}"),
                    SimpleError::new("empty model output"),
                ));
            }

            for (j, tile) in chunk.iter().enumerate() {
                let heatmap = resize_bilinear(
                    output.slice(s![j, 0, .., ..]),
                    self.tile_height,
                    self.tile_width,
                )?;
                let affinity = resize_bilinear(
                    output.slice(s![j, 1, .., ..]),
                    self.tile_height,
                    self.tile_width,
                )?;
                pairs.push(HeatmapPair {
                    tag: tile.tag,
                    content_height: tile.content_height,
                    heatmap,
                    affinity,
                });
            }
        }

        Ok(pairs)
    }
}

/// Attaches the failing batch index to a model error.
///
/// Errors already describing a model inference keep their operation and
/// source; anything else is wrapped as the source of a new one.
fn with_batch_context(
    error: OCRError,
    model_name: &str,
    batch_index: usize,
    input_shape: &[usize],
) -> OCRError {
    match error {
        OCRError::ModelInference {
            model_name,
            operation,
            input_shape,
            context,
            source,
            ..
        } => OCRError::ModelInference {
            model_name,
            operation,
            batch_index,
            input_shape,
            context,
            source,
        },
        other => OCRError::model_inference_error_builder(model_name, "invoke")
            .batch_index(batch_index)
            .input_shape(input_shape)
            .context("segmentation model call failed")
            .build(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Tensor4D;
    use ndarray::{Array3, Array4};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Emits `[b, 2, h/2, w/2]` maps filled with the tile's order index.
    #[derive(Debug, Default)]
    struct HalfResModel {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl SegmentationModel for HalfResModel {
        fn invoke(&self, batch: &Tensor4D) -> Result<Tensor4D, OCRError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(call) {
                return Err(OCRError::invalid_input("out of device memory"));
            }
            let (b, _, h, w) = batch.dim();
            Ok(Array4::from_shape_fn((b, 2, h / 2, w / 2), |(i, c, _, _)| {
                batch[[i, 0, 0, 0]] + c as f32
            }))
        }

        fn name(&self) -> &str {
            "half_res"
        }
    }

    fn prepared(n: usize) -> Vec<PreparedTile> {
        (0..n)
            .map(|k| PreparedTile {
                tag: TileTag {
                    source_index: 0,
                    order_in_source: k,
                },
                content_height: 8,
                tensor: Array3::from_elem((3, 8, 8), k as f32),
            })
            .collect()
    }

    #[test]
    fn test_invocation_count_and_order() {
        let runner = BatchRunner::new(4, 8, 8).unwrap();
        let model = HalfResModel::default();
        let pairs = runner.run(&model, &prepared(10)).unwrap();

        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
        assert_eq!(pairs.len(), 10);
        for (k, pair) in pairs.iter().enumerate() {
            assert_eq!(pair.tag.order_in_source, k);
            assert_eq!(pair.heatmap.dim(), (8, 8));
            assert!((pair.heatmap[[3, 3]] - k as f32).abs() < 1e-6);
            assert!((pair.affinity[[0, 7]] - (k as f32 + 1.0)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_failure_reports_batch_index() {
        let runner = BatchRunner::new(2, 8, 8).unwrap();
        let model = HalfResModel {
            fail_on: Some(1),
            ..Default::default()
        };
        match runner.run(&model, &prepared(5)) {
            Err(OCRError::ModelInference {
                batch_index,
                input_shape,
                ..
            }) => {
                assert_eq!(batch_index, 1);
                assert_eq!(input_shape, vec![2, 3, 8, 8]);
            }
            other => panic!("expected ModelInference, got {other:?}"),
        }
        // No further batches after the failure.
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[derive(Debug)]
    struct OneChannel;

    impl SegmentationModel for OneChannel {
        fn invoke(&self, batch: &Tensor4D) -> Result<Tensor4D, OCRError> {
            let (b, _, h, w) = batch.dim();
            Ok(Array4::zeros((b, 1, h, w)))
        }

        fn name(&self) -> &str {
            "one_channel"
        }
    }

    #[test]
    fn test_rejects_single_channel_output() {
        let runner = BatchRunner::new(8, 8, 8).unwrap();
        let err = runner.run(&OneChannel, &prepared(1)).unwrap_err();
        assert!(matches!(err, OCRError::ModelInference { batch_index: 0, .. }));
    }

    #[test]
    fn test_empty_input_makes_no_calls() {
        let runner = BatchRunner::new(8, 8, 8).unwrap();
        let model = HalfResModel::default();
        assert!(runner.run(&model, &[]).unwrap().is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        assert!(BatchRunner::new(0, 8, 8).is_err());
    }
}
