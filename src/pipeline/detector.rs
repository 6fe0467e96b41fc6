//! The detection entry point and the ONNX-backed detector built around it.
//!
//! [`detect`] wires the stages together:
//!
//! ```text
//! images -> split -> normalize -> run batches -> stitch -> decode -> results
//! ```
//!
//! It holds no state between calls; the same inputs always give the same
//! outputs for a deterministic model.

use crate::core::config::{ConfigValidator, ModelInferenceConfig, OrtSessionConfig, ParallelPolicy};
use crate::core::errors::SimpleError;
use crate::core::traits::SegmentationModel;
use crate::core::validation::validate_input_images;
use crate::core::{OCRError, OcrResult, OrtInfer};
use crate::pipeline::batch_runner::BatchRunner;
use crate::pipeline::config::{DetectionConfig, TilingConfig};
use crate::pipeline::preprocess::TilePreprocessor;
use crate::pipeline::result::{DetectionResult, render_heatmap};
use crate::pipeline::stitching::{StitchedMaps, stitch_maps};
use crate::pipeline::tiling::split_images;
use crate::processors::{
    AffinityLineDecoder, BoxDecoderConfig, HeatmapBoxDecoder, LineDecoderConfig,
};
use image::{DynamicImage, RgbImage};
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Detects text regions and separator lines in every image.
///
/// Returns one [`DetectionResult`] per input image, in input order. An empty
/// input returns an empty output without invoking the model.
///
/// # Errors
///
/// * [`OCRError::ConfigError`] if `config` does not validate.
/// * [`OCRError::InvalidImage`] if an image has a zero dimension.
/// * [`OCRError::ModelInference`] if a model call fails; no retry is attempted.
/// * [`OCRError::Processing`] if an internal invariant is violated.
pub fn detect(
    images: &[DynamicImage],
    model: &dyn SegmentationModel,
    config: &DetectionConfig,
) -> OcrResult<Vec<DetectionResult>> {
    config.validate()?;
    validate_input_images(images)?;
    if images.is_empty() {
        return Ok(Vec::new());
    }

    let started = Instant::now();
    let policy = &config.parallel;

    let rgb: Vec<RgbImage> = if policy.parallel_images(images.len()) {
        images.par_iter().map(|img| img.to_rgb8()).collect()
    } else {
        images.iter().map(|img| img.to_rgb8()).collect()
    };
    let sizes: Vec<(u32, u32)> = rgb.iter().map(|img| img.dimensions()).collect();

    let tiles = split_images(&rgb, &config.tiling, policy)?;
    drop(rgb);

    let preprocessor = TilePreprocessor::new(&config.tiling)?;
    let prepared = preprocessor.prepare_all(tiles, policy)?;

    let runner = BatchRunner::new(
        config.batch_size,
        config.tiling.tile_width,
        config.tiling.tile_height,
    )?;
    let pairs = runner.run(model, &prepared)?;
    if pairs.len() != prepared.len() {
        return Err(OCRError::pipeline_invariant(format!(
            "submitted {} tiles but received {} map pairs",
            prepared.len(),
            pairs.len()
        )));
    }
    let tile_count = prepared.len();
    drop(prepared);

    let stitched = stitch_maps(pairs, images.len())?;

    let box_decoder = HeatmapBoxDecoder::new(config.boxes.clone());
    let line_decoder = AffinityLineDecoder::new(config.lines.clone());
    let decode = |(maps, size): (StitchedMaps, (u32, u32))| {
        decode_image(&box_decoder, &line_decoder, maps, size)
    };
    let results: Vec<DetectionResult> = if policy.parallel_images(stitched.len()) {
        stitched
            .into_par_iter()
            .zip(sizes.into_par_iter())
            .map(decode)
            .collect::<OcrResult<_>>()?
    } else {
        stitched
            .into_iter()
            .zip(sizes)
            .map(decode)
            .collect::<OcrResult<_>>()?
    };

    if results.len() != images.len() {
        return Err(OCRError::pipeline_invariant(format!(
            "produced {} results for {} images",
            results.len(),
            images.len()
        )));
    }

    info!(
        "detected {} boxes and {} lines in {} images ({} tiles) in {:?}",
        results.iter().map(|r| r.boxes.len()).sum::<usize>(),
        results
            .iter()
            .map(|r| r.vertical_lines.len() + r.horizontal_lines.len())
            .sum::<usize>(),
        images.len(),
        tile_count,
        started.elapsed()
    );
    Ok(results)
}

/// Decodes one image's stitched maps and checks the geometry invariants.
fn decode_image(
    box_decoder: &HeatmapBoxDecoder,
    line_decoder: &AffinityLineDecoder,
    maps: StitchedMaps,
    image_size: (u32, u32),
) -> OcrResult<DetectionResult> {
    let StitchedMaps {
        source_index,
        heatmap,
        affinity,
    } = maps;
    let (width, height) = image_size;

    let boxes = box_decoder.decode(heatmap.view(), image_size);
    let vertical_lines = line_decoder.decode_vertical(affinity.view(), image_size);
    let horizontal_lines = line_decoder.decode_horizontal(affinity.view(), image_size);

    if let Some(bad) = boxes
        .iter()
        .find(|b| b.is_degenerate() || !b.within_bounds(width, height))
    {
        return Err(OCRError::post_processing(
            &format!("image {source_index}: box {bad:?} escapes {width}x{height} or is degenerate"),
            SimpleError::new("box invariant violated"),
        ));
    }

    debug!(
        "image {}: {} boxes, {} vertical, {} horizontal lines",
        source_index,
        boxes.len(),
        vertical_lines.len(),
        horizontal_lines.len()
    );

    Ok(DetectionResult {
        boxes,
        vertical_lines,
        horizontal_lines,
        region_heatmap_image: render_heatmap(heatmap.view()),
        affinity_heatmap_image: render_heatmap(affinity.view()),
        image_size,
    })
}

/// A text-region detector bound to one segmentation model.
///
/// Usually built with [`TextRegionDetectorBuilder`] from an ONNX file, but
/// any [`SegmentationModel`] can be wrapped with [`TextRegionDetector::from_model`].
#[derive(Debug, Clone)]
pub struct TextRegionDetector {
    model: Arc<dyn SegmentationModel>,
    config: DetectionConfig,
}

impl TextRegionDetector {
    /// Starts building a detector.
    pub fn builder() -> TextRegionDetectorBuilder {
        TextRegionDetectorBuilder::new()
    }

    /// Wraps an existing model.
    pub fn from_model(
        model: Arc<dyn SegmentationModel>,
        config: DetectionConfig,
    ) -> OcrResult<Self> {
        config.validate()?;
        Ok(Self { model, config })
    }

    /// Runs detection over `images`.
    pub fn predict(&self, images: &[DynamicImage]) -> OcrResult<Vec<DetectionResult>> {
        detect(images, self.model.as_ref(), &self.config)
    }

    /// The effective configuration.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// The wrapped model's name.
    pub fn model_name(&self) -> &str {
        self.model.name()
    }
}

/// Builder for [`TextRegionDetector`].
#[derive(Debug, Clone, Default)]
pub struct TextRegionDetectorBuilder {
    inference: ModelInferenceConfig,
    config: DetectionConfig,
    input_name: Option<String>,
}

impl TextRegionDetectorBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole detection configuration.
    pub fn config(mut self, config: DetectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the model name used in logs and errors.
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.inference = self.inference.model_name(name);
        self
    }

    /// Sets the model's input tensor name; defaults to its first input.
    pub fn input_name(mut self, name: impl Into<String>) -> Self {
        self.input_name = Some(name.into());
        self
    }

    /// Sets the ONNX Runtime session options.
    pub fn ort_session(mut self, config: OrtSessionConfig) -> Self {
        self.inference = self.inference.ort_session(config);
        self
    }

    /// Sets how many sessions are pooled for concurrent callers.
    pub fn session_pool_size(mut self, size: usize) -> Self {
        self.inference = self.inference.session_pool_size(size);
        self
    }

    /// Sets tiles per model call.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Sets the tiling used when the model has no static input size.
    pub fn tiling(mut self, tiling: TilingConfig) -> Self {
        self.config.tiling = tiling;
        self
    }

    /// Sets the box decoder configuration.
    pub fn boxes(mut self, boxes: BoxDecoderConfig) -> Self {
        self.config.boxes = boxes;
        self
    }

    /// Sets the line decoder configuration.
    pub fn lines(mut self, lines: LineDecoderConfig) -> Self {
        self.config.lines = lines;
        self
    }

    /// Sets the CPU parallel policy.
    pub fn parallel(mut self, parallel: ParallelPolicy) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Loads the ONNX model at `model_path` and builds the detector.
    ///
    /// A static input size declared by the model overrides the configured
    /// tile size.
    pub fn build(mut self, model_path: impl AsRef<Path>) -> OcrResult<TextRegionDetector> {
        let model_path = model_path.as_ref();
        if self.inference.model_path.is_none() {
            self.inference = self.inference.model_path(model_path);
        }
        self.inference.validate()?;

        let model = OrtInfer::from_config(&self.inference, model_path, self.input_name.as_deref())?;

        let mut config = self.config;
        if let Some((width, height)) = model.input_size() {
            if (width, height) != (config.tiling.tile_width, config.tiling.tile_height) {
                warn!(
                    "model '{}' declares input {}x{}; overriding configured tile size {}x{}",
                    model.model_name(),
                    width,
                    height,
                    config.tiling.tile_width,
                    config.tiling.tile_height
                );
            }
            config.tiling.tile_width = width;
            config.tiling.tile_height = height;
        } else {
            debug!(
                "model '{}' has a dynamic input size; using tile size {}x{}",
                model.model_name(),
                config.tiling.tile_width,
                config.tiling.tile_height
            );
        }

        config.parallel.install_global_pool();
        TextRegionDetector::from_model(Arc::new(model), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Tensor4D;
    use ndarray::Array4;

    #[derive(Debug)]
    struct Blank;

    impl SegmentationModel for Blank {
        fn invoke(&self, batch: &Tensor4D) -> Result<Tensor4D, OCRError> {
            let (b, _, h, w) = batch.dim();
            Ok(Array4::zeros((b, 2, h, w)))
        }

        fn name(&self) -> &str {
            "blank"
        }
    }

    fn small_config() -> DetectionConfig {
        DetectionConfig::new()
            .with_batch_size(2)
            .with_tiling(TilingConfig::new(32, 32))
    }

    #[test]
    fn test_empty_input_returns_empty_output() {
        let results = detect(&[], &Blank, &small_config()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_blank_maps_give_empty_geometry() {
        let images = vec![DynamicImage::new_rgb8(40, 70), DynamicImage::new_rgb8(10, 10)];
        let results = detect(&images, &Blank, &small_config()).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_empty()));
        assert_eq!(results[0].image_size, (40, 70));
        assert_eq!(results[0].region_heatmap_image.dimensions(), (32, 70));
        assert_eq!(results[1].affinity_heatmap_image.dimensions(), (32, 10));
    }

    #[test]
    fn test_zero_sized_image_is_rejected_before_inference() {
        let images = vec![DynamicImage::new_rgb8(10, 10), DynamicImage::new_rgb8(0, 5)];
        let err = detect(&images, &Blank, &small_config()).unwrap_err();
        assert!(matches!(err, OCRError::InvalidImage { index: 1, .. }));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = small_config().with_batch_size(0);
        let err = detect(&[DynamicImage::new_rgb8(4, 4)], &Blank, &config).unwrap_err();
        assert!(matches!(err, OCRError::ConfigError { .. }));
    }

    #[test]
    fn test_detector_from_model_predicts() {
        let detector = TextRegionDetector::from_model(Arc::new(Blank), small_config()).unwrap();
        assert_eq!(detector.model_name(), "blank");
        let results = detector.predict(&[DynamicImage::new_rgb8(8, 8)]).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_builder_reports_missing_model() {
        let result = TextRegionDetector::builder().build("does/not/exist.onnx");
        assert!(matches!(result, Err(OCRError::ConfigError { .. })));
    }

    /// Scores dark input pixels as text and as line, optionally at a reduced
    /// output resolution. Records the batch size of every call.
    #[derive(Debug, Default)]
    struct InkModel {
        downscale: usize,
        fail_on: Option<usize>,
        calls: std::sync::Mutex<Vec<usize>>,
    }

    impl InkModel {
        fn call_sizes(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SegmentationModel for InkModel {
        fn invoke(&self, batch: &Tensor4D) -> Result<Tensor4D, OCRError> {
            let (b, _, h, w) = batch.dim();
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(b);
                calls.len() - 1
            };
            if self.fail_on == Some(call) {
                return Err(OCRError::invalid_input("device lost"));
            }
            let step = self.downscale.max(1);
            Ok(Array4::from_shape_fn(
                (b, 2, h / step, w / step),
                |(i, _, y, x)| {
                    if batch[[i, 0, y * step, x * step]] < 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                },
            ))
        }

        fn name(&self) -> &str {
            "ink"
        }
    }

    fn page(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]))
    }

    fn ink(img: &mut RgbImage, x: std::ops::Range<u32>, y: std::ops::Range<u32>) {
        for yy in y {
            for xx in x.clone() {
                img.put_pixel(xx, yy, image::Rgb([0, 0, 0]));
            }
        }
    }

    fn ink_config(tile_width: u32, tile_height: u32, batch_size: usize) -> DetectionConfig {
        DetectionConfig::new()
            .with_batch_size(batch_size)
            .with_tiling(TilingConfig::new(tile_width, tile_height))
    }

    #[test]
    fn test_box_across_tile_seam_is_one_region() {
        let mut img = page(64, 100);
        ink(&mut img, 10..30, 25..45);
        let model = InkModel::default();
        let results = detect(&[DynamicImage::ImageRgb8(img)], &model, &ink_config(64, 32, 8)).unwrap();

        let boxes = &results[0].boxes;
        assert_eq!(boxes.len(), 1);
        let b = boxes[0];
        // 20x20 component grown by a 5x5 kernel.
        assert_eq!((b.x_min, b.y_min, b.x_max, b.y_max), (8.0, 23.0, 32.0, 47.0));
        assert!((b.confidence - 1.0).abs() < 1e-6);
        assert!(results[0].horizontal_lines.is_empty());
    }

    #[test]
    fn test_low_resolution_output_is_upsampled() {
        let mut img = page(64, 100);
        ink(&mut img, 10..30, 25..45);
        let model = InkModel {
            downscale: 2,
            ..Default::default()
        };
        let results = detect(&[DynamicImage::ImageRgb8(img)], &model, &ink_config(64, 32, 8)).unwrap();

        assert_eq!(results[0].region_heatmap_image.dimensions(), (64, 100));
        let boxes = &results[0].boxes;
        assert_eq!(boxes.len(), 1);
        let b = boxes[0];
        assert!(b.x_min <= 10.0 && b.x_max >= 30.0, "{b:?}");
        assert!(b.y_min <= 26.0 && b.y_max >= 44.0, "{b:?}");
        assert!(b.x_min >= 4.0 && b.x_max <= 36.0, "{b:?}");
        assert!(b.y_min >= 18.0 && b.y_max <= 52.0, "{b:?}");
    }

    #[test]
    fn test_boxes_are_rescaled_into_image_bounds() {
        // 128 wide page squeezed into 64 wide tiles.
        let mut img = page(128, 60);
        ink(&mut img, 100..128, 10..50);
        let model = InkModel::default();
        let results = detect(&[DynamicImage::ImageRgb8(img)], &model, &ink_config(64, 32, 8)).unwrap();

        assert!(!results[0].boxes.is_empty());
        for b in &results[0].boxes {
            assert!(b.within_bounds(128, 60), "{b:?}");
            assert!(!b.is_degenerate());
            assert!(b.x_max <= 128.0 && b.x_min >= 90.0, "{b:?}");
        }
    }

    #[test]
    fn test_vertical_rule_becomes_one_snapped_line() {
        let mut img = page(64, 200);
        ink(&mut img, 40..42, 0..200);
        let model = InkModel::default();
        let results = detect(&[DynamicImage::ImageRgb8(img)], &model, &ink_config(64, 64, 3)).unwrap();

        let lines = &results[0].vertical_lines;
        assert_eq!(lines.len(), 1, "{lines:?}");
        assert_eq!(lines[0].cross(), 40.0);
        assert!(lines[0].length() >= 190.0);
        assert!(results[0].horizontal_lines.is_empty());
    }

    #[test]
    fn test_results_follow_input_order() {
        let heights = [300u32, 40, 129, 64];
        let images: Vec<DynamicImage> = heights
            .iter()
            .enumerate()
            .map(|(i, &h)| DynamicImage::ImageRgb8(page(20 + i as u32, h)))
            .collect();
        let model = InkModel::default();
        let results = detect(&images, &model, &ink_config(32, 64, 3)).unwrap();

        assert_eq!(results.len(), heights.len());
        for (i, (result, &h)) in results.iter().zip(heights.iter()).enumerate() {
            assert_eq!(result.image_size, (20 + i as u32, h));
            assert_eq!(result.region_heatmap_image.height(), h);
            assert!(result.is_empty());
        }
        // 5 + 1 + 3 + 1 tiles in batches of 3.
        assert_eq!(model.call_sizes(), vec![3, 3, 3, 1]);
    }

    #[test]
    fn test_stitched_height_drops_padding() {
        let model = InkModel::default();
        let images = [DynamicImage::ImageRgb8(page(16, 1154))];
        let results = detect(&images, &model, &ink_config(16, 512, 4)).unwrap();
        assert_eq!(results[0].region_heatmap_image.dimensions(), (16, 1154));
        assert_eq!(results[0].affinity_heatmap_image.dimensions(), (16, 1154));
        assert_eq!(model.call_sizes(), vec![3]);
    }

    #[test]
    fn test_tall_page_tiles_and_batches() {
        let model = InkModel::default();
        let images = [DynamicImage::ImageRgb8(page(1000, 3000))];
        let results = detect(&images, &model, &ink_config(128, 512, 4)).unwrap();

        // Six tiles of 512, 512, 512, 512, 512, 440 rows.
        assert_eq!(model.call_sizes(), vec![4, 2]);
        assert_eq!(results[0].region_heatmap_image.dimensions(), (128, 3000));
        assert_eq!(results[0].image_size, (1000, 3000));
    }

    #[test]
    fn test_model_failure_aborts_with_batch_index() {
        let model = InkModel {
            fail_on: Some(1),
            ..Default::default()
        };
        let images = [DynamicImage::ImageRgb8(page(16, 160))];
        let err = detect(&images, &model, &ink_config(16, 32, 2)).unwrap_err();
        assert!(
            matches!(err, OCRError::ModelInference { batch_index: 1, .. }),
            "{err:?}"
        );
        assert_eq!(model.call_sizes(), vec![2, 2]);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let mut img = page(64, 90);
        ink(&mut img, 5..25, 5..25);
        ink(&mut img, 35..60, 50..80);
        let images = [DynamicImage::ImageRgb8(img)];
        let config = ink_config(64, 32, 2);
        let first = detect(&images, &InkModel::default(), &config).unwrap();
        let second = detect(&images, &InkModel::default(), &config).unwrap();
        assert_eq!(first[0].boxes, second[0].boxes);
        assert_eq!(first[0].boxes.len(), 2);
        assert!(first[0].boxes[0].y_min < first[0].boxes[1].y_min);
    }
}
