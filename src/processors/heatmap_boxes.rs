//! Decoding of text-region heatmaps into axis-aligned boxes.
//!
//! The [`HeatmapBoxDecoder`] thresholds the stitched region heatmap, labels
//! its 4-connected foreground components, filters weak or tiny components,
//! grows each survivor to recover the stroke margin lost to thresholding and
//! finally maps the boxes into original image coordinates.

use crate::core::config::{ConfigError, ConfigValidator};
use crate::processors::geometry::{ScaleFactors, TextBox};
use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// Thresholds and filters applied by [`HeatmapBoxDecoder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxDecoderConfig {
    /// Score at or above which a heatmap pixel counts as text (default: 0.35).
    #[serde(default = "BoxDecoderConfig::default_low_text_threshold")]
    pub low_text_threshold: f32,
    /// Minimum peak score a component needs to be kept (default: 0.6).
    #[serde(default = "BoxDecoderConfig::default_text_threshold")]
    pub text_threshold: f32,
    /// Minimum component size in heatmap pixels (default: 10).
    #[serde(default = "BoxDecoderConfig::default_min_component_area")]
    pub min_component_area: usize,
    /// Whether to grow component boxes by the size-dependent margin (default: true).
    #[serde(default = "BoxDecoderConfig::default_dilate")]
    pub dilate: bool,
}

impl BoxDecoderConfig {
    fn default_low_text_threshold() -> f32 {
        0.35
    }

    fn default_text_threshold() -> f32 {
        0.6
    }

    fn default_min_component_area() -> usize {
        10
    }

    fn default_dilate() -> bool {
        true
    }
}

impl Default for BoxDecoderConfig {
    fn default() -> Self {
        Self {
            low_text_threshold: Self::default_low_text_threshold(),
            text_threshold: Self::default_text_threshold(),
            min_component_area: Self::default_min_component_area(),
            dilate: Self::default_dilate(),
        }
    }
}

impl ConfigValidator for BoxDecoderConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_f32_range(self.low_text_threshold, 0.0, 1.0, "low_text_threshold")?;
        self.validate_f32_range(self.text_threshold, 0.0, 1.0, "text_threshold")?;
        if self.text_threshold < self.low_text_threshold {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "text_threshold ({}) must not be below low_text_threshold ({})",
                    self.text_threshold, self.low_text_threshold
                ),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Running statistics of one labelled component.
#[derive(Debug, Clone, Copy)]
struct ComponentStats {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: usize,
    peak: f32,
}

impl ComponentStats {
    fn new(x: u32, y: u32, score: f32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            area: 1,
            peak: score,
        }
    }

    fn add(&mut self, x: u32, y: u32, score: f32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
        self.area += 1;
        self.peak = self.peak.max(score);
    }

    /// Side length of the square structuring element for this component.
    fn dilation_kernel(&self) -> u32 {
        let w = self.max_x - self.min_x + 1;
        let h = self.max_y - self.min_y + 1;
        1 + (w.min(h) as f32).sqrt() as u32
    }

    /// Bounding box in heatmap coordinates with exclusive right/bottom edges,
    /// grown by `kernel` and clamped to the heatmap.
    fn grown_box(&self, kernel: u32, map_width: u32, map_height: u32) -> (u32, u32, u32, u32) {
        let before = kernel / 2;
        let after = kernel - 1 - before;
        (
            self.min_x.saturating_sub(before),
            self.min_y.saturating_sub(before),
            (self.max_x + 1 + after).min(map_width),
            (self.max_y + 1 + after).min(map_height),
        )
    }
}

/// Converts a region heatmap into text boxes.
#[derive(Debug, Clone, Default)]
pub struct HeatmapBoxDecoder {
    config: BoxDecoderConfig,
}

impl HeatmapBoxDecoder {
    /// Creates a decoder with the given configuration.
    pub fn new(config: BoxDecoderConfig) -> Self {
        Self { config }
    }

    /// Returns the decoder configuration.
    pub fn config(&self) -> &BoxDecoderConfig {
        &self.config
    }

    /// Decodes `heatmap` (rows x columns) into boxes in the coordinates of an
    /// `original_size` image, given as `(width, height)`.
    ///
    /// Boxes are clipped to the image, never degenerate, and none is fully
    /// contained in another. An empty or all-background heatmap yields an
    /// empty list.
    pub fn decode(&self, heatmap: ArrayView2<'_, f32>, original_size: (u32, u32)) -> Vec<TextBox> {
        let (rows, cols) = heatmap.dim();
        let (map_width, map_height) = (cols as u32, rows as u32);
        let Some(scale) = ScaleFactors::new((map_width, map_height), original_size) else {
            return Vec::new();
        };
        if original_size.0 == 0 || original_size.1 == 0 {
            return Vec::new();
        }

        let components = self.collect_components(heatmap);
        let mut kept: Vec<ComponentStats> = components
            .into_iter()
            .filter(|c| c.area >= self.config.min_component_area)
            .filter(|c| c.peak >= self.config.text_threshold)
            .collect();
        kept.sort_by_key(|c| (c.min_y, c.min_x));
        if kept.is_empty() {
            return Vec::new();
        }

        let global_peak = kept.iter().map(|c| c.peak).fold(f32::MIN, f32::max);
        let boxes: Vec<TextBox> = kept
            .iter()
            .map(|c| {
                let kernel = if self.config.dilate {
                    c.dilation_kernel()
                } else {
                    1
                };
                let (x0, y0, x1, y1) = c.grown_box(kernel, map_width, map_height);
                let confidence = if global_peak > 0.0 {
                    (c.peak / global_peak).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                TextBox::new(x0 as f32, y0 as f32, x1 as f32, y1 as f32, confidence)
                    .rescaled(&scale)
            })
            .filter(|b| !b.is_degenerate())
            .collect();

        let boxes = remove_contained(boxes);
        tracing::debug!(
            "decoded {} boxes from {}x{} heatmap",
            boxes.len(),
            map_width,
            map_height
        );
        boxes
    }

    /// Labels the thresholded heatmap and gathers per-component statistics.
    fn collect_components(&self, heatmap: ArrayView2<'_, f32>) -> Vec<ComponentStats> {
        let (rows, cols) = heatmap.dim();
        let threshold = self.config.low_text_threshold;
        let mask = GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
            if heatmap[[y as usize, x as usize]] >= threshold {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });

        let labels = connected_components(&mask, Connectivity::Four, Luma([0u8]));
        let mut stats: Vec<Option<ComponentStats>> = Vec::new();
        for (x, y, label) in labels.enumerate_pixels() {
            let label = label[0] as usize;
            if label == 0 {
                continue;
            }
            if stats.len() < label {
                stats.resize(label, None);
            }
            let score = heatmap[[y as usize, x as usize]];
            let slot = &mut stats[label - 1];
            match slot {
                Some(component) => component.add(x, y, score),
                None => *slot = Some(ComponentStats::new(x, y, score)),
            }
        }
        stats.into_iter().flatten().collect()
    }
}

/// Drops every box that lies entirely inside another box.
///
/// Of two identical boxes the first one is kept.
pub fn remove_contained(boxes: Vec<TextBox>) -> Vec<TextBox> {
    let keep: Vec<bool> = boxes
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            !boxes.iter().enumerate().any(|(j, other)| {
                i != j && other.contains(candidate) && (!candidate.contains(other) || j < i)
            })
        })
        .collect();
    boxes
        .into_iter()
        .zip(keep)
        .filter_map(|(b, k)| k.then_some(b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn paint(map: &mut Array2<f32>, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>, v: f32) {
        for y in rows {
            for x in cols.clone() {
                map[[y, x]] = v;
            }
        }
    }

    #[test]
    fn test_blank_map_yields_no_boxes() {
        let decoder = HeatmapBoxDecoder::default();
        let map = Array2::<f32>::zeros((64, 64));
        assert!(decoder.decode(map.view(), (64, 64)).is_empty());

        let empty = Array2::<f32>::zeros((0, 0));
        assert!(decoder.decode(empty.view(), (64, 64)).is_empty());
    }

    #[test]
    fn test_single_region_is_grown_and_bounded() {
        let decoder = HeatmapBoxDecoder::default();
        let mut map = Array2::<f32>::zeros((100, 100));
        paint(&mut map, 20..29, 10..50, 0.9);

        let boxes = decoder.decode(map.view(), (100, 100));
        assert_eq!(boxes.len(), 1);
        let b = boxes[0];
        // 40x9 component: kernel = 1 + floor(sqrt(9)) = 4, grows 2 before and 1 after.
        assert_eq!((b.x_min, b.y_min, b.x_max, b.y_max), (8.0, 18.0, 51.0, 30.0));
        assert!((b.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weak_and_tiny_components_are_dropped() {
        let decoder = HeatmapBoxDecoder::default();
        let mut map = Array2::<f32>::zeros((50, 50));
        // Above low threshold but peak below text threshold.
        paint(&mut map, 5..15, 5..15, 0.5);
        // Strong but only 4 pixels.
        paint(&mut map, 30..32, 30..32, 0.95);
        assert!(decoder.decode(map.view(), (50, 50)).is_empty());
    }

    #[test]
    fn test_confidence_is_relative_to_strongest_component() {
        let decoder = HeatmapBoxDecoder::new(BoxDecoderConfig {
            dilate: false,
            ..Default::default()
        });
        let mut map = Array2::<f32>::zeros((40, 80));
        paint(&mut map, 5..15, 5..25, 0.8);
        paint(&mut map, 5..15, 50..70, 0.64);

        let boxes = decoder.decode(map.view(), (80, 40));
        assert_eq!(boxes.len(), 2);
        assert!((boxes[0].confidence - 1.0).abs() < 1e-6);
        assert!((boxes[1].confidence - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_boxes_are_rescaled_to_original_size() {
        let decoder = HeatmapBoxDecoder::new(BoxDecoderConfig {
            dilate: false,
            ..Default::default()
        });
        let mut map = Array2::<f32>::zeros((50, 100));
        paint(&mut map, 10..20, 10..30, 0.9);

        let boxes = decoder.decode(map.view(), (200, 100));
        assert_eq!(boxes.len(), 1);
        let b = boxes[0];
        assert_eq!((b.x_min, b.y_min, b.x_max, b.y_max), (20.0, 20.0, 60.0, 40.0));
    }

    #[test]
    fn test_boxes_touching_border_are_clipped() {
        let decoder = HeatmapBoxDecoder::default();
        let mut map = Array2::<f32>::zeros((30, 30));
        paint(&mut map, 0..30, 0..30, 0.9);

        let boxes = decoder.decode(map.view(), (30, 30));
        assert_eq!(boxes.len(), 1);
        assert!(boxes[0].within_bounds(30, 30));
        assert!(!boxes[0].is_degenerate());
    }

    #[test]
    fn test_remove_contained_keeps_container() {
        let outer = TextBox::new(0.0, 0.0, 10.0, 10.0, 1.0);
        let inner = TextBox::new(2.0, 2.0, 5.0, 5.0, 0.7);
        let apart = TextBox::new(20.0, 20.0, 30.0, 30.0, 0.7);
        let kept = remove_contained(vec![inner, outer, apart, outer]);
        assert_eq!(kept, vec![outer, apart]);
    }

    #[test]
    fn test_config_validation() {
        assert!(BoxDecoderConfig::default().validate().is_ok());
        let bad = BoxDecoderConfig {
            text_threshold: 0.2,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
