//! Per-image detection output.

use crate::processors::{Line, TextBox};
use image::{GrayImage, Luma};
use ndarray::ArrayView2;
use serde::Serialize;

/// Everything detected in one input image.
///
/// Geometry is in the pixel coordinates of the original image. The two
/// heatmap images are diagnostics at stitched-map resolution.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    /// Text regions, top to bottom.
    pub boxes: Vec<TextBox>,
    /// Vertical separators, left to right.
    pub vertical_lines: Vec<Line>,
    /// Horizontal separators, top to bottom.
    pub horizontal_lines: Vec<Line>,
    /// Region heatmap rendered as 8-bit grey.
    #[serde(skip)]
    pub region_heatmap_image: GrayImage,
    /// Affinity map rendered as 8-bit grey.
    #[serde(skip)]
    pub affinity_heatmap_image: GrayImage,
    /// `(width, height)` of the original image.
    pub image_size: (u32, u32),
}

impl DetectionResult {
    /// Returns `true` if neither boxes nor lines were found.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty() && self.vertical_lines.is_empty() && self.horizontal_lines.is_empty()
    }
}

impl std::fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}: {} boxes, {} vertical lines, {} horizontal lines",
            self.image_size.0,
            self.image_size.1,
            self.boxes.len(),
            self.vertical_lines.len(),
            self.horizontal_lines.len()
        )
    }
}

/// Renders a score map as a grey image, scaling by 255 and clamping.
pub fn render_heatmap(map: ArrayView2<'_, f32>) -> GrayImage {
    let (rows, cols) = map.dim();
    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        let v = map[[y as usize, x as usize]];
        let scaled = if v.is_finite() { (v * 255.0).clamp(0.0, 255.0) } else { 0.0 };
        Luma([scaled as u8])
    })
}
