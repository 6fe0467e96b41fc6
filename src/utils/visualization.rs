//! Visualization utilities for detection results.
//!
//! This module draws the text boxes and separator lines of a
//! [`DetectionResult`] on top of the source image, and can place the two
//! diagnostic heatmaps next to it for inspection.
//!
//! # Examples
//!
//! ```rust,no_run
//! use oar_segdet::utils::visualization::{draw_detections, VisualizationConfig};
//! // let result = detect(&images, &model, &config)?.remove(0);
//! // let overlay = draw_detections(&images[0], &result, &VisualizationConfig::default());
//! // overlay.save("overlay.png")?;
//! ```

use crate::core::OCRError;
use crate::pipeline::DetectionResult;
use crate::processors::{Line, LineOrientation, TextBox};

use image::{DynamicImage, GrayImage, Rgb, RgbImage, imageops};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{debug, info};

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const VERTICAL_LINE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const HORIZONTAL_LINE_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Configuration for detection overlays.
#[derive(Debug, Clone)]
pub struct VisualizationConfig {
    /// The thickness of box outlines. Defaults to 2.
    pub box_thickness: u32,

    /// The thickness of separator lines. Defaults to 2.
    pub line_thickness: u32,

    /// Whether to draw boxes.
    pub draw_boxes: bool,

    /// Whether to draw vertical and horizontal separator lines.
    pub draw_lines: bool,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            box_thickness: 2,
            line_thickness: 2,
            draw_boxes: true,
            draw_lines: true,
        }
    }
}

/// Draws the boxes and lines of `result` over `image`.
pub fn draw_detections(
    image: &DynamicImage,
    result: &DetectionResult,
    config: &VisualizationConfig,
) -> RgbImage {
    let mut canvas = image.to_rgb8();

    if config.draw_boxes {
        for text_box in &result.boxes {
            draw_box(&mut canvas, text_box, config.box_thickness);
        }
    }
    if config.draw_lines {
        for line in &result.vertical_lines {
            draw_line(&mut canvas, line, VERTICAL_LINE_COLOR, config.line_thickness);
        }
        for line in &result.horizontal_lines {
            draw_line(&mut canvas, line, HORIZONTAL_LINE_COLOR, config.line_thickness);
        }
    }

    debug!(
        "drew {} boxes and {} lines",
        result.boxes.len(),
        result.vertical_lines.len() + result.horizontal_lines.len()
    );
    canvas
}

/// Places the overlay and both heatmaps side by side.
///
/// The heatmaps are resized to the overlay's size so the three panels line
/// up row for row.
pub fn create_detection_visualization(
    image: &DynamicImage,
    result: &DetectionResult,
    config: &VisualizationConfig,
) -> RgbImage {
    let overlay = draw_detections(image, result, config);
    let (width, height) = overlay.dimensions();

    let panel = |map: &GrayImage| -> RgbImage {
        let grey = if map.dimensions() == (width, height) || map.width() == 0 || map.height() == 0 {
            map.clone()
        } else {
            imageops::resize(map, width, height, imageops::FilterType::Triangle)
        };
        DynamicImage::ImageLuma8(grey).to_rgb8()
    };
    let region = panel(&result.region_heatmap_image);
    let affinity = panel(&result.affinity_heatmap_image);

    let mut combined = RgbImage::new(width * 3, height);
    imageops::replace(&mut combined, &overlay, 0, 0);
    imageops::replace(&mut combined, &region, width as i64, 0);
    imageops::replace(&mut combined, &affinity, 2 * width as i64, 0);
    combined
}

/// Saves a visualization, logging where it went.
pub fn save_visualization(image: &RgbImage, path: &Path) -> Result<(), OCRError> {
    image.save(path).map_err(OCRError::ImageLoad)?;
    info!("visualization saved to {}", path.display());
    Ok(())
}

fn draw_box(canvas: &mut RgbImage, text_box: &TextBox, thickness: u32) {
    let (cw, ch) = canvas.dimensions();
    let x0 = text_box.x_min.max(0.0) as u32;
    let y0 = text_box.y_min.max(0.0) as u32;
    let x1 = (text_box.x_max.ceil() as u32).min(cw);
    let y1 = (text_box.y_max.ceil() as u32).min(ch);

    for t in 0..thickness {
        let left = x0 + t;
        let top = y0 + t;
        let right = x1.saturating_sub(t);
        let bottom = y1.saturating_sub(t);
        if right <= left || bottom <= top {
            break;
        }
        let rect = Rect::at(left as i32, top as i32).of_size(right - left, bottom - top);
        draw_hollow_rect_mut(canvas, rect, BOX_COLOR);
    }
}

fn draw_line(canvas: &mut RgbImage, line: &Line, color: Rgb<u8>, thickness: u32) {
    let half = thickness as f32 / 2.0;
    for t in 0..thickness.max(1) {
        let offset = t as f32 - half + 0.5;
        let (a, b) = (line.start, line.end);
        let (start, end) = match line.orientation {
            LineOrientation::Vertical => {
                ((a.x + offset, a.y), (b.x + offset, b.y))
            }
            LineOrientation::Horizontal => {
                ((a.x, a.y + offset), (b.x, b.y + offset))
            }
        };
        draw_line_segment_mut(canvas, start, end, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(boxes: Vec<TextBox>, vertical: Vec<Line>) -> DetectionResult {
        DetectionResult {
            boxes,
            vertical_lines: vertical,
            horizontal_lines: Vec::new(),
            region_heatmap_image: GrayImage::new(10, 20),
            affinity_heatmap_image: GrayImage::new(10, 20),
            image_size: (40, 40),
        }
    }

    #[test]
    fn test_box_outline_is_drawn() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(40, 40));
        let result = result_with(vec![TextBox::new(5.0, 5.0, 20.0, 15.0, 1.0)], Vec::new());
        let config = VisualizationConfig {
            box_thickness: 1,
            ..Default::default()
        };
        let out = draw_detections(&image, &result, &config);
        assert_eq!(*out.get_pixel(5, 5), BOX_COLOR);
        assert_eq!(*out.get_pixel(12, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_vertical_line_is_drawn() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(40, 40));
        let result = result_with(Vec::new(), vec![Line::vertical(20.0, 0.0, 39.0)]);
        let config = VisualizationConfig {
            line_thickness: 1,
            ..Default::default()
        };
        let out = draw_detections(&image, &result, &config);
        assert_eq!(*out.get_pixel(20, 10), VERTICAL_LINE_COLOR);
    }

    #[test]
    fn test_side_by_side_panels() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(40, 40));
        let result = result_with(Vec::new(), Vec::new());
        let out = create_detection_visualization(&image, &result, &VisualizationConfig::default());
        assert_eq!(out.dimensions(), (120, 40));
    }
}
