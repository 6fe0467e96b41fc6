//! Input Validation Utilities
//!
//! Small checks shared by the pipeline stages so that malformed input is
//! rejected with an error instead of a panic further down.

use crate::core::OCRError;

/// Validates that every input image is a non-empty raster.
///
/// Returns [`OCRError::InvalidImage`] naming the first offending index.
pub fn validate_input_images(images: &[image::DynamicImage]) -> Result<(), OCRError> {
    for (index, img) in images.iter().enumerate() {
        let (width, height) = (img.width(), img.height());
        if width == 0 || height == 0 {
            return Err(OCRError::invalid_image(
                index,
                format!("image dimensions must be positive, got {width}x{height}"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    #[test]
    fn test_validate_input_images_reports_index() {
        let images = vec![
            DynamicImage::ImageRgb8(RgbImage::new(4, 4)),
            DynamicImage::ImageRgb8(RgbImage::new(0, 4)),
        ];
        match validate_input_images(&images) {
            Err(OCRError::InvalidImage { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected InvalidImage, got {other:?}"),
        }
    }
}
