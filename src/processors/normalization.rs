//! Image normalization for segmentation input.
//!
//! Converts 8-bit RGB tiles into the float tensors the network consumes,
//! applying `(value * scale - mean) / std` per channel.

use crate::core::{IMAGENET_MEAN, IMAGENET_STD, OCRError};
use crate::processors::types::ChannelOrder;
use image::RgbImage;
use ndarray::Array3;

/// Normalizes images for the segmentation network.
///
/// This struct encapsulates the parameters needed to normalize images,
/// including scaling factors, mean values, standard deviations, and channel ordering.
/// The per-channel transform is folded into `alpha` and `beta` up front so each
/// pixel costs one multiply-add.
#[derive(Debug, Clone)]
pub struct NormalizeImage {
    /// Scaling factors for each channel (alpha = scale / std)
    pub alpha: [f32; 3],
    /// Offset values for each channel (beta = -mean / std)
    pub beta: [f32; 3],
    /// Channel ordering (CHW or HWC)
    pub order: ChannelOrder,
}

impl NormalizeImage {
    /// Creates a new NormalizeImage instance with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `scale` - Optional scaling factor (defaults to 1.0/255.0)
    /// * `mean` - Optional mean values for each channel (defaults to ImageNet means)
    /// * `std` - Optional standard deviation values for each channel (defaults to ImageNet stds)
    /// * `order` - Optional channel ordering (defaults to CHW)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * Scale is less than or equal to 0
    /// * Any standard deviation value is less than or equal to 0
    /// * The folded coefficients are not finite
    pub fn new(
        scale: Option<f32>,
        mean: Option<[f32; 3]>,
        std: Option<[f32; 3]>,
        order: Option<ChannelOrder>,
    ) -> Result<Self, OCRError> {
        let scale = scale.unwrap_or(1.0 / 255.0);
        let mean = mean.unwrap_or(IMAGENET_MEAN);
        let std = std.unwrap_or(IMAGENET_STD);
        let order = order.unwrap_or_default();

        if scale <= 0.0 {
            return Err(OCRError::ConfigError {
                message: "Scale must be greater than 0".to_string(),
            });
        }

        for (i, &s) in std.iter().enumerate() {
            if s <= 0.0 {
                return Err(OCRError::ConfigError {
                    message: format!(
                        "Standard deviation at index {i} must be greater than 0, got {s}"
                    ),
                });
            }
        }

        let alpha = [scale / std[0], scale / std[1], scale / std[2]];
        let beta = [-mean[0] / std[0], -mean[1] / std[1], -mean[2] / std[2]];

        let normalizer = Self { alpha, beta, order };
        normalizer.validate_config()?;
        Ok(normalizer)
    }

    /// ImageNet statistics in RGB order, CHW layout.
    pub fn imagenet() -> Result<Self, OCRError> {
        Self::new(None, None, None, Some(ChannelOrder::CHW))
    }

    /// Validates that every folded coefficient is finite.
    pub fn validate_config(&self) -> Result<(), OCRError> {
        for (i, &alpha) in self.alpha.iter().enumerate() {
            if !alpha.is_finite() {
                return Err(OCRError::ConfigError {
                    message: format!("Alpha value at index {i} is not finite: {alpha}"),
                });
            }
        }

        for (i, &beta) in self.beta.iter().enumerate() {
            if !beta.is_finite() {
                return Err(OCRError::ConfigError {
                    message: format!("Beta value at index {i} is not finite: {beta}"),
                });
            }
        }

        Ok(())
    }

    /// Normalizes a single RGB image into a 3-D tensor.
    ///
    /// The tensor is `[3, height, width]` for CHW and `[height, width, 3]` for HWC.
    pub fn normalize(&self, img: &RgbImage) -> Array3<f32> {
        let (width, height) = img.dimensions();
        let (w, h) = (width as usize, height as usize);

        match self.order {
            ChannelOrder::CHW => {
                let mut out = Array3::<f32>::zeros((3, h, w));
                for (x, y, pixel) in img.enumerate_pixels() {
                    for c in 0..3 {
                        out[[c, y as usize, x as usize]] =
                            pixel[c] as f32 * self.alpha[c] + self.beta[c];
                    }
                }
                out
            }
            ChannelOrder::HWC => {
                let mut out = Array3::<f32>::zeros((h, w, 3));
                for (x, y, pixel) in img.enumerate_pixels() {
                    for c in 0..3 {
                        out[[y as usize, x as usize, c]] =
                            pixel[c] as f32 * self.alpha[c] + self.beta[c];
                    }
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_imagenet_normalization_values() {
        let normalizer = NormalizeImage::imagenet().unwrap();
        let img = RgbImage::from_pixel(2, 1, Rgb([255, 0, 128]));
        let out = normalizer.normalize(&img);

        assert_eq!(out.shape(), &[3, 1, 2]);
        let expected_r = (1.0 - 0.485) / 0.229;
        let expected_g = (0.0 - 0.456) / 0.224;
        let expected_b = (128.0 / 255.0 - 0.406) / 0.225;
        assert!((out[[0, 0, 1]] - expected_r).abs() < 1e-5);
        assert!((out[[1, 0, 0]] - expected_g).abs() < 1e-5);
        assert!((out[[2, 0, 1]] - expected_b).abs() < 1e-5);
    }

    #[test]
    fn test_hwc_layout() {
        let normalizer = NormalizeImage::new(
            Some(1.0),
            Some([0.0; 3]),
            Some([1.0; 3]),
            Some(ChannelOrder::HWC),
        )
        .unwrap();
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(2, 1, Rgb([1, 2, 3]));
        let out = normalizer.normalize(&img);
        assert_eq!(out.shape(), &[2, 3, 3]);
        assert_eq!(out[[1, 2, 0]], 1.0);
        assert_eq!(out[[1, 2, 2]], 3.0);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(NormalizeImage::new(Some(0.0), None, None, None).is_err());
        assert!(NormalizeImage::new(None, None, Some([0.2, 0.0, 0.2]), None).is_err());
    }
}
