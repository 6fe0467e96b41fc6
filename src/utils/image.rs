//! Utility functions for loading images.
//!
//! The pipeline consumes `DynamicImage`s; these helpers read them from disk,
//! one at a time or in parallel batches.

use crate::core::OCRError;
use crate::core::config::ParallelPolicy;
use image::DynamicImage;
use rayon::prelude::*;
use std::path::Path;

/// Loads an image from a file path.
///
/// # Errors
///
/// This function will return an `OCRError::ImageLoad` error if the image cannot
/// be opened or decoded.
pub fn load_image(path: &Path) -> Result<DynamicImage, OCRError> {
    image::open(path).map_err(OCRError::ImageLoad)
}

/// Loads a batch of images from file paths.
///
/// Uses parallel loading when the number of images exceeds the default
/// utility threshold of [`ParallelPolicy`].
pub fn load_images_batch<P: AsRef<Path> + Send + Sync>(
    paths: &[P],
) -> Result<Vec<DynamicImage>, OCRError> {
    load_images_batch_with_policy(paths, &ParallelPolicy::default())
}

/// Loads a batch of images, parallelising per `policy.utility_threshold`.
///
/// The output order matches `paths`. The first failure aborts the batch.
pub fn load_images_batch_with_policy<P: AsRef<Path> + Send + Sync>(
    paths: &[P],
    policy: &ParallelPolicy,
) -> Result<Vec<DynamicImage>, OCRError> {
    if paths.len() > policy.utility_threshold {
        paths.par_iter().map(|p| load_image(p.as_ref())).collect()
    } else {
        paths.iter().map(|p| load_image(p.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_load_missing_image_fails() {
        let err = load_image(Path::new("definitely/missing.png")).unwrap_err();
        assert!(matches!(err, OCRError::ImageLoad(_)));
    }

    #[test]
    fn test_batch_load_preserves_order() {
        let dir = std::env::temp_dir().join(format!("oar_segdet_load_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let paths: Vec<_> = (0..3u32)
            .map(|i| {
                let path = dir.join(format!("img_{i}.png"));
                RgbImage::from_pixel(i + 1, 2, Rgb([0, 0, 0])).save(&path).unwrap();
                path
            })
            .collect();

        let policy = ParallelPolicy::new().with_utility_threshold(0);
        let images = load_images_batch_with_policy(&paths, &policy).unwrap();
        let widths: Vec<u32> = images.iter().map(|img| img.width()).collect();
        assert_eq!(widths, vec![1, 2, 3]);

        std::fs::remove_dir_all(&dir).ok();
    }
}
