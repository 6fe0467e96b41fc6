//! Splitting of input images into model-height horizontal bands.

use crate::core::config::ParallelPolicy;
use crate::core::{OCRError, OcrResult};
use crate::pipeline::config::TilingConfig;
use image::RgbImage;
use image::imageops::{self, FilterType};
use rayon::prelude::*;

/// Identifies where a tile came from.
///
/// Carried unchanged through normalization, inference and stitching so that
/// per-tile maps can be reassembled without relying on positional order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileTag {
    /// Index of the source image in the input sequence.
    pub source_index: usize,
    /// Position of the tile within its image, top to bottom, from zero.
    pub order_in_source: usize,
}

/// One horizontal band of a source image, before normalization.
#[derive(Debug, Clone)]
pub struct Tile {
    /// Origin of the tile.
    pub tag: TileTag,
    /// The band's pixels at full source width; at most `tile_height` rows.
    pub image: RgbImage,
    /// Rows of real content, i.e. the tile height before padding.
    pub content_height: u32,
}

/// Cuts one image into consecutive bands of `config.tile_height` rows.
///
/// Bands cover the image top to bottom with no gap or overlap; only the last
/// one may be shorter. An image no taller than `single_tile_max_height` is
/// instead stretched into a single full-height tile.
///
/// # Errors
///
/// Returns [`OCRError::InvalidImage`] for an empty image and a tiling error
/// for a zero tile height.
pub fn split_image(index: usize, image: &RgbImage, config: &TilingConfig) -> OcrResult<Vec<Tile>> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(OCRError::invalid_image(
            index,
            format!("image dimensions must be positive, got {width}x{height}"),
        ));
    }
    let tile_height = config.tile_height;
    if tile_height == 0 {
        return Err(OCRError::tiling_error("tile height must be positive"));
    }

    if let Some(limit) = config.single_tile_max_height
        && height <= limit
    {
        let stretched = if height == tile_height {
            image.clone()
        } else {
            imageops::resize(image, width, tile_height, FilterType::Triangle)
        };
        return Ok(vec![Tile {
            tag: TileTag {
                source_index: index,
                order_in_source: 0,
            },
            image: stretched,
            content_height: tile_height,
        }]);
    }

    let tiles = (0..height)
        .step_by(tile_height as usize)
        .enumerate()
        .map(|(order, top)| {
            let rows = tile_height.min(height - top);
            Tile {
                tag: TileTag {
                    source_index: index,
                    order_in_source: order,
                },
                image: imageops::crop_imm(image, 0, top, width, rows).to_image(),
                content_height: rows,
            }
        })
        .collect();
    Ok(tiles)
}

/// Splits every image and concatenates the tiles in image order.
pub fn split_images(
    images: &[RgbImage],
    config: &TilingConfig,
    policy: &ParallelPolicy,
) -> OcrResult<Vec<Tile>> {
    let per_image: Vec<Vec<Tile>> = if policy.parallel_images(images.len()) {
        images
            .par_iter()
            .enumerate()
            .map(|(index, image)| split_image(index, image, config))
            .collect::<OcrResult<_>>()?
    } else {
        images
            .iter()
            .enumerate()
            .map(|(index, image)| split_image(index, image, config))
            .collect::<OcrResult<_>>()?
    };

    let tiles: Vec<Tile> = per_image.into_iter().flatten().collect();
    tracing::debug!("split {} images into {} tiles", images.len(), tiles.len());
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn striped(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |_, y| Rgb([(y % 256) as u8, 0, 0]))
    }

    #[test]
    fn test_split_heights_cover_image() {
        let config = TilingConfig::new(512, 512);
        let tiles = split_image(0, &striped(1000, 3000), &config).unwrap();

        let heights: Vec<u32> = tiles.iter().map(|t| t.content_height).collect();
        assert_eq!(heights, vec![512, 512, 512, 512, 512, 440]);
        assert_eq!(heights.iter().sum::<u32>(), 3000);
        for (k, tile) in tiles.iter().enumerate() {
            assert_eq!(tile.tag.order_in_source, k);
            assert_eq!(tile.image.width(), 1000);
            assert_eq!(tile.image.height(), tile.content_height);
        }
        // Bands are contiguous: row 0 of tile 1 is source row 512.
        assert_eq!(tiles[1].image.get_pixel(0, 0)[0], (512 % 256) as u8);
    }

    #[test]
    fn test_short_image_yields_single_tile() {
        let config = TilingConfig::new(512, 512);
        let tiles = split_image(3, &striped(200, 130), &config).unwrap();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].content_height, 130);
        assert_eq!(tiles[0].tag.source_index, 3);
    }

    #[test]
    fn test_exact_multiple_has_no_short_tile() {
        let config = TilingConfig::new(64, 100);
        let tiles = split_image(0, &striped(10, 300), &config).unwrap();
        assert_eq!(tiles.len(), 3);
        assert!(tiles.iter().all(|t| t.content_height == 100));
    }

    #[test]
    fn test_single_tile_stretch() {
        let config = TilingConfig::new(256, 256).with_single_tile_max_height(Some(400));
        let tiles = split_image(0, &striped(100, 300), &config).unwrap();
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].image.height(), 256);
        assert_eq!(tiles[0].content_height, 256);

        let tall = split_image(0, &striped(100, 600), &config).unwrap();
        assert_eq!(tall.len(), 3);
    }

    #[test]
    fn test_split_images_keeps_image_order() {
        let images = vec![striped(10, 50), striped(10, 250), striped(10, 100)];
        let config = TilingConfig::new(10, 100);
        let policy = ParallelPolicy::new().with_image_threshold(0);
        let tiles = split_images(&images, &config, &policy).unwrap();

        let tags: Vec<(usize, usize)> = tiles
            .iter()
            .map(|t| (t.tag.source_index, t.tag.order_in_source))
            .collect();
        assert_eq!(tags, vec![(0, 0), (1, 0), (1, 1), (1, 2), (2, 0)]);
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let config = TilingConfig::default();
        let err = split_image(7, &RgbImage::new(0, 10), &config).unwrap_err();
        assert!(matches!(err, OCRError::InvalidImage { index: 7, .. }));
    }
}
