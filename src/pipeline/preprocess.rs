//! Conversion of raw tiles into normalized network input tensors.

use crate::core::config::ParallelPolicy;
use crate::core::errors::SimpleError;
use crate::core::{OCRError, OcrResult};
use crate::pipeline::config::TilingConfig;
use crate::pipeline::tiling::{Tile, TileTag};
use crate::processors::NormalizeImage;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use ndarray::Array3;
use rayon::prelude::*;

/// A tile ready for inference.
#[derive(Debug, Clone)]
pub struct PreparedTile {
    /// Origin of the tile.
    pub tag: TileTag,
    /// Rows of real content before padding.
    pub content_height: u32,
    /// `[3, tile_height, tile_width]` normalized tensor.
    pub tensor: Array3<f32>,
}

/// Pads, resizes and normalizes tiles to the model's input contract.
#[derive(Debug, Clone)]
pub struct TilePreprocessor {
    normalizer: NormalizeImage,
    tile_width: u32,
    tile_height: u32,
    pad_value: u8,
}

impl TilePreprocessor {
    /// Creates a preprocessor for the given tiling with ImageNet normalization.
    pub fn new(tiling: &TilingConfig) -> OcrResult<Self> {
        Self::with_normalizer(tiling, NormalizeImage::imagenet()?)
    }

    /// Creates a preprocessor with a custom normalizer.
    pub fn with_normalizer(tiling: &TilingConfig, normalizer: NormalizeImage) -> OcrResult<Self> {
        if tiling.tile_width == 0 || tiling.tile_height == 0 {
            return Err(OCRError::config_error(format!(
                "tile size must be positive, got {}x{}",
                tiling.tile_width, tiling.tile_height
            )));
        }
        Ok(Self {
            normalizer,
            tile_width: tiling.tile_width,
            tile_height: tiling.tile_height,
            pad_value: tiling.pad_value,
        })
    }

    /// Prepares a single tile.
    ///
    /// Tiles shorter than the model height are padded at the bottom with the
    /// configured fill, then every tile is resized to exactly
    /// `tile_width x tile_height` with bilinear filtering.
    pub fn prepare(&self, tile: Tile) -> OcrResult<PreparedTile> {
        let Tile {
            tag,
            image,
            content_height,
        } = tile;
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OCRError::normalization(
                &format!("tile {tag:?} is empty"),
                SimpleError::new(format!("empty tile {width}x{height}")),
            ));
        }
        if height > self.tile_height {
            return Err(OCRError::normalization(
                &format!("tile {tag:?} has {height} rows, more than the model height"),
                SimpleError::new(format!(
                    "tile height {height} exceeds {}",
                    self.tile_height
                )),
            ));
        }

        let padded = if height < self.tile_height {
            let mut canvas = RgbImage::from_pixel(width, self.tile_height, Rgb([self.pad_value; 3]));
            imageops::replace(&mut canvas, &image, 0, 0);
            canvas
        } else {
            image
        };

        let resized = if padded.width() == self.tile_width {
            padded
        } else {
            imageops::resize(&padded, self.tile_width, self.tile_height, FilterType::Triangle)
        };

        Ok(PreparedTile {
            tag,
            content_height,
            tensor: self.normalizer.normalize(&resized),
        })
    }

    /// Prepares all tiles, in parallel above the policy's tile threshold.
    ///
    /// The output order matches the input order.
    pub fn prepare_all(
        &self,
        tiles: Vec<Tile>,
        policy: &ParallelPolicy,
    ) -> OcrResult<Vec<PreparedTile>> {
        if policy.parallel_tiles(tiles.len()) {
            tiles
                .into_par_iter()
                .map(|tile| self.prepare(tile))
                .collect()
        } else {
            tiles.into_iter().map(|tile| self.prepare(tile)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(order: usize, width: u32, height: u32, value: u8) -> Tile {
        Tile {
            tag: TileTag {
                source_index: 0,
                order_in_source: order,
            },
            image: RgbImage::from_pixel(width, height, Rgb([value; 3])),
            content_height: height,
        }
    }

    #[test]
    fn test_output_shape_is_model_input() {
        let tiling = TilingConfig::new(64, 32);
        let pre = TilePreprocessor::new(&tiling).unwrap();
        let prepared = pre.prepare(tile(0, 100, 20, 0)).unwrap();
        assert_eq!(prepared.tensor.shape(), &[3, 32, 64]);
        assert_eq!(prepared.content_height, 20);
    }

    #[test]
    fn test_padding_rows_use_fill_value() {
        let tiling = TilingConfig::new(16, 16);
        let pre = TilePreprocessor::new(&tiling).unwrap();
        let prepared = pre.prepare(tile(0, 16, 4, 0)).unwrap();

        let white_r = (1.0 - 0.485) / 0.229;
        let black_r = (0.0 - 0.485) / 0.229;
        assert!((prepared.tensor[[0, 15, 8]] - white_r).abs() < 1e-4);
        assert!((prepared.tensor[[0, 0, 8]] - black_r).abs() < 1e-4);
    }

    #[test]
    fn test_prepare_all_preserves_order() {
        let tiling = TilingConfig::new(8, 8);
        let pre = TilePreprocessor::new(&tiling).unwrap();
        let tiles: Vec<Tile> = (0..6).map(|k| tile(k, 8, 8, 10 * k as u8)).collect();
        let policy = ParallelPolicy::new().with_tile_threshold(0);
        let prepared = pre.prepare_all(tiles, &policy).unwrap();

        let orders: Vec<usize> = prepared.iter().map(|p| p.tag.order_in_source).collect();
        assert_eq!(orders, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_rejects_tile_taller_than_model() {
        let tiling = TilingConfig::new(8, 8);
        let pre = TilePreprocessor::new(&tiling).unwrap();
        assert!(pre.prepare(tile(0, 8, 9, 0)).is_err());
    }
}
