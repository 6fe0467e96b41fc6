//! Reassembly of per-tile maps into per-image maps.
//!
//! Tiles are grouped by their source image, ordered by position, cropped to
//! their real content rows and stacked vertically. The result is a pair of
//! maps whose height is exactly the sum of the tiles' content heights.

use crate::core::{OCRError, OcrResult};
use crate::pipeline::batch_runner::HeatmapPair;
use ndarray::{Array2, ArrayView2, Axis, concatenate, s};

/// Full-height maps of one source image.
#[derive(Debug, Clone)]
pub struct StitchedMaps {
    /// Index of the source image.
    pub source_index: usize,
    /// Region heatmap, `sum(content_height) x tile_width`.
    pub heatmap: Array2<f32>,
    /// Affinity map with the same shape as `heatmap`.
    pub affinity: Array2<f32>,
}

/// Stitches the tile maps of `image_count` images.
///
/// `pairs` may arrive in any order. The output holds one entry per image,
/// ordered by image index.
///
/// # Errors
///
/// Returns a stitching error when the tile bookkeeping is inconsistent: an
/// image without tiles, a duplicated or missing tile position, an unknown
/// source image, a content height of zero or larger than the map, or tiles
/// of one image with different widths.
pub fn stitch_maps(pairs: Vec<HeatmapPair>, image_count: usize) -> OcrResult<Vec<StitchedMaps>> {
    let mut groups: Vec<Vec<HeatmapPair>> = (0..image_count).map(|_| Vec::new()).collect();
    for pair in pairs {
        let index = pair.tag.source_index;
        let group = groups.get_mut(index).ok_or_else(|| {
            OCRError::stitching_error(format!(
                "tile {:?} references image {index} but only {image_count} images were submitted",
                pair.tag
            ))
        })?;
        group.push(pair);
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(index, group)| stitch_one(index, group))
        .collect()
}

fn stitch_one(source_index: usize, mut tiles: Vec<HeatmapPair>) -> OcrResult<StitchedMaps> {
    if tiles.is_empty() {
        return Err(OCRError::stitching_error(format!(
            "image {source_index} has no tiles"
        )));
    }
    tiles.sort_by_key(|t| t.tag.order_in_source);

    let width = tiles[0].heatmap.ncols();
    for (expected, tile) in tiles.iter().enumerate() {
        let order = tile.tag.order_in_source;
        if order != expected {
            let problem = if order < expected { "duplicated" } else { "missing" };
            let position = if order < expected { order } else { expected };
            return Err(OCRError::stitching_error(format!(
                "image {source_index}: tile position {position} is {problem}"
            )));
        }
        let content = tile.content_height as usize;
        let rows = tile.heatmap.nrows().min(tile.affinity.nrows());
        if content == 0 || content > rows {
            return Err(OCRError::stitching_error(format!(
                "image {source_index} tile {order}: content height {content} outside map height {rows}"
            )));
        }
        if tile.heatmap.ncols() != width || tile.affinity.ncols() != width {
            return Err(OCRError::stitching_error(format!(
                "image {source_index} tile {order}: width {} differs from {width}",
                tile.heatmap.ncols()
            )));
        }
    }

    let trim = |map: &Array2<f32>, rows: u32| -> Array2<f32> {
        map.slice(s![..rows as usize, ..]).to_owned()
    };
    let heat_parts: Vec<Array2<f32>> = tiles
        .iter()
        .map(|t| trim(&t.heatmap, t.content_height))
        .collect();
    let aff_parts: Vec<Array2<f32>> = tiles
        .iter()
        .map(|t| trim(&t.affinity, t.content_height))
        .collect();

    let heatmap = vstack(&heat_parts)?;
    let affinity = vstack(&aff_parts)?;
    tracing::debug!(
        "stitched image {} from {} tiles into {}x{} maps",
        source_index,
        tiles.len(),
        heatmap.ncols(),
        heatmap.nrows()
    );

    Ok(StitchedMaps {
        source_index,
        heatmap,
        affinity,
    })
}

fn vstack(parts: &[Array2<f32>]) -> OcrResult<Array2<f32>> {
    let views: Vec<ArrayView2<'_, f32>> = parts.iter().map(|p| p.view()).collect();
    concatenate(Axis(0), &views).map_err(OCRError::Tensor)
}
