//! Bilinear resampling of score maps.
//!
//! Network outputs are often produced at a fraction of the input resolution.
//! They are brought back to tile resolution with bilinear interpolation using
//! half-pixel centres, which matches `align_corners = false` in the common
//! deep-learning frameworks.

use crate::core::OCRError;
use crate::core::errors::ImageProcessError;
use ndarray::{Array2, ArrayView2};

/// Source taps for one output coordinate along one axis.
#[derive(Debug, Clone, Copy)]
struct Tap {
    lo: usize,
    hi: usize,
    weight_hi: f32,
}

/// Computes the taps for every output coordinate along an axis.
///
/// `src = (dst + 0.5) * in / out - 0.5`, clamped below at zero; the upper
/// neighbour is clamped to the last input index.
fn axis_taps(in_len: usize, out_len: usize) -> Vec<Tap> {
    let scale = in_len as f32 / out_len as f32;
    let last = in_len.saturating_sub(1);
    (0..out_len)
        .map(|dst| {
            let src = ((dst as f32 + 0.5) * scale - 0.5).max(0.0);
            let lo = (src.floor() as usize).min(last);
            let hi = (lo + 1).min(last);
            Tap {
                lo,
                hi,
                weight_hi: src - lo as f32,
            }
        })
        .collect()
}

/// Resizes a 2-D map to `out_height x out_width` with bilinear filtering.
///
/// Returns a copy when the size already matches.
///
/// # Errors
///
/// Returns a resize error when the input or the target has a zero dimension.
pub fn resize_bilinear(
    map: ArrayView2<'_, f32>,
    out_height: usize,
    out_width: usize,
) -> Result<Array2<f32>, OCRError> {
    let (in_height, in_width) = map.dim();
    if out_height == 0 || out_width == 0 {
        return Err(OCRError::resize_error(
            &format!("target size {out_width}x{out_height} is empty"),
            ImageProcessError::InvalidTargetSize {
                width: out_width as u32,
                height: out_height as u32,
            },
        ));
    }
    if in_height == 0 || in_width == 0 {
        return Err(OCRError::resize_error(
            &format!("source map {in_width}x{in_height} is empty"),
            ImageProcessError::InvalidInput,
        ));
    }
    if (in_height, in_width) == (out_height, out_width) {
        return Ok(map.to_owned());
    }

    let rows = axis_taps(in_height, out_height);
    let cols = axis_taps(in_width, out_width);

    let out = Array2::from_shape_fn((out_height, out_width), |(y, x)| {
        let r = rows[y];
        let c = cols[x];
        let top = map[[r.lo, c.lo]] * (1.0 - c.weight_hi) + map[[r.lo, c.hi]] * c.weight_hi;
        let bottom = map[[r.hi, c.lo]] * (1.0 - c.weight_hi) + map[[r.hi, c.hi]] * c.weight_hi;
        top * (1.0 - r.weight_hi) + bottom * r.weight_hi
    });
    Ok(out)
}
