//! Decoding of affinity maps into vertical and horizontal separator lines.
//!
//! Each pass scans the thresholded affinity map lane by lane (columns for
//! vertical lines, rows for horizontal ones) and keeps long foreground runs.
//! Runs are mapped into original coordinates, snapped to a coarse grid on the
//! cross axis and consolidated so that one physical separator yields one line.

use crate::core::config::{ConfigError, ConfigValidator};
use crate::processors::geometry::{Line, ScaleFactors};
use crate::processors::types::LineOrientation;
use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Parameters for [`AffinityLineDecoder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineDecoderConfig {
    /// Score at or above which an affinity pixel counts as line (default: 0.5).
    #[serde(default = "LineDecoderConfig::default_line_threshold")]
    pub line_threshold: f32,
    /// Minimum run length in map pixels (default: 50).
    #[serde(default = "LineDecoderConfig::default_min_line_length")]
    pub min_line_length: usize,
    /// Longest background gap bridged inside a run, in map pixels (default: 2).
    #[serde(default = "LineDecoderConfig::default_max_line_gap")]
    pub max_line_gap: usize,
    /// Cross-axis coordinates are rounded to multiples of this (default: 20).
    /// Zero disables snapping.
    #[serde(default = "LineDecoderConfig::default_snap_divisor")]
    pub snap_divisor: f32,
    /// Collinear segments closer than this along the axis are merged (default: 20).
    #[serde(default = "LineDecoderConfig::default_merge_tolerance_along")]
    pub merge_tolerance_along: f32,
    /// Overlapping segments closer than this across the axis are redundant (default: 40).
    #[serde(default = "LineDecoderConfig::default_merge_tolerance_across")]
    pub merge_tolerance_across: f32,
}

impl LineDecoderConfig {
    fn default_line_threshold() -> f32 {
        0.5
    }

    fn default_min_line_length() -> usize {
        50
    }

    fn default_max_line_gap() -> usize {
        2
    }

    fn default_snap_divisor() -> f32 {
        20.0
    }

    fn default_merge_tolerance_along() -> f32 {
        20.0
    }

    fn default_merge_tolerance_across() -> f32 {
        40.0
    }
}

impl Default for LineDecoderConfig {
    fn default() -> Self {
        Self {
            line_threshold: Self::default_line_threshold(),
            min_line_length: Self::default_min_line_length(),
            max_line_gap: Self::default_max_line_gap(),
            snap_divisor: Self::default_snap_divisor(),
            merge_tolerance_along: Self::default_merge_tolerance_along(),
            merge_tolerance_across: Self::default_merge_tolerance_across(),
        }
    }
}

impl ConfigValidator for LineDecoderConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_f32_range(self.line_threshold, 0.0, 1.0, "line_threshold")?;
        self.validate_positive_usize(self.min_line_length, "min_line_length")?;
        for (value, name) in [
            (self.snap_divisor, "snap_divisor"),
            (self.merge_tolerance_along, "merge_tolerance_along"),
            (self.merge_tolerance_across, "merge_tolerance_across"),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidConfig {
                    message: format!("{name} must be a non-negative number, got {value}"),
                });
            }
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Extracts table rules and column separators from an affinity map.
#[derive(Debug, Clone, Default)]
pub struct AffinityLineDecoder {
    config: LineDecoderConfig,
}

impl AffinityLineDecoder {
    /// Creates a decoder with the given configuration.
    pub fn new(config: LineDecoderConfig) -> Self {
        Self { config }
    }

    /// Returns the decoder configuration.
    pub fn config(&self) -> &LineDecoderConfig {
        &self.config
    }

    /// Vertical lines of `affinity` in the coordinates of an `original_size`
    /// `(width, height)` image, sorted by x then top.
    pub fn decode_vertical(&self, affinity: ArrayView2<'_, f32>, original_size: (u32, u32)) -> Vec<Line> {
        self.decode(affinity, original_size, LineOrientation::Vertical)
    }

    /// Horizontal lines of `affinity` in the coordinates of an `original_size`
    /// `(width, height)` image, sorted by y then left.
    pub fn decode_horizontal(
        &self,
        affinity: ArrayView2<'_, f32>,
        original_size: (u32, u32),
    ) -> Vec<Line> {
        self.decode(affinity, original_size, LineOrientation::Horizontal)
    }

    fn decode(
        &self,
        affinity: ArrayView2<'_, f32>,
        original_size: (u32, u32),
        orientation: LineOrientation,
    ) -> Vec<Line> {
        let (rows, cols) = affinity.dim();
        let Some(scale) = ScaleFactors::new((cols as u32, rows as u32), original_size) else {
            return Vec::new();
        };

        // Vertical lines run down columns, horizontal lines along rows.
        let lane_axis = match orientation {
            LineOrientation::Vertical => Axis(1),
            LineOrientation::Horizontal => Axis(0),
        };

        // A lane sits at its pixel centre on the cross axis.
        let mut candidates = Vec::new();
        for (cross, lane) in affinity.axis_iter(lane_axis).enumerate() {
            for (lo, hi) in self.lane_runs(lane) {
                candidates.push(Line::with_cross_and_span(
                    orientation,
                    cross as f32 + 0.5,
                    lo as f32,
                    hi as f32,
                ));
            }
        }

        let bound = match orientation {
            LineOrientation::Vertical => scale.bound_width,
            LineOrientation::Horizontal => scale.bound_height,
        };
        let snapped: Vec<Line> = candidates
            .iter()
            .map(|line| line.rescaled(&scale))
            .map(|line| self.snap(line, bound))
            .filter(|line| line.length() > 0.0)
            .collect();

        let merged = self.merge_collinear(snapped);
        let mut lines = self.remove_redundant(merged);
        lines.sort_by(|a, b| {
            a.cross()
                .total_cmp(&b.cross())
                .then(a.span().0.total_cmp(&b.span().0))
        });

        tracing::debug!(
            "decoded {} {:?} lines from {} candidate runs",
            lines.len(),
            orientation,
            candidates.len()
        );
        lines
    }

    /// Foreground runs of one lane as `[start, end)` pairs, bridging short gaps.
    fn lane_runs(&self, lane: ArrayView1<'_, f32>) -> Vec<(usize, usize)> {
        let threshold = self.config.line_threshold;
        let mut runs = Vec::new();
        let mut open: Option<(usize, usize)> = None;

        for (i, &v) in lane.iter().enumerate() {
            if v < threshold {
                continue;
            }
            open = match open {
                Some((start, last)) if i - last - 1 <= self.config.max_line_gap => Some((start, i)),
                Some(run) => {
                    self.push_run(&mut runs, run);
                    Some((i, i))
                }
                None => Some((i, i)),
            };
        }
        if let Some(run) = open {
            self.push_run(&mut runs, run);
        }
        runs
    }

    fn push_run(&self, runs: &mut Vec<(usize, usize)>, (start, last): (usize, usize)) {
        if last + 1 - start >= self.config.min_line_length {
            runs.push((start, last + 1));
        }
    }

    /// Rounds the cross coordinate to the snapping grid, staying inside
    /// `[0, bound)`. A grid point at or past `bound` falls back to the one below.
    fn snap(&self, line: Line, bound: f32) -> Line {
        let last = (bound - 1.0).max(0.0);
        let divisor = self.config.snap_divisor;
        let cross = if divisor > 0.0 {
            let rounded = (line.cross() / divisor).round() * divisor;
            if rounded < bound {
                rounded
            } else {
                (line.cross() / divisor).floor() * divisor
            }
        } else {
            line.cross()
        };
        let cross = cross.clamp(0.0, last);
        let (lo, hi) = line.span();
        Line::with_cross_and_span(line.orientation, cross, lo, hi)
    }

    /// Joins segments on the same cross coordinate whose spans touch once
    /// widened by the along-axis tolerance.
    fn merge_collinear(&self, mut lines: Vec<Line>) -> Vec<Line> {
        lines.sort_by(|a, b| {
            a.cross()
                .total_cmp(&b.cross())
                .then(a.span().0.total_cmp(&b.span().0))
        });

        let tolerance = self.config.merge_tolerance_along;
        let mut merged: Vec<Line> = Vec::with_capacity(lines.len());
        for line in lines {
            if let Some(last) = merged.last_mut()
                && last.cross() == line.cross()
                && line.span().0 <= last.span().1 + tolerance
            {
                let (lo, hi) = last.span();
                *last = Line::with_cross_and_span(
                    line.orientation,
                    line.cross(),
                    lo,
                    hi.max(line.span().1),
                );
                continue;
            }
            merged.push(line);
        }
        merged
    }

    /// Drops segments that run alongside a longer kept segment within the
    /// cross-axis tolerance.
    fn remove_redundant(&self, mut lines: Vec<Line>) -> Vec<Line> {
        lines.sort_by(|a, b| b.length().total_cmp(&a.length()));

        let tolerance = self.config.merge_tolerance_across;
        let mut kept: Vec<Line> = Vec::with_capacity(lines.len());
        for line in lines {
            let (lo, hi) = line.span();
            let redundant = kept.iter().any(|k| {
                let (klo, khi) = k.span();
                (k.cross() - line.cross()).abs() < tolerance && lo < khi && klo < hi
            });
            if !redundant {
                kept.push(line);
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_blank_map_yields_no_lines() {
        let decoder = AffinityLineDecoder::default();
        let map = Array2::<f32>::zeros((100, 100));
        assert!(decoder.decode_vertical(map.view(), (100, 100)).is_empty());
        assert!(decoder.decode_horizontal(map.view(), (100, 100)).is_empty());
    }

    #[test]
    fn test_single_vertical_line() {
        let decoder = AffinityLineDecoder::default();
        let mut map = Array2::<f32>::zeros((200, 100));
        for y in 20..180 {
            map[[y, 41]] = 0.9;
        }

        let lines = decoder.decode_vertical(map.view(), (100, 200));
        assert_eq!(lines.len(), 1);
        let line = lines[0];
        assert_eq!(line.orientation, LineOrientation::Vertical);
        // Snapped to the nearest multiple of 20.
        assert_eq!(line.start.x, 40.0);
        assert_eq!(line.end.x, 40.0);
        assert_eq!((line.start.y, line.end.y), (20.0, 180.0));

        assert!(decoder.decode_horizontal(map.view(), (100, 200)).is_empty());
    }

    #[test]
    fn test_short_gaps_are_bridged_long_gaps_split() {
        let decoder = AffinityLineDecoder::new(LineDecoderConfig {
            snap_divisor: 0.0,
            min_line_length: 10,
            merge_tolerance_along: 0.0,
            ..Default::default()
        });
        let mut map = Array2::<f32>::zeros((10, 100));
        for x in (0..30).chain(32..50).chain(80..95) {
            map[[5, x]] = 1.0;
        }

        let lines = decoder.decode_horizontal(map.view(), (100, 10));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].span(), (0.0, 50.0));
        assert_eq!(lines[1].span(), (80.0, 95.0));
        assert!(lines.iter().all(|l| l.start.y == 5.5 && l.end.y == 5.5));
    }

    #[test]
    fn test_thick_line_collapses_to_one() {
        let decoder = AffinityLineDecoder::default();
        let mut map = Array2::<f32>::zeros((120, 120));
        for y in 10..110 {
            for x in 58..64 {
                map[[y, x]] = 0.8;
            }
        }
        let lines = decoder.decode_vertical(map.view(), (120, 120));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].start.x, 60.0);
    }

    #[test]
    fn test_collinear_segments_merge_within_tolerance() {
        let decoder = AffinityLineDecoder::new(LineDecoderConfig {
            min_line_length: 10,
            max_line_gap: 0,
            ..Default::default()
        });
        let mut map = Array2::<f32>::zeros((10, 200));
        for x in (0..40).chain(50..90) {
            map[[4, x]] = 1.0;
        }
        let lines = decoder.decode_horizontal(map.view(), (200, 10));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].span(), (0.0, 90.0));
    }

    #[test]
    fn test_lines_rescale_to_original_and_stay_in_bounds() {
        let decoder = AffinityLineDecoder::default();
        let mut map = Array2::<f32>::zeros((100, 50));
        for y in 0..100 {
            map[[y, 49]] = 1.0;
        }
        let lines = decoder.decode_vertical(map.view(), (110, 300));
        assert_eq!(lines.len(), 1);
        let line = lines[0];
        // Column 49 centre maps to 108.9 and snaps down onto the grid.
        assert_eq!(line.start.x, 100.0);
        assert_eq!((line.start.y, line.end.y), (0.0, 300.0));
    }

    #[test]
    fn test_rules_on_last_row_and_column_stay_inside_image() {
        let decoder = AffinityLineDecoder::default();
        let mut map = Array2::<f32>::zeros((300, 100));
        for x in 0..100 {
            map[[299, x]] = 1.0;
        }
        for y in 0..300 {
            map[[y, 99]] = 1.0;
        }

        let horizontal = decoder.decode_horizontal(map.view(), (100, 300));
        assert_eq!(horizontal.len(), 1, "{horizontal:?}");
        assert!(horizontal[0].cross() < 300.0, "{horizontal:?}");
        assert_eq!(horizontal[0].cross(), 280.0);

        let vertical = decoder.decode_vertical(map.view(), (100, 300));
        assert_eq!(vertical.len(), 1, "{vertical:?}");
        assert!(vertical[0].cross() < 100.0, "{vertical:?}");
        assert_eq!(vertical[0].cross(), 80.0);
    }

    #[test]
    fn test_lane_position_is_pixel_centre() {
        let decoder = AffinityLineDecoder::new(LineDecoderConfig {
            snap_divisor: 0.0,
            ..Default::default()
        });
        let mut map = Array2::<f32>::zeros((100, 50));
        for y in 0..100 {
            map[[y, 10]] = 1.0;
        }
        // Page squeezed 4:1 into the map width.
        let lines = decoder.decode_vertical(map.view(), (200, 100));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].cross(), 42.0);
    }

    #[test]
    fn test_config_validation() {
        assert!(LineDecoderConfig::default().validate().is_ok());
        let bad = LineDecoderConfig {
            snap_divisor: -1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
