//! Image and score-map processing for the detection pipeline.
//!
//! This module provides the numeric building blocks the pipeline stages are
//! assembled from: input normalization, map resampling, geometric types and
//! the two decoders that turn score maps into geometry.
//!
//! # Modules
//!
//! * `affinity_lines` - Vertical and horizontal line extraction from affinity maps
//! * `geometry` - Points, boxes, lines and the rescale-and-clip policy
//! * `heatmap_boxes` - Text box extraction from region heatmaps
//! * `interpolate` - Bilinear resampling of score maps
//! * `normalization` - Image normalization for network input
//! * `types` - Type definitions used across the processors module

pub mod affinity_lines;
mod geometry;
pub mod heatmap_boxes;
pub mod interpolate;
mod normalization;
pub mod types;

pub use affinity_lines::{AffinityLineDecoder, LineDecoderConfig};
pub use geometry::*;
pub use heatmap_boxes::{BoxDecoderConfig, HeatmapBoxDecoder, remove_contained};
pub use interpolate::resize_bilinear;
pub use normalization::*;
pub use types::*;
