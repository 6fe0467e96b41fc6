//! The tiled detection pipeline.
//!
//! This module provides the stages that turn a batch of document images into
//! text boxes and separator lines, and the [`detect`] entry point that runs
//! them in order.
//!
//! # Stages
//!
//! * `tiling` - Cuts images into model-height bands
//! * `preprocess` - Pads, resizes and normalizes bands into tensors
//! * `batch_runner` - Invokes the model batch by batch
//! * `stitching` - Reassembles per-band maps into per-image maps
//! * `detector` - Decodes the maps and assembles the results

pub mod batch_runner;
mod config;
pub mod detector;
pub mod preprocess;
pub mod result;
pub mod stitching;
pub mod tiling;

pub use batch_runner::{BatchRunner, HeatmapPair};
pub use config::{DetectionConfig, TilingConfig};
pub use detector::{TextRegionDetector, TextRegionDetectorBuilder, detect};
pub use preprocess::{PreparedTile, TilePreprocessor};
pub use result::{DetectionResult, render_heatmap};
pub use stitching::{StitchedMaps, stitch_maps};
pub use tiling::{Tile, TileTag, split_image, split_images};
