//! # OAR SegDet
//!
//! A Rust library that finds text regions and table-like separator lines in
//! tall document images using a segmentation network exported to ONNX.
//!
//! ## Features
//!
//! - Tiling of arbitrarily tall pages into fixed-height model inputs
//! - Batched inference through ONNX Runtime with a session pool
//! - Seamless stitching of per-tile score maps back to page height
//! - Connected-component text boxes from the region heatmap
//! - Vertical and horizontal separator lines from the affinity map
//! - JSON configuration and optional visualization overlays
//!
//! ## Modules
//!
//! * [`core`] - Errors, configuration, batching, the model trait and the ONNX backend
//! * [`pipeline`] - Tiling, preprocessing, batched inference, stitching and `detect`
//! * [`processors`] - Normalization, map resampling, geometry and the two decoders
//! * [`utils`] - Image loading, logging setup and visualization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oar_segdet::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = TextRegionDetector::builder()
//!     .batch_size(8)
//!     .tiling(TilingConfig::new(1024, 512))
//!     .build("models/segmentation.onnx")?;
//!
//! let image = load_image(Path::new("page.png"))?;
//! let results = detector.predict(&[image])?;
//! for result in &results {
//!     println!("{result}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Bring your own model
//!
//! Anything implementing [`SegmentationModel`](core::SegmentationModel) can
//! drive the pipeline through the free [`detect`](pipeline::detect) function:
//!
//! ```rust,no_run
//! use oar_segdet::prelude::*;
//!
//! # fn run(model: &dyn SegmentationModel, images: Vec<image::DynamicImage>) -> OcrResult<()> {
//! let config = DetectionConfig::from_json_str(r#"{ "batch_size": 4 }"#)?;
//! let results = detect(&images, model, &config)?;
//! assert_eq!(results.len(), images.len());
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod core;

pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use oar_segdet::prelude::*;
/// ```
///
/// Included items focus on the most common tasks:
/// - The pipeline entry points (`detect`, `TextRegionDetector`)
/// - Configuration (`DetectionConfig`, `TilingConfig` and the decoder configs)
/// - Results and geometry (`DetectionResult`, `TextBox`, `Line`)
/// - Essential error and result types (`OCRError`, `OcrResult`)
/// - Basic image loading and logging (`load_image`, `init_tracing`)
pub mod prelude {
    // Pipeline (essential)
    pub use crate::pipeline::{
        DetectionConfig, DetectionResult, TextRegionDetector, TextRegionDetectorBuilder,
        TilingConfig, detect,
    };

    // Decoders and geometry
    pub use crate::processors::{
        BoxDecoderConfig, Line, LineDecoderConfig, LineOrientation, Point, TextBox,
    };

    // Model seam
    pub use crate::core::{OrtInfer, ParallelPolicy, SegmentationModel};

    // Error Handling (essential)
    pub use crate::core::{OCRError, OcrResult};

    // Utilities (minimal)
    pub use crate::utils::{init_tracing, load_image, load_images_batch};
}
