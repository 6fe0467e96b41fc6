//! Constants used throughout the detection pipeline.
//!
//! Default values for tiling, batching, normalisation and decoding.

/// The default threshold for parallel processing.
///
/// This constant defines the minimum number of items that need
/// to be processed before parallel processing is used.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// The default number of tiles processed per model invocation.
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// The default tile height expected by the segmentation model.
pub const DEFAULT_TILE_HEIGHT: u32 = 1024;

/// The default tile width expected by the segmentation model.
pub const DEFAULT_TILE_WIDTH: u32 = 1024;

/// Fill value used to bottom-pad the last tile of an image (white).
pub const DEFAULT_PAD_VALUE: u8 = 255;

/// ImageNet channel means in RGB order.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations in RGB order.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Number of channels the segmentation model must emit (region, affinity).
pub const SEGMENTATION_OUTPUT_CHANNELS: usize = 2;

/// The maximum allowed tensor size.
///
/// This constant defines the maximum number of elements
/// allowed in a single batch tensor to prevent memory issues.
pub const MAX_TENSOR_SIZE: usize = 200_000_000;
