//! Types used in image processing operations.

use serde::{Deserialize, Serialize};

/// Specifies the order of channels in an image tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelOrder {
    /// Channel, Height, Width order (common in PyTorch)
    #[default]
    CHW,
    /// Height, Width, Channel order (common in TensorFlow)
    HWC,
}

/// Orientation of a detected line segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineOrientation {
    /// Constant x, spanning rows.
    Vertical,
    /// Constant y, spanning columns.
    Horizontal,
}
