//! Configuration for the detection pipeline and its loading from files.

use crate::core::config::{ConfigError, ConfigValidator, ParallelPolicy};
use crate::core::{
    DEFAULT_BATCH_SIZE, DEFAULT_PAD_VALUE, DEFAULT_TILE_HEIGHT, DEFAULT_TILE_WIDTH,
    MAX_TENSOR_SIZE, OCRError,
};
use crate::processors::{BoxDecoderConfig, LineDecoderConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound on tiles per model call accepted by validation.
const MAX_BATCH_SIZE: usize = 256;

/// How images are cut into model-sized tiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilingConfig {
    /// Rows per tile, equal to the model's input height (default: 1024).
    #[serde(default = "TilingConfig::default_tile_height")]
    pub tile_height: u32,
    /// Model input width every tile is resized to (default: 1024).
    #[serde(default = "TilingConfig::default_tile_width")]
    pub tile_width: u32,
    /// Grey level used to bottom-pad the last tile (default: 255).
    #[serde(default = "TilingConfig::default_pad_value")]
    pub pad_value: u8,
    /// Images at most this tall are stretched into one tile instead of being
    /// split and padded (default: none).
    #[serde(default)]
    pub single_tile_max_height: Option<u32>,
}

impl TilingConfig {
    /// Creates a tiling configuration for a `tile_width x tile_height` model input.
    pub fn new(tile_width: u32, tile_height: u32) -> Self {
        Self {
            tile_width,
            tile_height,
            ..Self::default()
        }
    }

    /// Sets the padding grey level.
    pub fn with_pad_value(mut self, pad_value: u8) -> Self {
        self.pad_value = pad_value;
        self
    }

    /// Sets the stretch-into-one-tile height limit.
    pub fn with_single_tile_max_height(mut self, max_height: Option<u32>) -> Self {
        self.single_tile_max_height = max_height;
        self
    }

    fn default_tile_height() -> u32 {
        DEFAULT_TILE_HEIGHT
    }

    fn default_tile_width() -> u32 {
        DEFAULT_TILE_WIDTH
    }

    fn default_pad_value() -> u8 {
        DEFAULT_PAD_VALUE
    }
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            tile_height: Self::default_tile_height(),
            tile_width: Self::default_tile_width(),
            pad_value: Self::default_pad_value(),
            single_tile_max_height: None,
        }
    }
}

impl ConfigValidator for TilingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_image_dimensions(self.tile_width, self.tile_height)?;
        if let Some(limit) = self.single_tile_max_height {
            self.validate_positive_usize(limit as usize, "single_tile_max_height")?;
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Full configuration of a [`detect`](crate::pipeline::detect) call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Tiles per model invocation (default: 8).
    #[serde(default = "DetectionConfig::default_batch_size")]
    pub batch_size: usize,
    /// Tile geometry.
    #[serde(default)]
    pub tiling: TilingConfig,
    /// Region heatmap decoding.
    #[serde(default)]
    pub boxes: BoxDecoderConfig,
    /// Affinity map decoding.
    #[serde(default)]
    pub lines: LineDecoderConfig,
    /// CPU parallelism for the per-tile and per-image stages.
    #[serde(default)]
    pub parallel: ParallelPolicy,
}

impl DetectionConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the tiling configuration.
    pub fn with_tiling(mut self, tiling: TilingConfig) -> Self {
        self.tiling = tiling;
        self
    }

    /// Sets the box decoder configuration.
    pub fn with_boxes(mut self, boxes: BoxDecoderConfig) -> Self {
        self.boxes = boxes;
        self
    }

    /// Sets the line decoder configuration.
    pub fn with_lines(mut self, lines: LineDecoderConfig) -> Self {
        self.lines = lines;
        self
    }

    /// Sets the parallel policy.
    pub fn with_parallel(mut self, parallel: ParallelPolicy) -> Self {
        self.parallel = parallel;
        self
    }

    /// Loads a JSON configuration file. Missing fields take their defaults.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use oar_segdet::pipeline::DetectionConfig;
    ///
    /// let config = DetectionConfig::from_json_file("detection.json")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, OCRError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| OCRError::ConfigError {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_json_str(&content)
    }

    /// Parses and validates a JSON configuration string.
    pub fn from_json_str(content: &str) -> Result<Self, OCRError> {
        let config: Self = serde_json::from_str(content).map_err(|e| OCRError::ConfigError {
            message: format!("Failed to parse JSON config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn default_batch_size() -> usize {
        DEFAULT_BATCH_SIZE
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            batch_size: Self::default_batch_size(),
            tiling: TilingConfig::default(),
            boxes: BoxDecoderConfig::default(),
            lines: LineDecoderConfig::default(),
            parallel: ParallelPolicy::default(),
        }
    }
}

impl ConfigValidator for DetectionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_batch_size_with_limits(self.batch_size, MAX_BATCH_SIZE)?;
        self.tiling.validate()?;
        let elements = self
            .batch_size
            .saturating_mul(3)
            .saturating_mul(self.tiling.tile_width as usize)
            .saturating_mul(self.tiling.tile_height as usize);
        if elements > MAX_TENSOR_SIZE {
            return Err(ConfigError::ResourceLimitExceeded {
                message: format!(
                    "a batch of {} {}x{} tiles holds {} elements, more than the maximum {}",
                    self.batch_size,
                    self.tiling.tile_width,
                    self.tiling.tile_height,
                    elements,
                    MAX_TENSOR_SIZE
                ),
            });
        }
        self.boxes.validate()?;
        self.lines.validate()?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.tiling.tile_height, 1024);
        assert_eq!(config.tiling.tile_width, 1024);
        assert_eq!(config.tiling.pad_value, 255);
        assert!(config.tiling.single_tile_max_height.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            DetectionConfig::from_json_str(r#"{"batch_size": 2, "tiling": {"tile_height": 512}}"#)
                .unwrap();
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.tiling.tile_height, 512);
        assert_eq!(config.tiling.tile_width, 1024);
        assert_eq!(config.boxes.min_component_area, 10);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(DetectionConfig::new().with_batch_size(0).validate().is_err());
        assert!(
            DetectionConfig::new()
                .with_tiling(TilingConfig::new(0, 512))
                .validate()
                .is_err()
        );
        assert!(DetectionConfig::from_json_str(r#"{"batch_size": 0}"#).is_err());
        assert!(DetectionConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_batch_tensor_size_is_bounded() {
        // 63 * 3 * 1024 * 1024 fits, 64 does not.
        assert!(DetectionConfig::new().with_batch_size(63).validate().is_ok());
        let err = DetectionConfig::new().with_batch_size(64).validate().unwrap_err();
        assert!(matches!(err, ConfigError::ResourceLimitExceeded { .. }), "{err}");

        let small_tiles = DetectionConfig::new()
            .with_batch_size(64)
            .with_tiling(TilingConfig::new(512, 512));
        assert!(small_tiles.validate().is_ok());
    }
}
