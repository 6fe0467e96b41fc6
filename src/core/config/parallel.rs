//! Shared parallel processing configuration types.

use serde::{Deserialize, Serialize};

/// Centralized configuration for CPU-side parallelism in the pipeline.
///
/// Splitting, normalising and decoding are independent per tile or per image
/// and are fanned out with rayon once the item count exceeds the matching
/// threshold. Model invocations are never parallelised by this policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Maximum number of threads to use for parallel processing.
    /// If None, rayon will use the default thread pool size (typically number of CPU cores).
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Threshold for number of images to process sequentially (<= this uses sequential)
    /// Default: 1
    #[serde(default = "ParallelPolicy::default_image_threshold")]
    pub image_threshold: usize,

    /// Threshold for number of tiles to normalise sequentially (<= this uses sequential)
    /// Default: 2
    #[serde(default = "ParallelPolicy::default_tile_threshold")]
    pub tile_threshold: usize,

    /// Threshold for general utility operations like image loading (<= this uses sequential)
    /// Default: 4 (matches DEFAULT_PARALLEL_THRESHOLD constant)
    #[serde(default = "ParallelPolicy::default_utility_threshold")]
    pub utility_threshold: usize,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the image processing threshold.
    pub fn with_image_threshold(mut self, threshold: usize) -> Self {
        self.image_threshold = threshold;
        self
    }

    /// Set the tile processing threshold.
    pub fn with_tile_threshold(mut self, threshold: usize) -> Self {
        self.tile_threshold = threshold;
        self
    }

    /// Set the utility operations threshold.
    pub fn with_utility_threshold(mut self, threshold: usize) -> Self {
        self.utility_threshold = threshold;
        self
    }

    /// Returns `true` when `count` images should be processed in parallel.
    pub fn parallel_images(&self, count: usize) -> bool {
        count > self.image_threshold
    }

    /// Returns `true` when `count` tiles should be processed in parallel.
    pub fn parallel_tiles(&self, count: usize) -> bool {
        count > self.tile_threshold
    }

    /// Installs a global rayon pool sized by `max_threads`.
    ///
    /// Only the first call in a process has an effect; later calls return an
    /// error from rayon which is logged and ignored.
    pub fn install_global_pool(&self) {
        if let Some(threads) = self.max_threads
            && let Err(err) = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()
        {
            tracing::debug!("rayon global pool already initialised: {err}");
        }
    }

    fn default_image_threshold() -> usize {
        1
    }

    fn default_tile_threshold() -> usize {
        2
    }

    fn default_utility_threshold() -> usize {
        crate::core::constants::DEFAULT_PARALLEL_THRESHOLD
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            image_threshold: Self::default_image_threshold(),
            tile_threshold: Self::default_tile_threshold(),
            utility_threshold: Self::default_utility_threshold(),
        }
    }
}
