use std::time::Duration;

use ksplat_decoder::{DEFAULT_MAX_STORE_BYTES, DEFAULT_STREAMING_GRANULARITY};
use ksplat_wire::CompressionLevel;

/// Delay between two throttled ticks.
pub const DEFAULT_TICK_DELAY: Duration = Duration::from_millis(15);

/// Loader settings.
///
/// ```text
/// ┌───────────────────┬──────────────────────────────────────────────┐
/// │ Field             │ Purpose                                      │
/// ├───────────────────┼──────────────────────────────────────────────┤
/// │ stream            │ Progressive load (true) or one-shot (false)  │
/// │ granularity_bytes │ New bytes needed before a tick does work     │
/// │ tick_delay        │ Timer delay between ticks                    │
/// │ max_store_bytes   │ Largest file the progressive path allocates  │
/// │ optimize          │ Options for the optimization pass, if any    │
/// └───────────────────┴──────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct LoaderConfig {
    pub stream: bool,
    pub granularity_bytes: usize,
    pub tick_delay: Duration,
    pub max_store_bytes: usize,
    pub optimize: Option<OptimizeOptions>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            stream: true,
            granularity_bytes: DEFAULT_STREAMING_GRANULARITY,
            tick_delay: DEFAULT_TICK_DELAY,
            max_store_bytes: DEFAULT_MAX_STORE_BYTES,
            optimize: None,
        }
    }
}

impl LoaderConfig {
    #[must_use]
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// A granularity of 0 is treated as 1.
    #[must_use]
    pub fn granularity_bytes(mut self, bytes: usize) -> Self {
        self.granularity_bytes = bytes.max(1);
        self
    }

    #[must_use]
    pub fn tick_delay(mut self, delay: Duration) -> Self {
        self.tick_delay = delay;
        self
    }

    #[must_use]
    pub fn max_store_bytes(mut self, bytes: usize) -> Self {
        self.max_store_bytes = bytes;
        self
    }

    #[must_use]
    pub fn optimize(mut self, options: OptimizeOptions) -> Self {
        self.optimize = Some(options);
        self
    }

    /// Minimum alpha used when building a buffer from raw splats.
    #[must_use]
    pub fn minimum_alpha(&self) -> u8 {
        self.optimize
            .as_ref()
            .map_or(OptimizeOptions::default().minimum_alpha, |o| o.minimum_alpha)
    }
}

/// Parameters handed to a [`SplatOptimizer`](crate::SplatOptimizer).
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizeOptions {
    /// Splats with a lower alpha are dropped.
    pub minimum_alpha: u8,
    pub compression_level: CompressionLevel,
    /// Maximum splats per section; 0 puts everything in one section.
    pub section_size: usize,
    /// `None` lets the optimizer pick the centroid.
    pub scene_center: Option<[f32; 3]>,
    pub block_size: f32,
    pub bucket_size: u32,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            minimum_alpha: 1,
            compression_level: CompressionLevel::Uncompressed,
            section_size: 0,
            scene_center: None,
            block_size: 5.0,
            bucket_size: 256,
        }
    }
}
