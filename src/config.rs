//! Configuration for a capture run.
//!
//! Every knob lives in [`CaptureConfig`], built via its builder. Keeping the
//! knobs in one struct makes it trivial to share a config between the
//! single-shot and batch drivers and to log exactly what a run used.

use crate::error::CaptureError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default viewport, matching the viewer's full-quality rendering size.
pub const DEFAULT_DIMENSIONS: (u32, u32) = (2880, 1800);

/// One settle interval in milliseconds.
///
/// The viewer exposes no reliable "ready" signal across its UI transitions,
/// so the interaction script substitutes fixed waits: 2×TIMEOUT after the
/// initial navigation, 1×TIMEOUT after each click step. Some runs will read
/// stale state; that trade-off is accepted over flaky synchronization.
pub const DEFAULT_SETTLE_MS: u64 = 4000;

/// Query template an address is percent-encoded into.
pub const DEFAULT_SEARCH_TEMPLATE: &str = "https://www.google.nl/maps/place/";

/// Configuration for capture sessions.
///
/// # Example
/// ```rust
/// use streetcap::CaptureConfig;
///
/// let config = CaptureConfig::builder()
///     .dimensions(1920, 1080)
///     .settle_ms(2000)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Requested pixel dimensions (width, height) of the captured frame.
    pub dimensions: (u32, u32),

    /// One settle interval in milliseconds. Default: 4000.
    pub settle_ms: u64,

    /// Base URL an address is appended to (percent-encoded) when no explicit
    /// target URL is given.
    pub search_template: String,

    /// Run the browser without a visible window. Default: true.
    pub headless: bool,

    /// Output directory for single-shot artifacts. Default: `screenshots/`.
    pub out_dir: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
            settle_ms: DEFAULT_SETTLE_MS,
            search_template: DEFAULT_SEARCH_TEMPLATE.to_string(),
            headless: true,
            out_dir: PathBuf::from("screenshots"),
        }
    }
}

impl CaptureConfig {
    /// Create a new builder for `CaptureConfig`.
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CaptureConfig`].
#[derive(Debug)]
pub struct CaptureConfigBuilder {
    config: CaptureConfig,
}

impl CaptureConfigBuilder {
    pub fn dimensions(mut self, width: u32, height: u32) -> Self {
        self.config.dimensions = (width, height);
        self
    }

    pub fn settle_ms(mut self, ms: u64) -> Self {
        self.config.settle_ms = ms;
        self
    }

    pub fn search_template(mut self, template: impl Into<String>) -> Self {
        self.config.search_template = template.into();
        self
    }

    pub fn headless(mut self, v: bool) -> Self {
        self.config.headless = v;
        self
    }

    pub fn out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.out_dir = dir.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CaptureConfig, CaptureError> {
        let c = &self.config;
        let (w, h) = c.dimensions;
        if w == 0 || h == 0 {
            return Err(CaptureError::InvalidConfig(format!(
                "Dimensions must be non-zero, got {w}x{h}"
            )));
        }
        if c.settle_ms == 0 {
            return Err(CaptureError::InvalidConfig(
                "Settle interval must be ≥ 1 ms".into(),
            ));
        }
        if !c.search_template.starts_with("http://") && !c.search_template.starts_with("https://") {
            return Err(CaptureError::InvalidConfig(format!(
                "Search template must be an absolute HTTP(S) URL, got '{}'",
                c.search_template
            )));
        }
        Ok(self.config)
    }
}
