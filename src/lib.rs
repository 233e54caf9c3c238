//! # streetcap
//!
//! Capture street-level panorama screenshots from a JavaScript map viewer.
//!
//! ## Why this crate?
//!
//! The panorama viewer has no capture API: the only way to get a clean frame
//! with known camera parameters is to drive the real page — navigate, dismiss
//! the interface chrome, switch into panorama mode, and wait for the
//! JS-rendered scene to settle. This crate scripts that interaction through
//! headless Chrome, reads the six camera numbers the viewer encodes into its
//! own URL, and writes the frame plus a metadata record.
//!
//! ## Pipeline Overview
//!
//! ```text
//! address or viewer URL
//!  │
//!  ├─ 1. Navigate  search-template URL or direct viewer URL
//!  ├─ 2. Interact  fixed click sequence into panorama mode, fixed settles
//!  ├─ 3. Extract   @lat,lon,alt a,fov y,heading h,tilt t  from the final URL
//!  ├─ 4. Frame     remove overlay chrome, JPEG screenshot
//!  └─ 5. Persist   <id>.jpg + <id>.json, or store annotation + asset upload
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use streetcap::{shoot, CaptureConfig, CaptureSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = CaptureSession::with_chrome(CaptureConfig::default());
//!     let out = shoot(&session, None, Some("https://www.google.nl/maps/@52.1,4.3,1.5a,75y,120h,95t".into())).await?;
//!     println!("{}", out.image_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `streetcap` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! streetcap = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod geometry;
pub mod output;
pub mod session;
pub mod shoot;
pub mod store;
pub mod viewer;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{BatchRunner, BatchStats};
pub use config::{CaptureConfig, CaptureConfigBuilder};
pub use error::CaptureError;
pub use geometry::Geometry;
pub use output::{CaptureResult, FailureAnnotation, MetadataRecord, ScreenshotAnnotation};
pub use session::{CaptureSession, CaptureTarget};
pub use shoot::{shoot, ShootOutput};
pub use store::{AnnotationStore, AssetStore, DirAssetStore, HttpAssetStore, JsonPoiStore};
