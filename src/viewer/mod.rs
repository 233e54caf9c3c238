//! Browser interaction stages for panorama capture.
//!
//! Each submodule owns exactly one concern, so the UI script is testable
//! without a browser and the browser plumbing is replaceable without
//! touching the script.
//!
//! ## Data Flow
//!
//! ```text
//! target URL ──▶ controller ──▶ driver ──▶ final URL + frame bytes
//!              (fixed UI script) (CDP/fake)
//! ```
//!
//! 1. [`driver`]     — the [`PageDriver`] and [`Settle`] seams: navigation,
//!    clicks, DOM removal, screenshots, and the wait primitive, all
//!    injectable so tests run the state machine without real time or Chrome
//! 2. [`chrome`]     — the chromiumoxide implementation; the only module
//!    that talks to a real browser process
//! 3. [`controller`] — the fixed interaction script (settle, click-and-wait
//!    affordances, overlay removal, capture) over any driver

pub mod chrome;
pub mod controller;
pub mod driver;

pub use chrome::ChromeDriverFactory;
pub use controller::ViewerController;
pub use driver::{ClickOutcome, DriverFactory, PageDriver, Settle, TokioSettle};
