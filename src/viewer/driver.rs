//! The seams between the interaction script and the outside world.
//!
//! [`PageDriver`] is the narrow browser interface the script runs against;
//! [`Settle`] is the wait primitive. Both are traits so tests can drive the
//! whole capture state machine with a scripted fake and zero real delays,
//! the same way the rest of the crate keeps its collaborators injectable.

use crate::error::CaptureError;
use async_trait::async_trait;
use std::time::Duration;

/// Per-element result of a best-effort click pass.
///
/// The viewer's markup is uncontrolled: a selector may match zero, one, or
/// many elements, and any individual click may fail (detached node, overlay
/// in the way). Each attempt is recorded instead of swallowed so callers
/// and tests can count partial failures.
#[derive(Debug, Clone)]
pub struct ClickOutcome {
    /// Position of the element within the selector's match list.
    pub index: usize,
    /// `None` when the click landed; otherwise the failure message.
    pub error: Option<String>,
}

impl ClickOutcome {
    pub fn clicked(&self) -> bool {
        self.error.is_none()
    }
}

/// Minimal browser-page surface needed by the interaction script.
///
/// One implementation drives a real Chrome tab over CDP
/// ([`crate::viewer::chrome`]); tests provide scripted fakes.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate the page to `url`.
    async fn navigate(&self, url: &str) -> Result<(), CaptureError>;

    /// Override the viewport to the given pixel dimensions.
    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CaptureError>;

    /// Click every element matching `selector`, one outcome per element.
    /// Zero matches is not an error: the result is simply empty.
    async fn click_all(&self, selector: &str) -> Result<Vec<ClickOutcome>, CaptureError>;

    /// Remove every element matching `selector` from the DOM.
    /// Absence of any match is not an error.
    async fn remove_elements(&self, selector: &str) -> Result<(), CaptureError>;

    /// The page's current URL.
    async fn current_url(&self) -> Result<String, CaptureError>;

    /// Text content of the first element matching `selector`, if any.
    async fn text_content(&self, selector: &str) -> Result<Option<String>, CaptureError>;

    /// Capture the rendered frame as JPEG bytes.
    async fn screenshot(&self) -> Result<Vec<u8>, CaptureError>;

    /// Release the underlying browser resources.
    ///
    /// Idempotent: a second call is a no-op. [`crate::session::CaptureSession`]
    /// invokes this exactly once on every exit path.
    async fn close(&self) -> Result<(), CaptureError>;
}

/// Creates one [`PageDriver`] per capture session.
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageDriver>, CaptureError>;
}

/// Fixed-duration wait, the script's only synchronization primitive.
///
/// The viewer has no reliable navigation-complete signal across its UI
/// transitions, so the script waits fixed intervals instead. Keeping the
/// wait behind a trait lets tests run the script instantly.
#[async_trait]
pub trait Settle: Send + Sync {
    async fn settle(&self, interval: Duration);
}

/// Real-time [`Settle`] backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSettle;

#[async_trait]
impl Settle for TokioSettle {
    async fn settle(&self, interval: Duration) {
        tokio::time::sleep(interval).await;
    }
}
