//! The fixed UI script that walks the viewer into panorama mode.
//!
//! The target is a live, UI-versioned map application with uncontrolled
//! markup, so every step is best-effort: missing elements are skipped,
//! failed clicks are logged per element and never abort the script, and a
//! settle interval follows each step whether or not anything was clicked.
//! This deliberately trades exact synchronization for robustness — the
//! viewer exposes no "ready" event that holds across all transitions, and a
//! fixed wait behaves the same on every run. Some runs will read stale
//! state; that is the accepted cost, not a bug.
//!
//! Script order:
//!
//! 1. navigate to the target URL
//! 2. viewport override to the requested dimensions
//! 3. settle 2×interval (client-side rendering)
//! 4. hero-image button, pane-toggle button, "view here" link — for each:
//!    click all matches, then settle 1×interval
//! 5. (at capture time) remove overlay chrome, screenshot

use crate::error::CaptureError;
use crate::viewer::driver::{ClickOutcome, PageDriver, Settle};
use std::time::Duration;
use tracing::{debug, warn};

/// Opens the panorama from the place page's hero photo.
pub const HERO_IMAGE_BUTTON: &str = "button.section-hero-header-image-hero-clickable";
/// Collapses the side pane so it does not cover the frame.
pub const PANE_TOGGLE_BUTTON: &str = "button.widget-pane-toggle-button";
/// The "view here" affordance inside the pushdown bar.
pub const VIEW_HERE_LINK: &str = "#pushdown a:last-child";

/// The three affordances, in the order the script clicks them.
pub const CLICK_SEQUENCE: [&str; 3] = [HERO_IMAGE_BUTTON, PANE_TOGGLE_BUTTON, VIEW_HERE_LINK];

/// Viewer chrome stripped before capture to produce a clean frame.
pub const OVERLAY_SELECTORS: [&str; 5] = [
    "#titlecard",
    "#minimap",
    "#image-header",
    "#fineprint",
    ".app-viewcard-strip",
];

/// Copyright / fineprint text node the capture year is read from.
pub const COPYRIGHT_TEXT: &str = "#fineprint";

/// Drives one page through the fixed interaction script.
pub struct ViewerController<'a> {
    driver: &'a dyn PageDriver,
    settle: &'a dyn Settle,
    interval: Duration,
}

impl<'a> ViewerController<'a> {
    pub fn new(driver: &'a dyn PageDriver, settle: &'a dyn Settle, settle_ms: u64) -> Self {
        Self {
            driver,
            settle,
            interval: Duration::from_millis(settle_ms),
        }
    }

    /// Run the script up to (but not including) capture.
    ///
    /// After this returns the page is in whatever state the viewer reached —
    /// panorama mode if everything worked, a plain map view if not. The
    /// caller decides by parsing [`Self::current_url`].
    pub async fn open(&self, url: &str, dimensions: (u32, u32)) -> Result<(), CaptureError> {
        debug!("Navigating to {url}");
        self.driver.navigate(url).await?;
        self.driver.set_viewport(dimensions.0, dimensions.1).await?;

        // Double interval after navigation: the viewer renders client-side
        // and keeps loading well past the document load event.
        self.settle.settle(self.interval * 2).await;

        for selector in CLICK_SEQUENCE {
            self.click_and_settle(selector).await;
        }

        Ok(())
    }

    /// Best-effort click on every element matching `selector`, then settle.
    ///
    /// The settle runs regardless of whether anything was clicked, so any
    /// navigation a click did trigger has time to land.
    async fn click_and_settle(&self, selector: &str) {
        match self.driver.click_all(selector).await {
            Ok(outcomes) => log_click_outcomes(selector, &outcomes),
            Err(e) => warn!("Click pass failed for '{selector}': {e}"),
        }
        self.settle.settle(self.interval).await;
    }

    /// The page's current URL after the script has run.
    pub async fn current_url(&self) -> Result<String, CaptureError> {
        self.driver.current_url().await
    }

    /// The viewer's copyright text, when the node exists and is non-empty.
    /// Read failures are absorbed: the year is optional metadata.
    pub async fn copyright_text(&self) -> Option<String> {
        match self.driver.text_content(COPYRIGHT_TEXT).await {
            Ok(Some(text)) if !text.trim().is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                debug!("Could not read copyright text: {e}");
                None
            }
        }
    }

    /// Strip overlay chrome and capture the frame.
    ///
    /// Overlay removal is best-effort per selector; a missing overlay or a
    /// failed removal never blocks the screenshot. Must run after
    /// [`Self::copyright_text`] — removal destroys the fineprint node.
    pub async fn capture_frame(&self) -> Result<Vec<u8>, CaptureError> {
        for selector in OVERLAY_SELECTORS {
            if let Err(e) = self.driver.remove_elements(selector).await {
                warn!("Could not remove overlay '{selector}': {e}");
            }
        }
        self.driver.screenshot().await
    }
}

fn log_click_outcomes(selector: &str, outcomes: &[ClickOutcome]) {
    let failed = outcomes.iter().filter(|o| !o.clicked()).count();
    if outcomes.is_empty() {
        debug!("No elements matched '{selector}'");
    } else if failed == 0 {
        debug!("Clicked {} element(s) for '{selector}'", outcomes.len());
    } else {
        warn!(
            "Clicked {}/{} element(s) for '{selector}' ({failed} failed)",
            outcomes.len() - failed,
            outcomes.len()
        );
        for o in outcomes.iter().filter(|o| !o.clicked()) {
            debug!(
                "  element #{}: {}",
                o.index,
                o.error.as_deref().unwrap_or("unknown")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every driver call and settle in one ordered log.
    #[derive(Default)]
    struct ScriptLog {
        log: Mutex<Vec<String>>,
    }

    impl ScriptLog {
        fn push(&self, entry: impl Into<String>) {
            self.log.lock().unwrap().push(entry.into());
        }
        fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    struct FakeDriver<'a> {
        log: &'a ScriptLog,
        /// Click error injected for every element of this selector.
        failing_selector: Option<&'static str>,
    }

    #[async_trait]
    impl PageDriver for FakeDriver<'_> {
        async fn navigate(&self, url: &str) -> Result<(), CaptureError> {
            self.log.push(format!("navigate {url}"));
            Ok(())
        }
        async fn set_viewport(&self, w: u32, h: u32) -> Result<(), CaptureError> {
            self.log.push(format!("viewport {w}x{h}"));
            Ok(())
        }
        async fn click_all(&self, selector: &str) -> Result<Vec<ClickOutcome>, CaptureError> {
            self.log.push(format!("click {selector}"));
            let error = if self.failing_selector == Some(selector) {
                Some("node detached".to_string())
            } else {
                None
            };
            Ok(vec![
                ClickOutcome { index: 0, error: error.clone() },
                ClickOutcome { index: 1, error },
            ])
        }
        async fn remove_elements(&self, selector: &str) -> Result<(), CaptureError> {
            self.log.push(format!("remove {selector}"));
            Ok(())
        }
        async fn current_url(&self) -> Result<String, CaptureError> {
            Ok("https://m/@1,2,3a,4y,5h,6t".into())
        }
        async fn text_content(&self, _selector: &str) -> Result<Option<String>, CaptureError> {
            Ok(Some("©2019 Example".into()))
        }
        async fn screenshot(&self) -> Result<Vec<u8>, CaptureError> {
            self.log.push("screenshot".to_string());
            Ok(vec![0xff, 0xd8])
        }
        async fn close(&self) -> Result<(), CaptureError> {
            Ok(())
        }
    }

    struct LoggingSettle<'a>(&'a ScriptLog);

    #[async_trait]
    impl Settle for LoggingSettle<'_> {
        async fn settle(&self, interval: Duration) {
            self.0.push(format!("settle {}ms", interval.as_millis()));
        }
    }

    #[tokio::test]
    async fn script_runs_in_fixed_order() {
        let log = ScriptLog::default();
        let driver = FakeDriver { log: &log, failing_selector: None };
        let settle = LoggingSettle(&log);
        let controller = ViewerController::new(&driver, &settle, 4000);

        controller.open("https://maps.example/place/x", (2880, 1800)).await.unwrap();
        controller.capture_frame().await.unwrap();

        let entries = log.entries();
        assert_eq!(
            entries,
            vec![
                "navigate https://maps.example/place/x".to_string(),
                "viewport 2880x1800".to_string(),
                "settle 8000ms".to_string(),
                format!("click {HERO_IMAGE_BUTTON}"),
                "settle 4000ms".to_string(),
                format!("click {PANE_TOGGLE_BUTTON}"),
                "settle 4000ms".to_string(),
                format!("click {VIEW_HERE_LINK}"),
                "settle 4000ms".to_string(),
                "remove #titlecard".to_string(),
                "remove #minimap".to_string(),
                "remove #image-header".to_string(),
                "remove #fineprint".to_string(),
                "remove .app-viewcard-strip".to_string(),
                "screenshot".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn click_failures_do_not_abort_the_script() {
        let log = ScriptLog::default();
        let driver = FakeDriver {
            log: &log,
            failing_selector: Some(HERO_IMAGE_BUTTON),
        };
        let settle = LoggingSettle(&log);
        let controller = ViewerController::new(&driver, &settle, 100);

        controller.open("https://maps.example/place/x", (800, 600)).await.unwrap();

        // All three affordances were still attempted.
        let clicks = log
            .entries()
            .iter()
            .filter(|e| e.starts_with("click "))
            .count();
        assert_eq!(clicks, 3);
    }

    #[test]
    fn click_outcome_counts_partial_failures() {
        let outcomes = [
            ClickOutcome { index: 0, error: None },
            ClickOutcome { index: 1, error: Some("covered".into()) },
            ClickOutcome { index: 2, error: None },
        ];
        assert_eq!(outcomes.iter().filter(|o| o.clicked()).count(), 2);
    }
}
