//! chromiumoxide implementation of the [`PageDriver`] seam.
//!
//! This is the only module that talks to a real browser. One Chrome process
//! is launched per capture session and torn down with it; the CDP event
//! handler runs on its own task because the connection makes no progress
//! unless the handler stream is polled.
//!
//! chromiumoxide's `Page` has no Drop implementation and needs an explicit
//! async `close()` to release its CDP target, so the driver keeps the
//! browser, page, and handler task behind an `Option` that [`PageDriver::close`]
//! takes exactly once. A Drop fallback spawns the same teardown for error
//! paths that never reach `close`.

use crate::error::CaptureError;
use crate::viewer::driver::{ClickOutcome, DriverFactory, PageDriver};
use async_trait::async_trait;
use base64::Engine as _;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

fn browser_err(e: impl std::fmt::Display) -> CaptureError {
    CaptureError::Browser {
        detail: e.to_string(),
    }
}

/// Launches one Chrome process + page per capture session.
pub struct ChromeDriverFactory {
    headless: bool,
}

impl ChromeDriverFactory {
    pub fn new(headless: bool) -> Self {
        Self { headless }
    }
}

#[async_trait]
impl DriverFactory for ChromeDriverFactory {
    async fn open(&self) -> Result<Box<dyn PageDriver>, CaptureError> {
        let mut builder = BrowserConfig::builder().no_sandbox();
        if !self.headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|detail| CaptureError::Browser { detail })?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_err)?;

        // The CDP connection only makes progress while this stream is polled.
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(browser_err(e));
            }
        };

        Ok(Box::new(ChromePage {
            page: page.clone(),
            state: Mutex::new(Some(BrowserState {
                browser,
                page,
                handler_task,
            })),
            runtime: tokio::runtime::Handle::current(),
        }))
    }
}

struct BrowserState {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

impl BrowserState {
    async fn teardown(mut self) -> Result<(), CaptureError> {
        let page_res = self.page.close().await;
        let browser_res = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
        page_res.map_err(browser_err)?;
        browser_res.map_err(browser_err)?;
        Ok(())
    }
}

/// A live Chrome tab implementing [`PageDriver`].
pub struct ChromePage {
    page: Page,
    state: Mutex<Option<BrowserState>>,
    // Captured at construction so the Drop fallback can always spawn cleanup.
    runtime: tokio::runtime::Handle,
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn navigate(&self, url: &str) -> Result<(), CaptureError> {
        self.page.goto(url).await.map_err(browser_err)?;
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CaptureError> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(width as i64)
            .height(height as i64)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(|detail| CaptureError::Browser { detail })?;
        self.page.execute(params).await.map_err(browser_err)?;
        Ok(())
    }

    async fn click_all(&self, selector: &str) -> Result<Vec<ClickOutcome>, CaptureError> {
        // A failed query behaves like zero matches: the viewer's markup is
        // uncontrolled and a vanished container is equivalent to no element.
        let elements = match self.page.find_elements(selector).await {
            Ok(elements) => elements,
            Err(e) => {
                debug!("Element query failed for '{selector}': {e}");
                return Ok(Vec::new());
            }
        };

        let mut outcomes = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let error = element.click().await.err().map(|e| e.to_string());
            outcomes.push(ClickOutcome { index, error });
        }
        Ok(outcomes)
    }

    async fn remove_elements(&self, selector: &str) -> Result<(), CaptureError> {
        let script = format!(
            "document.querySelectorAll({}).forEach((el) => el.remove())",
            js_string(selector)?
        );
        self.page.evaluate(script).await.map_err(browser_err)?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, CaptureError> {
        match self.page.url().await.map_err(browser_err)? {
            Some(url) => Ok(url),
            None => Err(CaptureError::Browser {
                detail: "page reported no URL".to_string(),
            }),
        }
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>, CaptureError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.textContent : null; }})()",
            js_string(selector)?
        );
        let result = self.page.evaluate(script).await.map_err(browser_err)?;
        Ok(result
            .value()
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, CaptureError> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Jpeg)
            .build();
        let resp = self.page.execute(params).await.map_err(browser_err)?;
        let data_b64: &str = resp.data.as_ref();
        base64::engine::general_purpose::STANDARD
            .decode(data_b64.as_bytes())
            .map_err(|e| CaptureError::Browser {
                detail: format!("screenshot base64 decode failed: {e}"),
            })
    }

    async fn close(&self) -> Result<(), CaptureError> {
        let state = self.state.lock().await.take();
        match state {
            Some(state) => state.teardown().await,
            None => Ok(()),
        }
    }
}

impl Drop for ChromePage {
    fn drop(&mut self) {
        // Fallback for paths that never reached close(). Fire-and-forget:
        // nothing can be awaited from a synchronous Drop.
        if let Ok(mut guard) = self.state.try_lock() {
            if let Some(state) = guard.take() {
                self.runtime.spawn(async move {
                    if let Err(e) = state.teardown().await {
                        warn!("Browser cleanup on drop failed: {e}");
                    }
                });
            }
        }
    }
}

/// Quote a selector for embedding in a JS snippet.
fn js_string(s: &str) -> Result<String, CaptureError> {
    serde_json::to_string(s).map_err(|e| CaptureError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_quotes_and_escapes() {
        assert_eq!(js_string("#minimap").unwrap(), "\"#minimap\"");
        assert_eq!(js_string("a\"b").unwrap(), "\"a\\\"b\"");
    }
}
