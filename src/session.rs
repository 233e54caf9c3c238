//! One capture, end to end: target → image file + geometry metadata.
//!
//! [`CaptureSession`] composes the viewer script with the geometry
//! extractor and owns the resource guarantee: the browser driver acquired
//! for a capture is released exactly once on every exit path, success or
//! failure. A close failure is logged but never masks the primary outcome.

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::geometry;
use crate::output::CaptureResult;
use crate::viewer::{
    ChromeDriverFactory, DriverFactory, PageDriver, Settle, TokioSettle, ViewerController,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

/// What to capture. An address is resolved to a search URL; an explicit URL
/// is navigated to as-is. Mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureTarget {
    Address(String),
    Url(String),
}

impl CaptureTarget {
    /// The source address, when this target carries one.
    pub fn address(&self) -> Option<&str> {
        match self {
            CaptureTarget::Address(a) => Some(a),
            CaptureTarget::Url(_) => None,
        }
    }
}

/// Bytes escaped when an address goes into the search URL: everything
/// except alphanumerics and `- _ . ! ~ * ' ( )`, the JS
/// `encodeURIComponent` unreserved set. Plain path-segment encoding would
/// leave `,` literal and change the recorded URL byte-for-byte.
const ADDRESS_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Build the maps search URL for an address by component-encoding it onto
/// the place-query template.
pub fn search_url(template: &str, address: &str) -> Result<String, CaptureError> {
    let parsed = Url::parse(template)
        .map_err(|e| CaptureError::InvalidConfig(format!("bad search template: {e}")))?;
    if parsed.cannot_be_a_base() {
        return Err(CaptureError::InvalidConfig(
            "search template cannot be a base".into(),
        ));
    }
    let base = template.trim_end_matches('/');
    Ok(format!("{base}/{}", utf8_percent_encode(address, ADDRESS_ENCODE)))
}

/// Derive the stable work-item id for a capture.
///
/// Address captures slug the address (`"123 Main St"` → `"123+main+st"`);
/// URL-only captures join the six camera numbers from the final viewer URL.
pub fn derive_id(target: &CaptureTarget, final_url: &str) -> Option<String> {
    match target {
        CaptureTarget::Address(a) => Some(geometry::address_id(a)),
        CaptureTarget::Url(_) => geometry::camera_id(final_url),
    }
}

/// Orchestrates one address/URL → (image, geometry) outcome.
pub struct CaptureSession {
    factory: Arc<dyn DriverFactory>,
    settle: Arc<dyn Settle>,
    config: CaptureConfig,
}

impl CaptureSession {
    /// Session with injected collaborators (tests use fakes here).
    pub fn new(
        factory: Arc<dyn DriverFactory>,
        settle: Arc<dyn Settle>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            factory,
            settle,
            config,
        }
    }

    /// Session driving a real headless Chrome with real-time settling.
    pub fn with_chrome(config: CaptureConfig) -> Self {
        let factory = Arc::new(ChromeDriverFactory::new(config.headless));
        Self::new(factory, Arc::new(TokioSettle), config)
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Capture one target, writing the image to `out_path`.
    ///
    /// Fails with [`CaptureError::StreetViewNotFound`] when the interaction
    /// sequence completes but the final URL carries no camera segment.
    pub async fn capture(
        &self,
        target: &CaptureTarget,
        out_path: &Path,
    ) -> Result<CaptureResult, CaptureError> {
        let url = match target {
            CaptureTarget::Url(u) => u.clone(),
            CaptureTarget::Address(a) => search_url(&self.config.search_template, a)?,
        };

        match target.address() {
            Some(address) => info!("Taking Street View screenshot for address {address}..."),
            None => info!("Taking Street View screenshot of {url}..."),
        }

        let driver = self.factory.open().await?;
        let result = self.run(driver.as_ref(), target, &url, out_path).await;

        // Exactly one release attempt, on every path. Close failures are
        // reported but never replace the capture outcome.
        if let Err(e) = driver.close().await {
            warn!("Failed to release browser session: {e}");
        }

        result
    }

    async fn run(
        &self,
        driver: &dyn PageDriver,
        target: &CaptureTarget,
        nav_url: &str,
        out_path: &Path,
    ) -> Result<CaptureResult, CaptureError> {
        let controller =
            ViewerController::new(driver, self.settle.as_ref(), self.config.settle_ms);

        controller.open(nav_url, self.config.dimensions).await?;

        let final_url = controller.current_url().await?;
        let Some(geometry) = geometry::extract(&final_url) else {
            // The recorded URL is the one this capture navigated to, so a
            // failed address capture can be retried from its annotation.
            return Err(CaptureError::StreetViewNotFound {
                address: target.address().map(str::to_string),
                url: Some(nav_url.to_string()),
            });
        };

        // Year must be read before capture_frame removes the fineprint node.
        let year = controller
            .copyright_text()
            .await
            .as_deref()
            .and_then(geometry::extract_year);

        let bytes = controller.capture_frame().await?;

        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|source| {
                    CaptureError::OutputWrite {
                        path: out_path.to_path_buf(),
                        source,
                    }
                })?;
            }
        }
        tokio::fs::write(out_path, &bytes)
            .await
            .map_err(|source| CaptureError::OutputWrite {
                path: out_path.to_path_buf(),
                source,
            })?;

        Ok(CaptureResult {
            image_path: out_path.to_path_buf(),
            geometry,
            url: nav_url.to_string(),
            browser_url: final_url,
            dimensions: self.config.dimensions,
            year,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_component_encodes_address() {
        // Commas are escaped too, not just spaces: the full component set.
        let url = search_url("https://www.google.nl/maps/place/", "Spui 70, Den Haag").unwrap();
        assert_eq!(
            url,
            "https://www.google.nl/maps/place/Spui%2070%2C%20Den%20Haag"
        );
    }

    #[test]
    fn search_url_keeps_plain_addresses_readable() {
        let url = search_url("https://www.google.nl/maps/place/", "Plein1813").unwrap();
        assert_eq!(url, "https://www.google.nl/maps/place/Plein1813");
    }

    #[test]
    fn derive_id_prefers_address_slug() {
        let t = CaptureTarget::Address("123 Main St".into());
        assert_eq!(derive_id(&t, "irrelevant"), Some("123+main+st".into()));
    }

    #[test]
    fn derive_id_for_url_uses_camera_numbers() {
        let t = CaptureTarget::Url("https://maps/start".into());
        let final_url = "https://maps/@52.1,4.3,1.5a,75.0y,120.0h,95.0t";
        assert_eq!(
            derive_id(&t, final_url),
            Some("52.1-4.3-1.5-75.0-120.0-95.0".into())
        );
        assert_eq!(derive_id(&t, "https://maps/@1,2,3z"), None);
    }
}
