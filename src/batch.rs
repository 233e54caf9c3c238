//! Batch pipeline: capture every unprocessed work item, isolating failures.
//!
//! Each item gets exactly one attempt per invocation. Any step failing —
//! missing address annotation, capture, upload, annotation write — is
//! converted to a failure annotation `{error, address?, url?}` at the item
//! boundary, and the batch moves on. No item can abort the run. Items are
//! processed sequentially: one browser session at a time, each awaited to
//! completion before the next begins.

use crate::error::CaptureError;
use crate::output::{FailureAnnotation, ScreenshotAnnotation};
use crate::session::{CaptureSession, CaptureTarget};
use crate::store::{AnnotationStore, AssetStore, WorkItem, ADDRESS_KIND, SCREENSHOT_KIND};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Counts for one batch invocation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Per-item failure with whatever context was known when it happened.
struct ItemFailure {
    error: CaptureError,
    address: Option<String>,
}

impl ItemFailure {
    fn bare(error: CaptureError) -> Self {
        Self {
            error,
            address: None,
        }
    }

    fn annotation(&self) -> FailureAnnotation {
        FailureAnnotation {
            error: self.error.to_string(),
            address: self
                .address
                .clone()
                .or_else(|| self.error.address().map(str::to_string)),
            url: self.error.url().map(str::to_string),
        }
    }
}

/// Runs captures over a store-selected set of work items.
pub struct BatchRunner {
    session: CaptureSession,
    annotations: Arc<dyn AnnotationStore>,
    assets: Arc<dyn AssetStore>,
}

impl BatchRunner {
    pub fn new(
        session: CaptureSession,
        annotations: Arc<dyn AnnotationStore>,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        Self {
            session,
            annotations,
            assets,
        }
    }

    /// Process up to `limit` unprocessed items for `city`.
    ///
    /// Only selection errors surface as `Err`; everything per-item is
    /// recorded as an annotation and counted in the returned stats.
    pub async fn run(&self, city: &str, limit: usize) -> Result<BatchStats, CaptureError> {
        let items = self.annotations.find_unprocessed(city, limit).await?;
        if items.is_empty() {
            info!("No unprocessed items found for city '{city}'");
            return Ok(BatchStats::default());
        }

        let mut stats = BatchStats {
            selected: items.len(),
            ..BatchStats::default()
        };

        for item in &items {
            match self.process_item(city, item).await {
                Ok(()) => {
                    stats.succeeded += 1;
                    info!("Item '{}' captured and annotated", item.id);
                }
                Err(failure) => {
                    stats.failed += 1;
                    warn!("Item '{}' failed: {}", item.id, failure.error);
                    self.record_failure(item, &failure).await;
                }
            }
        }

        info!(
            "Batch complete: {}/{} item(s) succeeded, {} failed",
            stats.succeeded, stats.selected, stats.failed
        );
        Ok(stats)
    }

    async fn process_item(&self, city: &str, item: &WorkItem) -> Result<(), ItemFailure> {
        let anns = self
            .annotations
            .get_annotations(&item.id, &[ADDRESS_KIND])
            .await
            .map_err(ItemFailure::bare)?;

        let address = anns
            .get(ADDRESS_KIND)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ItemFailure::bare(CaptureError::MissingDependency {
                    item: item.id.clone(),
                    kind: ADDRESS_KIND.to_string(),
                })
            })?;

        let with_address = |error: CaptureError| ItemFailure {
            error,
            address: Some(address.clone()),
        };

        // Stage the screenshot in a managed temp file; it is deleted when
        // this function returns, after the bytes have been uploaded.
        let staged = tempfile::Builder::new()
            .prefix("streetcap-")
            .suffix(".jpg")
            .tempfile()
            .map_err(|e| with_address(CaptureError::Internal(format!("tempfile: {e}"))))?;

        let target = CaptureTarget::Address(address.clone());
        let result = self
            .session
            .capture(&target, staged.path())
            .await
            .map_err(&with_address)?;

        let bytes = tokio::fs::read(staged.path())
            .await
            .map_err(|e| with_address(CaptureError::Internal(format!("read staged image: {e}"))))?;

        let asset = self
            .assets
            .upload_file(
                city,
                &item.id,
                SCREENSHOT_KIND,
                &bytes,
                &format!("{}.jpg", item.id),
                "image/jpeg",
            )
            .await
            .map_err(&with_address)?;

        let annotation = ScreenshotAnnotation {
            street_view: result.street_view(),
            year: result.year,
            screenshot_url: asset.url,
        };
        let data = serde_json::to_value(&annotation)
            .map_err(|e| with_address(CaptureError::Internal(e.to_string())))?;

        self.annotations
            .add_annotation(&item.id, SCREENSHOT_KIND, data)
            .await
            .map_err(with_address)
    }

    async fn record_failure(&self, item: &WorkItem, failure: &ItemFailure) {
        let data = match serde_json::to_value(failure.annotation()) {
            Ok(v) => v,
            Err(e) => {
                error!("Cannot serialise failure annotation for '{}': {e}", item.id);
                return;
            }
        };
        // A failed failure-write must not abort the batch either.
        if let Err(e) = self
            .annotations
            .add_annotation(&item.id, SCREENSHOT_KIND, data)
            .await
        {
            error!("Cannot record failure annotation for '{}': {e}", item.id);
        }
    }
}
