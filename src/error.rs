//! Error types for the streetcap library.
//!
//! One enum covers every failure the library can surface. The important
//! split is where an error stops:
//!
//! * In single-shot mode a [`CaptureError`] terminates the run with a logged
//!   message and no partial artifacts.
//! * In batch mode every per-item error is caught at the item boundary by
//!   [`crate::batch::BatchRunner`], converted to a failure annotation
//!   (`{error, address?, url?}`) and the batch moves to the next item.
//!
//! Transient UI failures (a single element that would not click, an overlay
//! that is already gone) are *not* errors at all — they are recorded as
//! [`crate::viewer::ClickOutcome`] entries and logged, never escalated.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the streetcap library.
#[derive(Debug, Error)]
pub enum CaptureError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No address or URL could be resolved from the given input.
    #[error("No capture target: {reason}")]
    Input { reason: String },

    /// A batch item lacks a prerequisite annotation (e.g. `address`).
    #[error("Item '{item}' is missing the '{kind}' annotation")]
    MissingDependency { item: String, kind: String },

    // ── Domain error ──────────────────────────────────────────────────────
    /// The interaction sequence completed but the final viewer URL carries
    /// no camera-state segment — the viewer never reached panorama mode.
    ///
    /// Address and URL are present only when known at failure time; both go
    /// into the failure annotation for diagnostics.
    #[error("No Street View panorama found{}", not_found_context(.address, .url))]
    StreetViewNotFound {
        address: Option<String>,
        url: Option<String>,
    },

    // ── Collaborator errors ───────────────────────────────────────────────
    /// Browser or page could not be created, driven, or closed.
    #[error("Browser error: {detail}")]
    Browser { detail: String },

    /// The backing annotation store failed a read or write.
    #[error("Store error: {detail}")]
    Store { detail: String },

    /// Uploading the captured asset failed.
    #[error("Upload failed: {detail}")]
    Upload { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write an output artifact (image or metadata JSON).
    #[error("Failed to write output file '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn not_found_context(address: &Option<String>, url: &Option<String>) -> String {
    match (address, url) {
        (Some(a), _) => format!(" for address '{a}'"),
        (None, Some(u)) => format!(" at {u}"),
        (None, None) => String::new(),
    }
}

impl CaptureError {
    /// The address this error refers to, if it carries one.
    pub fn address(&self) -> Option<&str> {
        match self {
            CaptureError::StreetViewNotFound { address, .. } => address.as_deref(),
            _ => None,
        }
    }

    /// The URL this error refers to, if it carries one.
    pub fn url(&self) -> Option<&str> {
        match self {
            CaptureError::StreetViewNotFound { url, .. } => url.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_with_address() {
        let e = CaptureError::StreetViewNotFound {
            address: Some("123 Main St".into()),
            url: Some("https://maps.example/@1,2,3z".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("123 Main St"), "got: {msg}");
    }

    #[test]
    fn not_found_display_url_only() {
        let e = CaptureError::StreetViewNotFound {
            address: None,
            url: Some("https://maps.example/@1,2,3z".into()),
        };
        assert!(e.to_string().contains("maps.example"));
    }

    #[test]
    fn not_found_accessors() {
        let e = CaptureError::StreetViewNotFound {
            address: Some("a".into()),
            url: None,
        };
        assert_eq!(e.address(), Some("a"));
        assert_eq!(e.url(), None);
        assert_eq!(CaptureError::Internal("x".into()).address(), None);
    }

    #[test]
    fn missing_dependency_display() {
        let e = CaptureError::MissingDependency {
            item: "poi-7".into(),
            kind: "address".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("poi-7"));
        assert!(msg.contains("address"));
    }
}
