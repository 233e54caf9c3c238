//! Single-shot driver: one feature or URL → `<id>.json` + `<id>.jpg`.
//!
//! This is the CLI-to-file twin of [`crate::batch`]: both are thin drivers
//! over the same [`CaptureSession`] core, differing only in where the input
//! comes from and where the results go.

use crate::error::CaptureError;
use crate::output::MetadataRecord;
use crate::session::{derive_id, CaptureSession, CaptureTarget};
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

/// Artifacts of one single-shot run.
#[derive(Debug)]
pub struct ShootOutput {
    pub id: String,
    pub image_path: PathBuf,
    pub metadata_path: PathBuf,
    pub record: MetadataRecord,
}

/// Resolve the mutually exclusive feature/URL input to a capture target.
///
/// Exactly one of the two must be given; a feature must carry a
/// `properties.address` string. The feature object is returned untouched
/// for pass-through into the metadata record.
pub fn resolve_target(
    feature: Option<Value>,
    url: Option<String>,
) -> Result<(CaptureTarget, Option<Value>), CaptureError> {
    match (feature, url) {
        (Some(_), Some(_)) => Err(CaptureError::Input {
            reason: "a GeoJSON feature and a URL are mutually exclusive".to_string(),
        }),
        (None, None) => Err(CaptureError::Input {
            reason: "no URL or GeoJSON feature provided".to_string(),
        }),
        (None, Some(url)) => Ok((CaptureTarget::Url(url), None)),
        (Some(feature), None) => {
            let address = feature
                .get("properties")
                .and_then(|p| p.get("address"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| CaptureError::Input {
                    reason: "no address found in POI data".to_string(),
                })?;
            Ok((CaptureTarget::Address(address), Some(feature)))
        }
    }
}

/// Capture one target and write `<id>.jpg` + `<id>.json` into the
/// configured output directory.
///
/// The image is staged in a temp file first because a URL-only capture's id
/// is derived from the *final* viewer URL, which is only known after the
/// interaction sequence completes.
pub async fn shoot(
    session: &CaptureSession,
    feature: Option<Value>,
    url: Option<String>,
) -> Result<ShootOutput, CaptureError> {
    let (target, feature) = resolve_target(feature, url)?;

    let staged = tempfile::Builder::new()
        .prefix("streetcap-")
        .suffix(".jpg")
        .tempfile()
        .map_err(|e| CaptureError::Internal(format!("tempfile: {e}")))?;

    let result = session.capture(&target, staged.path()).await?;

    let id = derive_id(&target, &result.browser_url).ok_or_else(|| {
        // Unreachable in practice: a successful capture implies the camera
        // segment matched the final URL.
        CaptureError::Internal("no id derivable from final URL".to_string())
    })?;

    let out_dir = &session.config().out_dir;
    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|source| CaptureError::OutputWrite {
            path: out_dir.clone(),
            source,
        })?;

    let image_path = out_dir.join(format!("{id}.jpg"));
    tokio::fs::copy(staged.path(), &image_path)
        .await
        .map_err(|source| CaptureError::OutputWrite {
            path: image_path.clone(),
            source,
        })?;

    let record = MetadataRecord {
        id: id.clone(),
        street_view: result.street_view(),
        osm: feature,
    };

    let metadata_path = out_dir.join(format!("{id}.json"));
    let pretty = serde_json::to_string_pretty(&record)
        .map_err(|e| CaptureError::Internal(e.to_string()))?;
    tokio::fs::write(&metadata_path, pretty)
        .await
        .map_err(|source| CaptureError::OutputWrite {
            path: metadata_path.clone(),
            source,
        })?;

    info!(
        "Wrote {} and {}",
        image_path.display(),
        metadata_path.display()
    );

    Ok(ShootOutput {
        id,
        image_path,
        metadata_path,
        record,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn both_inputs_rejected() {
        let err = resolve_target(Some(json!({})), Some("https://m".into()));
        assert!(matches!(err, Err(CaptureError::Input { .. })));
    }

    #[test]
    fn neither_input_rejected() {
        let err = resolve_target(None, None);
        assert!(matches!(err, Err(CaptureError::Input { .. })));
    }

    #[test]
    fn url_input_becomes_url_target() {
        let (target, feature) = resolve_target(None, Some("https://m/x".into())).unwrap();
        assert_eq!(target, CaptureTarget::Url("https://m/x".into()));
        assert!(feature.is_none());
    }

    #[test]
    fn feature_address_becomes_address_target() {
        let poi = json!({"properties": {"address": "123 Main St", "name": "x"}});
        let (target, feature) = resolve_target(Some(poi.clone()), None).unwrap();
        assert_eq!(target, CaptureTarget::Address("123 Main St".into()));
        assert_eq!(feature, Some(poi));
    }

    #[test]
    fn feature_without_address_is_an_input_error() {
        let err = resolve_target(Some(json!({"properties": {}})), None);
        assert!(matches!(err, Err(CaptureError::Input { .. })));
        let err = resolve_target(Some(json!({"properties": {"address": 7}})), None);
        assert!(matches!(err, Err(CaptureError::Input { .. })));
    }
}
