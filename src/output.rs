//! Result and persisted-record types.
//!
//! The JSON shapes here are a wire contract shared with downstream
//! consumers of the metadata files and annotation documents, so field names
//! are pinned with serde renames rather than following Rust convention.

use crate::geometry::Geometry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one successful [`crate::session::CaptureSession`] run.
#[derive(Debug, Clone)]
pub struct CaptureResult {
    /// Where the captured frame was written.
    pub image_path: PathBuf,
    /// Camera geometry parsed from the final viewer URL.
    pub geometry: Geometry,
    /// The URL the capture navigated to (the built search URL or the
    /// caller's explicit URL). This is what the metadata record persists.
    pub url: String,
    /// The viewer URL as the browser reported it after the interaction
    /// sequence — the string the geometry was parsed from.
    pub browser_url: String,
    /// Requested pixel dimensions (width, height).
    pub dimensions: (u32, u32),
    /// Capture year from the viewer's copyright text, when present.
    pub year: Option<u16>,
}

impl CaptureResult {
    /// The `streetView` record this capture serialises to.
    pub fn street_view(&self) -> StreetViewMeta {
        StreetViewMeta {
            dimensions: self.dimensions,
            url: self.url.clone(),
            altitude: self.geometry.altitude,
            fov: self.geometry.field_of_view,
            heading: self.geometry.heading,
            pitch: self.geometry.pitch,
            geometry: PointGeometry::new(self.geometry.longitude, self.geometry.latitude),
        }
    }
}

/// GeoJSON-style point. Coordinates are `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: [f64; 2],
}

impl PointGeometry {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [longitude, latitude],
        }
    }
}

/// The `streetView` block of the persisted metadata record.
///
/// `a` is the viewer's altitude parameter, kept under its wire name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetViewMeta {
    pub dimensions: (u32, u32),
    pub url: String,
    #[serde(rename = "a")]
    pub altitude: f64,
    pub fov: f64,
    pub heading: f64,
    pub pitch: f64,
    pub geometry: PointGeometry,
}

/// Single-shot metadata record, written next to the image as `<id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: String,
    #[serde(rename = "streetView")]
    pub street_view: StreetViewMeta,
    /// The original feature object, passed through unmodified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osm: Option<serde_json::Value>,
}

/// Batch success annotation, written under annotation kind `"screenshot"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotAnnotation {
    #[serde(flatten)]
    pub street_view: StreetViewMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,
    #[serde(rename = "screenshotUrl")]
    pub screenshot_url: String,
}

/// Batch failure annotation, written under the same annotation kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureAnnotation {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> CaptureResult {
        CaptureResult {
            image_path: PathBuf::from("screenshots/x.jpg"),
            geometry: Geometry {
                latitude: 52.1,
                longitude: 4.3,
                altitude: 1.5,
                field_of_view: 75.0,
                heading: 120.0,
                pitch: 5.0,
            },
            url: "https://www.google.nl/maps/place/X".into(),
            browser_url: "https://maps/@52.1,4.3,1.5a,75.0y,120.0h,95.0t".into(),
            dimensions: (2880, 1800),
            year: Some(2019),
        }
    }

    #[test]
    fn street_view_wire_shape() {
        let v = serde_json::to_value(sample_result().street_view()).unwrap();
        assert_eq!(v["dimensions"], serde_json::json!([2880, 1800]));
        // The navigated URL is persisted, not the browser's final URL.
        assert_eq!(v["url"], "https://www.google.nl/maps/place/X");
        assert_eq!(v["a"], serde_json::json!(1.5));
        assert_eq!(v["fov"], serde_json::json!(75.0));
        assert_eq!(v["pitch"], serde_json::json!(5.0));
        assert_eq!(v["geometry"]["type"], "Point");
        // GeoJSON order: [lon, lat]
        assert_eq!(v["geometry"]["coordinates"], serde_json::json!([4.3, 52.1]));
        assert!(v.get("altitude").is_none(), "altitude must serialise as 'a'");
    }

    #[test]
    fn screenshot_annotation_flattens_street_view() {
        let ann = ScreenshotAnnotation {
            street_view: sample_result().street_view(),
            year: Some(2019),
            screenshot_url: "https://assets.example/x.jpg".into(),
        };
        let v = serde_json::to_value(&ann).unwrap();
        assert_eq!(v["heading"], serde_json::json!(120.0));
        assert_eq!(v["year"], serde_json::json!(2019));
        assert_eq!(v["screenshotUrl"], "https://assets.example/x.jpg");
    }

    #[test]
    fn failure_annotation_omits_unknown_fields() {
        let ann = FailureAnnotation {
            error: "No Street View panorama found".into(),
            address: None,
            url: Some("https://maps/@1,2,3z".into()),
        };
        let v = serde_json::to_value(&ann).unwrap();
        assert!(v.get("address").is_none());
        assert_eq!(v["url"], "https://maps/@1,2,3z");
    }

    #[test]
    fn metadata_record_field_names() {
        let rec = MetadataRecord {
            id: "123+main+st".into(),
            street_view: sample_result().street_view(),
            osm: Some(serde_json::json!({"properties": {"address": "123 Main St"}})),
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert!(v.get("streetView").is_some());
        assert!(v.get("osm").is_some());
    }
}
