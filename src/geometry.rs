//! Camera-geometry extraction: deterministic parsing of viewer state.
//!
//! The panoramic viewer encodes its camera in the page URL as a fixed-grammar
//! segment:
//!
//! ```text
//! @<lat>,<lon>,<alt>a,<fov>y,<heading>h,<pitch>t
//! ```
//!
//! where each placeholder is a signed, optionally-decimal number. The literal
//! `a`/`y`/`h`/`t` suffixes anchor the match so other numeric content in the
//! URL (zoom levels, tile coordinates) can never be mistaken for camera state.
//!
//! Everything in this module is a pure `&str -> T` function with no I/O, so
//! the extraction rules are testable without a browser. A failed match means
//! "the viewer never reached panorama mode", not a parse bug — callers turn
//! it into [`crate::error::CaptureError::StreetViewNotFound`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One signed, optionally-decimal number. `75`, `-12`, and `52.37` all match.
const NUM: &str = r"(-?\d+\.?\d*)";

static RE_CAMERA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("@{NUM},{NUM},{NUM}a,{NUM}y,{NUM}h,{NUM}t")).unwrap()
});

/// A 4-digit year token inside the viewer's copyright / fineprint text.
/// Any standalone 4-digit run counts; longer digit runs never match.
static RE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// The virtual camera described by a viewer URL.
///
/// All six fields come from one single regex match — partial geometry is
/// never produced. `pitch` is stored horizon-relative: the viewer reports a
/// zenith-relative angle (`t`), so the raw value has 90 subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub latitude: f64,
    pub longitude: f64,
    /// Camera altitude — the viewer's `a` parameter.
    pub altitude: f64,
    /// Field of view in degrees — the viewer's `y` parameter.
    pub field_of_view: f64,
    /// Compass heading in degrees — the viewer's `h` parameter.
    pub heading: f64,
    /// Horizon-relative pitch: raw `t` value minus 90.
    pub pitch: f64,
}

/// Parse the camera-state segment out of a viewer URL.
///
/// Returns `None` when the URL carries no camera segment. All-or-nothing:
/// either all six numbers parse as floats or no [`Geometry`] is produced.
pub fn extract(url: &str) -> Option<Geometry> {
    let caps = RE_CAMERA.captures(url)?;

    let num = |i: usize| caps.get(i)?.as_str().parse::<f64>().ok();

    Some(Geometry {
        latitude: num(1)?,
        longitude: num(2)?,
        altitude: num(3)?,
        field_of_view: num(4)?,
        heading: num(5)?,
        pitch: num(6)? - 90.0,
    })
}

/// Derive the work-item id for a URL-only capture: the six raw camera
/// numbers joined with dashes, exactly as they appear in the URL.
///
/// Joining the raw match text (not re-formatted floats) keeps the id stable
/// across float formatting differences (`75.0` stays `75.0`, `75` stays `75`).
pub fn camera_id(url: &str) -> Option<String> {
    let caps = RE_CAMERA.captures(url)?;
    let parts: Vec<&str> = (1..=6).filter_map(|i| caps.get(i).map(|m| m.as_str())).collect();
    Some(parts.join("-"))
}

/// Derive the work-item id for an address capture: lower-cased, with every
/// whitespace run collapsed to a single `+`.
pub fn address_id(address: &str) -> String {
    RE_WHITESPACE
        .replace_all(&address.to_lowercase(), "+")
        .into_owned()
}

/// Pull a capture year out of the viewer's copyright text, if present.
///
/// The fineprint node reads along the lines of `Image capture: May 2019
/// ©2019 Google`. Absence of the node or of a year token is not an error.
pub fn extract_year(copyright: &str) -> Option<u16> {
    RE_YEAR
        .captures(copyright)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u16>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PANO_URL: &str =
        "https://www.google.nl/maps/@52.1,4.3,1.5a,75.0y,120.0h,95.0t/data=!3m6!1e1";

    #[test]
    fn extracts_all_six_fields() {
        let g = extract(PANO_URL).expect("camera segment should match");
        assert_eq!(g.latitude, 52.1);
        assert_eq!(g.longitude, 4.3);
        assert_eq!(g.altitude, 1.5);
        assert_eq!(g.field_of_view, 75.0);
        assert_eq!(g.heading, 120.0);
        assert_eq!(g.pitch, 5.0, "pitch is stored as raw t minus 90");
    }

    #[test]
    fn integers_without_fraction_parse() {
        let g = extract("https://m/@52,4,2a,90y,0h,90t").unwrap();
        assert_eq!(g.latitude, 52.0);
        assert_eq!(g.field_of_view, 90.0);
        assert_eq!(g.pitch, 0.0);
    }

    #[test]
    fn negative_coordinates_preserved() {
        let g = extract("https://m/@-12,-0.5,3a,75y,10h,85t").unwrap();
        assert_eq!(g.latitude, -12.0);
        assert_eq!(g.longitude, -0.5);
    }

    #[test]
    fn map_url_without_panorama_yields_none() {
        // A plain map view uses `z` (zoom), not the six-group camera grammar.
        assert_eq!(extract("https://www.google.nl/maps/@52.37,4.89,15z"), None);
        assert_eq!(extract("https://example.com/"), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn suffix_markers_anchor_the_match() {
        // Six numbers with the wrong suffix letters must not match.
        assert_eq!(extract("https://m/@1,2,3b,4x,5q,6s"), None);
    }

    #[test]
    fn camera_id_joins_raw_numbers() {
        assert_eq!(
            camera_id(PANO_URL).unwrap(),
            "52.1-4.3-1.5-75.0-120.0-95.0"
        );
        assert_eq!(camera_id("https://m/@52.37,4.89,15z"), None);
    }

    #[test]
    fn address_id_is_deterministic() {
        assert_eq!(address_id("123 Main St"), "123+main+st");
        assert_eq!(address_id("  Spui   70,  Den Haag "), "+spui+70,+den+haag+");
        assert_eq!(address_id("Plein1813"), "plein1813");
    }

    #[test]
    fn year_from_copyright_text() {
        assert_eq!(extract_year("Image capture: May 2019 ©2019 Google"), Some(2019));
        assert_eq!(extract_year("©1999 Example"), Some(1999));
        // Any standalone 4-digit token is a year, not just 19xx/20xx.
        assert_eq!(extract_year("Image capture: 1899"), Some(1899));
        assert_eq!(extract_year("no year here"), None);
        assert_eq!(extract_year(""), None);
    }

    #[test]
    fn year_ignores_non_year_numbers() {
        // 5-digit and 3-digit runs are not years.
        assert_eq!(extract_year("postcode 25125"), None);
        assert_eq!(extract_year("suite 212"), None);
    }
}
