//! JSON sidecar records as exported next to each photo.
//!
//! Only the fields the metadata write needs are kept. Everything else in the
//! export (view counts, people, device info, ...) is ignored.

use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

impl GeoPoint {
    /// The exporter writes 0/0/0 when the location was removed
    pub fn is_origin(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0 && self.altitude == 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SidecarRecord {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Capture instant, seconds since the Unix epoch
    pub taken_at: Option<i64>,
    pub geo: Option<GeoPoint>,
}

#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ----------------------------------------------------------------------------
// Wire shape
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSidecar {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    photo_taken_time: Option<RawTime>,
    #[serde(default)]
    geo_data_exif: Option<RawGeo>,
    /// Older exports only carry the album-level location
    #[serde(default)]
    geo_data: Option<RawGeo>,
}

#[derive(Debug, Deserialize)]
struct RawTime {
    /// Usually a string ("1609459200"), sometimes a bare number
    #[serde(default)]
    timestamp: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawGeo {
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    altitude: Option<f64>,
}

fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

impl From<RawSidecar> for SidecarRecord {
    fn from(raw: RawSidecar) -> Self {
        let taken_at = raw
            .photo_taken_time
            .and_then(|t| t.timestamp)
            .as_ref()
            .and_then(parse_timestamp);

        // a partial triple is treated as no location at all
        let geo = raw.geo_data_exif.or(raw.geo_data).and_then(|g| match (g.latitude, g.longitude, g.altitude) {
            (Some(latitude), Some(longitude), Some(altitude)) => Some(GeoPoint {
                latitude,
                longitude,
                altitude,
            }),
            _ => None,
        });

        Self {
            title: raw.title,
            description: raw.description,
            taken_at,
            geo,
        }
    }
}

impl SidecarRecord {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let raw: RawSidecar = serde_json::from_str(text)?;
        Ok(raw.into())
    }

    pub fn load(path: &Path) -> Result<Self, SidecarError> {
        let text = std::fs::read_to_string(path).map_err(|source| SidecarError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| SidecarError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_record() {
        let json = r#"{
            "title": "IMG_0001.HEIC",
            "description": "Harbour at dusk",
            "imageViews": "12",
            "photoTakenTime": {"timestamp": "1609459200", "formatted": "Jan 1, 2021"},
            "geoDataExif": {"latitude": 25.033, "longitude": 121.5654, "altitude": 10.0,
                            "latitudeSpan": 0.0, "longitudeSpan": 0.0}
        }"#;
        let record = SidecarRecord::from_json(json).unwrap();
        assert_eq!(record.title.as_deref(), Some("IMG_0001.HEIC"));
        assert_eq!(record.description.as_deref(), Some("Harbour at dusk"));
        assert_eq!(record.taken_at, Some(1609459200));
        let geo = record.geo.unwrap();
        assert_eq!(geo.latitude, 25.033);
        assert!(!geo.is_origin());
    }

    #[test]
    fn test_geo_data_fallback() {
        let record = SidecarRecord::from_json(
            r#"{"geoData": {"latitude": 1.5, "longitude": 2.5, "altitude": 3.0}}"#,
        )
        .unwrap();
        assert_eq!(record.geo.unwrap().longitude, 2.5);

        let both = SidecarRecord::from_json(
            r#"{"geoDataExif": {"latitude": 1.0, "longitude": 1.0, "altitude": 1.0},
                "geoData": {"latitude": 9.0, "longitude": 9.0, "altitude": 9.0}}"#,
        )
        .unwrap();
        assert_eq!(both.geo.unwrap().latitude, 1.0);
    }

    #[test]
    fn test_numeric_timestamp() {
        let record = SidecarRecord::from_json(r#"{"photoTakenTime": {"timestamp": 1609459200}}"#).unwrap();
        assert_eq!(record.taken_at, Some(1609459200));
    }

    #[test]
    fn test_garbage_timestamp_is_absent() {
        let record = SidecarRecord::from_json(r#"{"photoTakenTime": {"timestamp": "soon"}}"#).unwrap();
        assert_eq!(record.taken_at, None);
    }

    #[test]
    fn test_partial_geo_is_absent() {
        let record =
            SidecarRecord::from_json(r#"{"geoDataExif": {"latitude": 1.0, "longitude": 2.0}}"#).unwrap();
        assert!(record.geo.is_none());
    }

    #[test]
    fn test_origin_geo() {
        let record = SidecarRecord::from_json(
            r#"{"photoTakenTime": {"timestamp": "1609459200"},
                "geoDataExif": {"latitude": 0, "longitude": 0, "altitude": 0}}"#,
        )
        .unwrap();
        assert!(record.geo.unwrap().is_origin());
    }

    #[test]
    fn test_empty_object() {
        assert_eq!(SidecarRecord::from_json("{}").unwrap(), SidecarRecord::default());
    }

    #[test]
    fn test_malformed_json() {
        assert!(SidecarRecord::from_json("{\"title\": ").is_err());
        assert!(SidecarRecord::from_json("[1, 2]").is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "not json").unwrap();
        let err = SidecarRecord::load(&path).unwrap_err();
        assert!(matches!(err, SidecarError::Parse { .. }));
        assert!(err.to_string().contains("broken.json"));
    }
}
