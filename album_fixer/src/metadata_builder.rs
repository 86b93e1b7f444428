//! Sidecar record → exiftool tag assignments.
//!
//! The returned list is what gets written; an empty list means there is
//! nothing to write and the applier only copies the file.

use crate::offset_time::{parse_offset, OffsetTimeTable};
use crate::sidecar::SidecarRecord;
use chrono::{DateTime, Offset, Utc};
use std::fmt;
use std::path::Path;
use tracing::warn;

/// EXIF date layout, no quotes or offset suffix
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

const DATE_TAGS: &[&str] = &["DateTimeOriginal", "FileCreateDate"];
const DESCRIPTION_TAGS: &[&str] = &["Description", "ImageDescription"];
const GPS_LATITUDE: &str = "GPSLatitude*";
const GPS_LONGITUDE: &str = "GPSLongitude*";
const GPS_ALTITUDE: &str = "GPSAltitude*";
const GPS_COORDINATES: &str = "GPSCoordinates";

/// One `-Tag=value` argument. An empty value clears the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAssignment {
    pub tag: &'static str,
    pub value: String,
}

impl FieldAssignment {
    pub fn set(tag: &'static str, value: impl Into<String>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    pub fn clear(tag: &'static str) -> Self {
        Self::set(tag, String::new())
    }

    pub fn is_clear(&self) -> bool {
        self.value.is_empty()
    }

    pub fn to_arg(&self) -> String {
        format!("-{}={}", self.tag, self.value)
    }
}

impl fmt::Display for FieldAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_arg())
    }
}

pub fn to_args(assignments: &[FieldAssignment]) -> Vec<String> {
    assignments.iter().map(FieldAssignment::to_arg).collect()
}

pub struct MetadataBuilder<'a> {
    offsets: &'a OffsetTimeTable,
}

impl<'a> MetadataBuilder<'a> {
    pub fn new(offsets: &'a OffsetTimeTable) -> Self {
        Self { offsets }
    }

    pub fn build(&self, record: &SidecarRecord, media_path: &Path) -> Vec<FieldAssignment> {
        let mut assignments = Vec::new();

        if let Some(ts) = record.taken_at {
            let offset = self.offsets.lookup(media_path);
            match format_capture_time(ts, offset) {
                Some(formatted) => {
                    for tag in DATE_TAGS {
                        assignments.push(FieldAssignment::set(*tag, formatted.clone()));
                    }
                }
                None => warn!(
                    media = %media_path.display(),
                    timestamp = ts,
                    "Capture timestamp out of range, dates left untouched"
                ),
            }
        }

        if let Some(geo) = record.geo {
            if geo.is_origin() {
                for tag in [GPS_LATITUDE, GPS_LONGITUDE, GPS_ALTITUDE, GPS_COORDINATES] {
                    assignments.push(FieldAssignment::clear(tag));
                }
            } else {
                assignments.push(FieldAssignment::set(GPS_LATITUDE, geo.latitude.to_string()));
                assignments.push(FieldAssignment::set(GPS_LONGITUDE, geo.longitude.to_string()));
                assignments.push(FieldAssignment::set(GPS_ALTITUDE, geo.altitude.to_string()));
                assignments.push(FieldAssignment::set(
                    GPS_COORDINATES,
                    format!("{}, {}, {}", geo.latitude, geo.longitude, geo.altitude),
                ));
            }
        }

        if let Some(title) = record.title.as_deref().and_then(clean_text) {
            assignments.push(FieldAssignment::set("Title", title));
        }

        if let Some(description) = record.description.as_deref().and_then(clean_text) {
            for tag in DESCRIPTION_TAGS {
                assignments.push(FieldAssignment::set(*tag, description.clone()));
            }
        }

        assignments
    }
}

/// Render a Unix timestamp at `offset`; an unparsable offset renders as UTC
pub fn format_capture_time(timestamp: i64, offset: &str) -> Option<String> {
    let utc: DateTime<Utc> = DateTime::from_timestamp(timestamp, 0)?;
    let offset = parse_offset(offset).unwrap_or_else(|| {
        warn!(offset = offset, "Invalid UTC offset, using +00:00");
        Utc.fix()
    });
    Some(utc.with_timezone(&offset).format(EXIF_DATE_FORMAT).to_string())
}

/// Trim and drop control characters; `None` when nothing printable is left
fn clean_text(text: &str) -> Option<String> {
    let cleaned: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
