// ============================================================================
// 🕐 Per-file UTC offsets
// ============================================================================
//
// Sidecar timestamps are UTC instants; the camera's wall-clock offset lives in
// the original file's EXIF OffsetTime* tags. The operator can export those with
// `exiftool -csv -OffsetTime -OffsetTimeOriginal -OffsetTimeDigitized -r <dir>`
// and pass the CSV here. Files without an entry use the configured default.
//
// ============================================================================

use crate::config::DEFAULT_OFFSET_TIME;
use anyhow::{Context, Result};
use chrono::FixedOffset;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SOURCE_FILE: &str = "SourceFile";
const OFFSET_COLUMNS: [&str; 3] = ["OffsetTime", "OffsetTimeOriginal", "OffsetTimeDigitized"];
/// exiftool's placeholder for a missing tag
const MISSING: &str = "-";

#[derive(Debug, Clone)]
pub struct OffsetTimeTable {
    by_path: HashMap<PathBuf, String>,
    by_name: HashMap<String, String>,
    default_offset: String,
}

impl Default for OffsetTimeTable {
    fn default() -> Self {
        Self::with_default(DEFAULT_OFFSET_TIME)
    }
}

impl OffsetTimeTable {
    /// Empty table: every lookup yields `default_offset`
    pub fn with_default(default_offset: &str) -> Self {
        Self {
            by_path: HashMap::new(),
            by_name: HashMap::new(),
            default_offset: default_offset.to_string(),
        }
    }

    pub fn load(path: &Path, default_offset: &str) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read offset file: {}", path.display()))?;
        let text = decode_text(&bytes);
        let table = Self::from_csv(&text, default_offset)
            .with_context(|| format!("Failed to parse offset file: {}", path.display()))?;
        info!(
            "🕐 Loaded {} UTC offsets from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_csv(text: &str, default_offset: &str) -> Result<Self> {
        let mut table = Self::with_default(default_offset);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let column = |name: &str| headers.iter().position(|h| h == name);
        let source_idx = column(SOURCE_FILE)
            .with_context(|| format!("missing {} column", SOURCE_FILE))?;
        let offset_idx: Vec<Option<usize>> = OFFSET_COLUMNS.iter().map(|c| column(c)).collect();

        for record in reader.records() {
            let record = record?;
            let Some(source) = record.get(source_idx).map(str::trim).filter(|s| !s.is_empty())
            else {
                continue;
            };

            let mut values: Vec<&str> = offset_idx
                .iter()
                .filter_map(|idx| idx.and_then(|i| record.get(i)))
                .map(str::trim)
                .filter(|v| !v.is_empty() && *v != MISSING)
                .collect();
            values.sort_unstable();
            values.dedup();

            match values.as_slice() {
                [] => continue,
                [offset] => table.insert(source, offset),
                _ => {
                    info!(
                        "Skipping {}: inconsistent offsets {:?}",
                        source, values
                    );
                }
            }
        }

        Ok(table)
    }

    fn insert(&mut self, source: &str, offset: &str) {
        let path = PathBuf::from(source);
        if let Some(name) = path.file_name() {
            self.by_name
                .entry(name.to_string_lossy().to_string())
                .or_insert_with(|| offset.to_string());
        }
        self.by_path.insert(path, offset.to_string());
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn default_offset(&self) -> &str {
        &self.default_offset
    }

    /// Offset for `media`: exact path, then bare file name, then the default
    pub fn lookup(&self, media: &Path) -> &str {
        if let Some(offset) = self.by_path.get(media) {
            return offset;
        }
        media
            .file_name()
            .and_then(|n| self.by_name.get(&*n.to_string_lossy()))
            .map(String::as_str)
            .unwrap_or(&self.default_offset)
    }
}

/// Parse `+HH:MM`, `-HH:MM`, `+HHMM` or `Z`
pub fn parse_offset(text: &str) -> Option<FixedOffset> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// UTF-8 (with or without BOM) or UTF-16LE with BOM, which is what exiftool
/// produces when redirected under PowerShell
fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        debug!("Decoding offset file as UTF-16LE");
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).to_string()
}
