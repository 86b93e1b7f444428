// ============================================================================
// 🏷️ Diagnostic classification
// ============================================================================
//
// Maps the text exiftool printed (or the pipeline wrote in place of it) to an
// ErrorKind plus the parameters remediation needs. Rules are checked in table
// order; the first match wins. No text at all means there was nothing to
// write, which is a missing-metadata condition.
//
// ============================================================================

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Diagnostic written for media files with no paired sidecar
pub const NO_SIDECAR_DIAGNOSTIC: &str = "No JSON file found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    MissingMetadata,
    MakerNotes,
    IncorrectExtension,
    TruncatedMedia,
    FileExists,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 6] = [
        ErrorKind::MissingMetadata,
        ErrorKind::MakerNotes,
        ErrorKind::IncorrectExtension,
        ErrorKind::TruncatedMedia,
        ErrorKind::FileExists,
        ErrorKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MissingMetadata => "missing_metadata",
            ErrorKind::MakerNotes => "maker_notes",
            ErrorKind::IncorrectExtension => "incorrect_extension",
            ErrorKind::TruncatedMedia => "truncated_media",
            ErrorKind::FileExists => "file_exists",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown error kind: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassification {
    pub kind: ErrorKind,
    pub params: BTreeMap<String, String>,
}

impl ErrorClassification {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            params: BTreeMap::new(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

struct Rule {
    kind: ErrorKind,
    pattern: Regex,
}

lazy_static! {
    static ref RULES: Vec<Rule> = vec![
        Rule {
            kind: ErrorKind::MissingMetadata,
            pattern: Regex::new(r"(?i)no json file found|no metadata found")
                .expect("missing metadata regex should compile"),
        },
        Rule {
            kind: ErrorKind::MakerNotes,
            pattern: Regex::new(r"(?i)(\[minor\]\s*)?maker notes could not be parsed")
                .expect("maker notes regex should compile"),
        },
        Rule {
            kind: ErrorKind::IncorrectExtension,
            pattern: Regex::new(
                r"(?i)not a valid (?P<current>\w+) \(looks more like a (?P<expected>\w+)\)"
            )
            .expect("extension regex should compile"),
        },
        Rule {
            kind: ErrorKind::TruncatedMedia,
            pattern: Regex::new(r"(?i)truncated mdat atom")
                .expect("truncated media regex should compile"),
        },
        Rule {
            kind: ErrorKind::FileExists,
            pattern: Regex::new(r"(?i)'(?P<existing_path>[^']+)' already exists")
                .expect("file exists regex should compile"),
        },
    ];
}

/// Deterministic: the same text always yields the same classification
pub fn classify(diagnostic: Option<&str>) -> ErrorClassification {
    let text = match diagnostic.map(str::trim) {
        None | Some("") => return ErrorClassification::new(ErrorKind::MissingMetadata),
        Some(text) => text,
    };

    for rule in RULES.iter() {
        if let Some(caps) = rule.pattern.captures(text) {
            let mut classification = ErrorClassification::new(rule.kind);
            for name in rule.pattern.capture_names().flatten() {
                if let Some(m) = caps.name(name) {
                    classification
                        .params
                        .insert(name.to_string(), m.as_str().to_string());
                }
            }
            return classification;
        }
    }

    let mut classification = ErrorClassification::new(ErrorKind::Unknown);
    classification
        .params
        .insert("raw".to_string(), text.to_string());
    classification
}
