//! Per-directory CSV ledger.
//!
//! One row per media file, written next to the destination directory as
//! `<dir name>_output.csv`. The process pass appends; the fix pass reads,
//! updates and atomically rewrites.

use crate::classifier::ErrorKind;
use crate::remediation::RemediationResult;
use serde::{Deserialize, Serialize};
use shared_utils::AppError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const LEDGER_SUFFIX: &str = "_output.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    #[serde(rename = "Media File")]
    pub media_file: PathBuf,
    /// Empty cell when the media file had no sidecar
    #[serde(rename = "JSON File")]
    pub json_file: Option<PathBuf>,
    #[serde(rename = "Destination File")]
    pub destination_file: PathBuf,
    #[serde(rename = "Processed")]
    pub processed: bool,
    #[serde(rename = "Messages")]
    pub messages: String,
    /// Always empty once `processed` is true
    #[serde(rename = "Errors")]
    pub errors: String,
}

impl LedgerRow {
    pub fn processed(
        media_file: PathBuf,
        json_file: Option<PathBuf>,
        destination_file: PathBuf,
        messages: String,
    ) -> Self {
        Self {
            media_file,
            json_file,
            destination_file,
            processed: true,
            messages,
            errors: String::new(),
        }
    }

    pub fn failed(
        media_file: PathBuf,
        json_file: Option<PathBuf>,
        destination_file: PathBuf,
        errors: String,
    ) -> Self {
        Self {
            media_file,
            json_file,
            destination_file,
            processed: false,
            messages: String::new(),
            errors,
        }
    }

    /// Fold a remediation result into the row.
    ///
    /// Success clears `errors` and keeps the old diagnostic in `messages`.
    /// Failure keeps the diagnostic; a copy failure is noted once and always
    /// leaves the row unprocessed.
    pub fn apply_remediation(&mut self, kind: ErrorKind, result: &RemediationResult) {
        if let Some(destination) = &result.destination {
            self.destination_file = destination.clone();
        }

        if result.processed && result.copy_error.is_none() {
            self.messages = if self.errors.is_empty() {
                format!("[remediated:{}] {}", kind, result.message)
            } else {
                format!("[remediated:{}] {} (was: {})", kind, result.message, self.errors)
            };
            self.errors.clear();
            self.processed = true;
            return;
        }

        self.messages = format!("[attempted:{}] {}", kind, result.message);
        if let Some(copy_error) = &result.copy_error {
            let note = format!("copy failed: {}", copy_error);
            if !self.errors.contains(&note) {
                if !self.errors.is_empty() {
                    self.errors.push_str("; ");
                }
                self.errors.push_str(&note);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// Ledger for a destination directory: sibling `<name>_output.csv`
    pub fn for_directory(dir: &Path) -> Self {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "root".to_string());
        let parent = dir.parent().unwrap_or(dir);
        Self {
            path: parent.join(format!("{}{}", name, LEDGER_SUFFIX)),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Start a fresh ledger for this run
    pub fn reset(&self) -> Result<(), AppError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::ledger(&self.path, e)),
        }
    }

    /// Append one row, writing the header first when the file is new
    pub fn append(&self, row: &LedgerRow) -> Result<(), AppError> {
        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::ledger(&self.path, e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer
            .serialize(row)
            .map_err(|e| AppError::ledger(&self.path, e))?;
        writer.flush().map_err(|e| AppError::ledger(&self.path, e))
    }

    /// All rows in file order; a missing ledger reads as empty
    pub fn read_all(&self) -> Result<Vec<LedgerRow>, AppError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader =
            csv::Reader::from_path(&self.path).map_err(|e| AppError::ledger(&self.path, e))?;
        reader
            .deserialize()
            .collect::<Result<Vec<LedgerRow>, _>>()
            .map_err(|e| AppError::ledger(&self.path, e))
    }

    /// Replace the ledger with `rows` (temp file in the same directory, then rename)
    pub fn rewrite(&self, rows: &[LedgerRow]) -> Result<(), AppError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| AppError::ledger(&self.path, e))?;
        {
            let mut writer = csv::Writer::from_writer(temp.as_file_mut());
            if rows.is_empty() {
                writer
                    .write_record(HEADER)
                    .map_err(|e| AppError::ledger(&self.path, e))?;
            }
            for row in rows {
                writer
                    .serialize(row)
                    .map_err(|e| AppError::ledger(&self.path, e))?;
            }
            writer.flush().map_err(|e| AppError::ledger(&self.path, e))?;
        }
        temp.as_file_mut()
            .flush()
            .map_err(|e| AppError::ledger(&self.path, e))?;
        temp.persist(&self.path)
            .map_err(|e| AppError::ledger(&self.path, e.error))?;
        Ok(())
    }
}

const HEADER: [&str; 6] = [
    "Media File",
    "JSON File",
    "Destination File",
    "Processed",
    "Messages",
    "Errors",
];
