//! Runs exiftool for one media file and guarantees a destination artifact.
//!
//! Whatever the tool does, a file with the media's name ends up in the
//! destination directory: either the tool's output or an untouched copy of
//! the original.

use crate::metadata_builder::{to_args, FieldAssignment};
use shared_utils::exiftool::write_args;
use shared_utils::file_copier::{replace_with, staging_path};
use shared_utils::{copy_preserving_times, create_destination_dir, destination_path, MetadataTool};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How an existing destination file is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Let the tool refuse it ("already exists")
    RefuseExisting,
    /// Write to a staging file, then move it over the destination
    Replace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataOutcome {
    pub success: bool,
    /// Tool diagnostic (single line) when `success` is false
    pub diagnostic: String,
    /// Informational output when `success` is true
    pub messages: String,
    pub destination: PathBuf,
    pub tool_invoked: bool,
    /// Set when the fallback copy of the original failed too
    pub copy_error: Option<String>,
}

impl MetadataOutcome {
    fn copied(destination: PathBuf) -> Self {
        Self {
            success: true,
            diagnostic: String::new(),
            messages: "No metadata to apply, original copied".to_string(),
            destination,
            tool_invoked: false,
            copy_error: None,
        }
    }

    fn failed(destination: PathBuf, diagnostic: String, tool_invoked: bool) -> Self {
        Self {
            success: false,
            diagnostic,
            messages: String::new(),
            destination,
            tool_invoked,
            copy_error: None,
        }
    }

    fn with_copy_error(mut self, error: &std::io::Error) -> Self {
        if !self.diagnostic.is_empty() {
            self.diagnostic.push_str("; ");
        }
        self.diagnostic.push_str(&format!("copy failed: {}", error));
        self.copy_error = Some(error.to_string());
        self
    }
}

pub struct MetadataApplier<'a> {
    tool: &'a dyn MetadataTool,
}

impl<'a> MetadataApplier<'a> {
    pub fn new(tool: &'a dyn MetadataTool) -> Self {
        Self { tool }
    }

    /// First attempt: write `dest_dir/<media name>`, refusing to overwrite
    pub fn apply(
        &self,
        media: &Path,
        assignments: &[FieldAssignment],
        dest_dir: &Path,
    ) -> MetadataOutcome {
        let destination = destination_path(media, dest_dir);
        if let Err(e) = create_destination_dir(dest_dir) {
            return MetadataOutcome::failed(destination, e.to_string(), false);
        }
        self.apply_to(media, assignments, &destination, &[], WriteMode::RefuseExisting)
    }

    /// Write `media` + `assignments` to exactly `destination`
    pub fn apply_to(
        &self,
        media: &Path,
        assignments: &[FieldAssignment],
        destination: &Path,
        extra_flags: &[&str],
        mode: WriteMode,
    ) -> MetadataOutcome {
        let destination = destination.to_path_buf();

        if assignments.is_empty() {
            return match copy_to(media, &destination) {
                Ok(()) => MetadataOutcome::copied(destination),
                Err(e) => MetadataOutcome::failed(destination, String::new(), false).with_copy_error(&e),
            };
        }

        let target = match mode {
            WriteMode::RefuseExisting => destination.clone(),
            WriteMode::Replace => {
                let staging = staging_path(&destination);
                let _ = std::fs::remove_file(&staging);
                staging
            }
        };

        let args = write_args(media, &target, &to_args(assignments), extra_flags);
        let output = match self.tool.execute(&args) {
            Ok(output) => output,
            Err(e) => {
                let diagnostic = format!("Failed to execute {}: {}", self.tool.program(), e);
                return self.fallback(media, destination, diagnostic, false);
            }
        };

        if !output.success {
            if mode == WriteMode::Replace {
                let _ = std::fs::remove_file(&target);
            }
            return self.fallback(media, destination, output.diagnostic(), true);
        }

        if mode == WriteMode::Replace {
            if let Err(e) = replace_with(&target, &destination) {
                let _ = std::fs::remove_file(&target);
                let diagnostic = format!("Failed to move {} into place: {}", target.display(), e);
                return self.fallback(media, destination, diagnostic, true);
            }
        }

        debug!(
            media = %media.display(),
            destination = %destination.display(),
            fields = assignments.len(),
            "Metadata written"
        );

        MetadataOutcome {
            success: true,
            diagnostic: String::new(),
            messages: shared_utils::exiftool::single_line(&output.stdout),
            destination,
            tool_invoked: true,
            copy_error: None,
        }
    }

    /// Keep the failure but make sure the original is in the destination
    fn fallback(
        &self,
        media: &Path,
        destination: PathBuf,
        diagnostic: String,
        tool_invoked: bool,
    ) -> MetadataOutcome {
        warn!(media = %media.display(), diagnostic = %diagnostic, "Metadata write failed, copying original");
        let outcome = MetadataOutcome::failed(destination, diagnostic, tool_invoked);
        match copy_to(media, &outcome.destination) {
            Ok(()) => outcome,
            Err(e) => outcome.with_copy_error(&e),
        }
    }
}

/// Copy unless `destination` already holds a file
fn copy_to(media: &Path, destination: &Path) -> std::io::Result<()> {
    if destination.is_file() {
        return Ok(());
    }
    copy_preserving_times(media, destination)
}
