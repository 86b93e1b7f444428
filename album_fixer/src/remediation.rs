// ============================================================================
// 🩹 Remediation
// ============================================================================
//
// One remediator per ErrorKind. Each one leaves an artifact in the destination
// directory (copying the original if nothing better is possible) and reports
// whether the file is now considered processed.
//
// ============================================================================

use crate::applier::{MetadataApplier, WriteMode};
use crate::classifier::{ErrorClassification, ErrorKind};
use crate::metadata_builder::FieldAssignment;
use shared_utils::exiftool::IGNORE_MINOR_ERRORS;
use shared_utils::{destination_path, ensure_destination, same_contents};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything a remediator may look at
pub struct RemediationContext<'r> {
    /// Source media file
    pub media: &'r Path,
    pub dest_dir: &'r Path,
    pub classification: &'r ErrorClassification,
    /// Rebuilt from the sidecar; empty when there is none
    pub assignments: &'r [FieldAssignment],
    pub applier: &'r MetadataApplier<'r>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemediationResult {
    pub processed: bool,
    pub message: String,
    /// Where the artifact ended up, when known
    pub destination: Option<PathBuf>,
    /// Set when even the pass-through copy failed
    pub copy_error: Option<String>,
}

impl RemediationResult {
    fn new(processed: bool, message: impl Into<String>) -> Self {
        Self {
            processed,
            message: message.into(),
            destination: None,
            copy_error: None,
        }
    }
}

pub trait Remediator: Send + Sync {
    fn remediate(&self, ctx: &RemediationContext) -> RemediationResult;

    fn name(&self) -> &'static str;
}

pub fn create_remediator(kind: ErrorKind) -> Box<dyn Remediator> {
    match kind {
        ErrorKind::MissingMetadata => Box::new(MissingMetadataRemediator),
        ErrorKind::MakerNotes => Box::new(MakerNotesRemediator),
        ErrorKind::IncorrectExtension => Box::new(IncorrectExtensionRemediator),
        ErrorKind::TruncatedMedia => Box::new(TruncatedMediaRemediator),
        ErrorKind::FileExists => Box::new(FileExistsRemediator),
        ErrorKind::Unknown => Box::new(UnknownErrorRemediator),
    }
}

/// Dispatch on the classification's kind
pub fn remediate(ctx: &RemediationContext) -> RemediationResult {
    let remediator = create_remediator(ctx.classification.kind);
    debug!(
        media = %ctx.media.display(),
        remediator = remediator.name(),
        "Remediating"
    );
    let result = remediator.remediate(ctx);
    if result.processed {
        info!("🩹 {}: {}", ctx.media.display(), result.message);
    } else {
        warn!("⚠️  {}: {}", ctx.media.display(), result.message);
    }
    result
}

/// Copy the original into the destination unless it is already there.
/// Without a destination artifact the file is never processed.
fn copy_through(ctx: &RemediationContext, mut result: RemediationResult) -> RemediationResult {
    match ensure_destination(ctx.media, ctx.dest_dir) {
        Ok(outcome) => result.destination = Some(outcome.path().to_path_buf()),
        Err(e) => {
            warn!(media = %ctx.media.display(), error = %e, "Pass-through copy failed");
            result.processed = false;
            result.copy_error = Some(e.to_string());
        }
    }
    result
}

// ----------------------------------------------------------------------------
// missing_metadata
// ----------------------------------------------------------------------------

pub struct MissingMetadataRemediator;

impl Remediator for MissingMetadataRemediator {
    fn remediate(&self, ctx: &RemediationContext) -> RemediationResult {
        copy_through(
            ctx,
            RemediationResult::new(false, "No metadata available, file copied to destination"),
        )
    }

    fn name(&self) -> &'static str {
        "MissingMetadata"
    }
}

// ----------------------------------------------------------------------------
// maker_notes: same write again with minor errors downgraded
// ----------------------------------------------------------------------------

pub struct MakerNotesRemediator;

impl Remediator for MakerNotesRemediator {
    fn remediate(&self, ctx: &RemediationContext) -> RemediationResult {
        if ctx.assignments.is_empty() {
            return copy_through(
                ctx,
                RemediationResult::new(false, "Failed to fix maker notes: no metadata to re-apply"),
            );
        }

        let destination = destination_path(ctx.media, ctx.dest_dir);
        let outcome = ctx.applier.apply_to(
            ctx.media,
            ctx.assignments,
            &destination,
            &[IGNORE_MINOR_ERRORS],
            WriteMode::Replace,
        );

        let mut result = if outcome.success {
            RemediationResult::new(true, "Fixed maker notes issue")
        } else {
            RemediationResult::new(
                false,
                format!("Failed to fix maker notes: {}", outcome.diagnostic),
            )
        };
        result.destination = Some(outcome.destination);
        result.copy_error = outcome.copy_error;
        result
    }

    fn name(&self) -> &'static str {
        "MakerNotes"
    }
}

// ----------------------------------------------------------------------------
// incorrect_extension: sibling copy under the real extension, then write that
// ----------------------------------------------------------------------------

pub struct IncorrectExtensionRemediator;

impl Remediator for IncorrectExtensionRemediator {
    fn remediate(&self, ctx: &RemediationContext) -> RemediationResult {
        let (Some(current), Some(expected)) = (
            ctx.classification.param("current"),
            ctx.classification.param("expected"),
        ) else {
            return copy_through(
                ctx,
                RemediationResult::new(false, "Failed to fix extension: expected type unknown"),
            );
        };

        let Some(sibling) = renamed_sibling(ctx.media, &expected.to_lowercase()) else {
            return copy_through(
                ctx,
                RemediationResult::new(
                    false,
                    format!("Failed to fix extension: no free name for a .{} copy", expected),
                ),
            );
        };
        if !sibling.exists() {
            if let Err(e) = std::fs::copy(ctx.media, &sibling) {
                return copy_through(
                    ctx,
                    RemediationResult::new(
                        false,
                        format!("Failed to fix extension: cannot create {}: {}", sibling.display(), e),
                    ),
                );
            }
        }

        let destination = destination_path(&sibling, ctx.dest_dir);
        let outcome = ctx.applier.apply_to(
            &sibling,
            ctx.assignments,
            &destination,
            &[],
            WriteMode::Replace,
        );

        // the first pass left a copy under the wrong extension; it goes only
        // once the renamed destination holds this media
        let stale = destination_path(ctx.media, ctx.dest_dir);
        if outcome.copy_error.is_none()
            && destination.is_file()
            && stale != destination
            && stale.is_file()
        {
            if let Err(e) = std::fs::remove_file(&stale) {
                warn!(path = %stale.display(), error = %e, "Failed to remove stale copy");
            }
        }

        let mut result = if outcome.success {
            RemediationResult::new(
                true,
                format!("Updated file extension from {} to {}", current, expected),
            )
        } else {
            RemediationResult::new(
                false,
                format!(
                    "Updated file extension from {} to {} but metadata write failed: {}",
                    current, expected, outcome.diagnostic
                ),
            )
        };
        result.destination = Some(outcome.destination);
        result.copy_error = outcome.copy_error;
        result
    }

    fn name(&self) -> &'static str {
        "IncorrectExtension"
    }
}

/// Highest `_N` suffix tried before giving up on a renamed copy
const MAX_RENAME_ATTEMPTS: usize = 99;

/// `<stem>.<ext>` next to `media`, or `<stem>_N.<ext>` when that name holds
/// some other file. An existing file with identical bytes is reused.
fn renamed_sibling(media: &Path, extension: &str) -> Option<PathBuf> {
    let stem = media.file_stem()?.to_string_lossy().to_string();
    let candidates = std::iter::once(format!("{}.{}", stem, extension)).chain(
        (1..=MAX_RENAME_ATTEMPTS).map(|n| format!("{}_{}.{}", stem, n, extension)),
    );
    candidates
        .map(|name| media.with_file_name(name))
        .find(|candidate| !candidate.exists() || same_contents(media, candidate))
}

// ----------------------------------------------------------------------------
// truncated_media
// ----------------------------------------------------------------------------

pub struct TruncatedMediaRemediator;

impl Remediator for TruncatedMediaRemediator {
    fn remediate(&self, ctx: &RemediationContext) -> RemediationResult {
        copy_through(
            ctx,
            RemediationResult::new(false, "File appears to be corrupted (truncated media)"),
        )
    }

    fn name(&self) -> &'static str {
        "TruncatedMedia"
    }
}

// ----------------------------------------------------------------------------
// file_exists: an earlier run already produced the artifact
// ----------------------------------------------------------------------------

pub struct FileExistsRemediator;

impl Remediator for FileExistsRemediator {
    fn remediate(&self, ctx: &RemediationContext) -> RemediationResult {
        let existing = ctx
            .classification
            .param("existing_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| destination_path(ctx.media, ctx.dest_dir));
        let name = existing
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let result =
            RemediationResult::new(true, format!("File already exists in destination: {}", name));

        if existing.is_file() {
            return RemediationResult {
                destination: Some(existing),
                ..result
            };
        }
        copy_through(ctx, result)
    }

    fn name(&self) -> &'static str {
        "FileExists"
    }
}

// ----------------------------------------------------------------------------
// unknown
// ----------------------------------------------------------------------------

pub struct UnknownErrorRemediator;

impl Remediator for UnknownErrorRemediator {
    fn remediate(&self, ctx: &RemediationContext) -> RemediationResult {
        let raw = ctx.classification.param("raw").unwrap_or_default();
        copy_through(
            ctx,
            RemediationResult::new(false, format!("Unknown error: {}", raw)),
        )
    }

    fn name(&self) -> &'static str {
        "UnknownError"
    }
}
