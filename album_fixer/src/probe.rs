//! Clip duration probe with a per-run cache.
//!
//! Live-photo detection asks the metadata tool for a clip's duration. The
//! same clip can be asked about more than once while resolving a directory,
//! so answers (including "no answer") are memoized for the lifetime of the
//! probe. One probe is created per run; nothing is global.

use crate::media::{MediaFile, LIVE_PHOTO_MAX_SECONDS};
use shared_utils::exiftool::{duration_args, parse_duration};
use shared_utils::MetadataTool;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

pub struct MediaProbe<'a> {
    tool: &'a dyn MetadataTool,
    durations: Mutex<HashMap<PathBuf, Option<f64>>>,
}

impl<'a> MediaProbe<'a> {
    pub fn new(tool: &'a dyn MetadataTool) -> Self {
        Self {
            tool,
            durations: Mutex::new(HashMap::new()),
        }
    }

    pub fn tool(&self) -> &'a dyn MetadataTool {
        self.tool
    }

    /// Duration in seconds, `None` when the tool cannot tell
    pub fn duration(&self, path: &Path) -> Option<f64> {
        if let Some(cached) = self.lock().get(path) {
            return *cached;
        }

        let seconds = match self.tool.execute(&duration_args(path)) {
            Ok(output) if output.success => parse_duration(&output.stdout),
            Ok(output) => {
                debug!(path = %path.display(), diagnostic = %output.diagnostic(), "Duration probe failed");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Duration probe could not run");
                None
            }
        };

        self.lock().insert(path.to_path_buf(), seconds);
        seconds
    }

    /// mov/mp4 shorter than the live-photo threshold; an unknown duration is "not live"
    pub fn is_live_photo(&self, media: &MediaFile) -> bool {
        if !media.is_live_photo_candidate() {
            return false;
        }
        self.duration(media.path())
            .map(|d| d < LIVE_PHOTO_MAX_SECONDS)
            .unwrap_or(false)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Option<f64>>> {
        self.durations.lock().unwrap_or_else(|e| e.into_inner())
    }
}
