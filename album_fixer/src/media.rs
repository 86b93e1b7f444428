//! Media file identity and the supported extension sets.

use shared_utils::{extension_lowercase, has_extension};
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "heic", "heif", "dng", "png", "gif", "bmp", "tiff", "tif", "webp",
];

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "avi", "mkv", "m4v", "3gp", "wmv", "mpg", "mpeg", "webm",
];

/// Only these are probed for the live-photo companion clip check
pub const LIVE_PHOTO_EXTENSIONS: &[&str] = &["mov", "mp4"];

/// Clips shorter than this are live-photo companions
pub const LIVE_PHOTO_MAX_SECONDS: f64 = 3.0;

pub const SIDECAR_EXTENSION: &str = "json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    path: PathBuf,
    extension: String,
    kind: MediaKind,
    live_photo: bool,
}

impl MediaFile {
    /// `None` when the extension is not a supported image/video type
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = extension_lowercase(path);
        let kind = if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            MediaKind::Image
        } else if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            MediaKind::Video
        } else {
            return None;
        };

        Some(Self {
            path: path.to_path_buf(),
            extension,
            kind,
            live_photo: false,
        })
    }

    pub fn with_live_photo(mut self, live_photo: bool) -> Self {
        self.live_photo = live_photo;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_live_photo(&self) -> bool {
        self.live_photo
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn is_live_photo_candidate(&self) -> bool {
        LIVE_PHOTO_EXTENSIONS.contains(&self.extension.as_str())
    }
}

pub fn is_sidecar(path: &Path) -> bool {
    has_extension(path, &[SIDECAR_EXTENSION])
}
