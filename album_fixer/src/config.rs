//! Resolved run options, filled from the CLI and passed by reference to the
//! orchestrator.

use std::path::PathBuf;

pub const DEFAULT_OFFSET_TIME: &str = "+00:00";

#[derive(Debug, Clone)]
pub struct FixerConfig {
    /// Walk every subdirectory of the source (or destination for `fix-errors`)
    pub nested: bool,
    /// Run the remediation step right after a failed write
    pub remediate_inline: bool,
    /// Worker threads for the per-file apply step; 1 = strictly sequential
    pub jobs: usize,
    /// UTC offset used when the offset table has no entry for a file
    pub default_offset: String,
    /// Optional `exiftool -csv` export with per-file offsets
    pub offset_file: Option<PathBuf>,
    pub show_progress: bool,
}

impl Default for FixerConfig {
    fn default() -> Self {
        Self {
            nested: false,
            remediate_inline: true,
            jobs: 1,
            default_offset: DEFAULT_OFFSET_TIME.to_string(),
            offset_file: None,
            show_progress: true,
        }
    }
}

impl FixerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nested(mut self, nested: bool) -> Self {
        self.nested = nested;
        self
    }

    pub fn with_remediate_inline(mut self, remediate: bool) -> Self {
        self.remediate_inline = remediate;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_default_offset(mut self, offset: impl Into<String>) -> Self {
        self.default_offset = offset.into();
        self
    }

    pub fn with_offset_file(mut self, path: Option<PathBuf>) -> Self {
        self.offset_file = path;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }
}
