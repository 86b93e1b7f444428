//! Logging
//!
//! One `tracing` subscriber per process, two outputs:
//! - `<dir>/<program>.log.YYYY-MM-DD`, rotated daily, no colors
//! - stderr for the operator
//!
//! `RUST_LOG` wins over the configured level when set.
//!
//! ```no_run
//! use shared_utils::logging::{init_logging, LogConfig};
//!
//! init_logging("album_fixer", LogConfig::default().with_verbose(true)).ok();
//! tracing::info!("ready");
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `None` = system temp dir
    pub log_dir: Option<PathBuf>,
    /// Rotated files kept per program
    pub keep_files: usize,
    pub level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            keep_files: 7,
            level: Level::INFO,
        }
    }
}

impl LogConfig {
    pub fn with_log_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.log_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_max_files(mut self, keep: usize) -> Self {
        self.keep_files = keep.max(1);
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// `--verbose`: DEBUG, otherwise the level is left alone
    pub fn with_verbose(self, verbose: bool) -> Self {
        match verbose {
            true => self.with_level(Level::DEBUG),
            false => self,
        }
    }

    pub fn resolved_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Filter used when `RUST_LOG` is unset
fn default_directives(program: &str, level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,{program}={level},shared_utils={level}")
}

/// Install the global subscriber; fails if one is already installed
pub fn init_logging(program: &str, config: LogConfig) -> Result<()> {
    let dir = config.resolved_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Cannot create log directory {}", dir.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(program, config.level)));

    let file = RollingFileAppender::new(Rotation::DAILY, &dir, format!("{program}.log"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_line_number(true),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    let removed = prune_logs(&dir, program, config.keep_files)
        .with_context(|| format!("Cannot prune logs in {}", dir.display()))?;
    tracing::debug!(dir = %dir.display(), removed, "Logging to file");
    Ok(())
}

/// Delete all but the newest `keep` rotated files of `program`.
/// Daily rotation suffixes (`.YYYY-MM-DD`) sort chronologically by name.
fn prune_logs(dir: &Path, program: &str, keep: usize) -> std::io::Result<usize> {
    let prefix = format!("{program}.log");
    let mut rotated: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with(&prefix))
        })
        .collect();

    rotated.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut removed = 0;
    for stale in rotated.iter().skip(keep) {
        match std::fs::remove_file(stale) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!(path = %stale.display(), error = %e, "Cannot remove old log"),
        }
    }
    Ok(removed)
}

/// One finished external tool run
pub struct ToolRun<'a> {
    pub tool: &'a str,
    pub args: &'a [String],
    pub exit_code: Option<i32>,
    pub duration: Duration,
    /// stderr, or stdout when stderr was empty
    pub output: &'a str,
}

/// Command line at DEBUG; failures at WARN, killed processes at ERROR
pub fn log_tool_run(run: &ToolRun) {
    let command = format!("{} {}", run.tool, run.args.join(" "));
    let millis = run.duration.as_millis() as u64;

    match run.exit_code {
        Some(0) => tracing::debug!(%command, millis, "{} ok", run.tool),
        Some(code) => tracing::warn!(
            %command,
            millis,
            code,
            output = %run.output,
            "{} exited with {}",
            run.tool,
            code
        ),
        None => tracing::error!(
            %command,
            millis,
            output = %run.output,
            "{} was terminated by a signal",
            run.tool
        ),
    }
}
