// ============================================================================
// 🛠️ ExifTool invocation
// ============================================================================
//
// Everything that talks to the external metadata tool goes through the
// `MetadataTool` trait so the pipeline can be driven by a scripted fake in
// tests. `ExifTool` is the real implementation (blocking subprocess, no
// timeout: a hung exiftool hangs the caller).
//
// ============================================================================

use crate::app_error::AppError;
use crate::logging::{log_tool_run, ToolRun};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// Default executable name, looked up on PATH
pub const EXIFTOOL: &str = "exiftool";

/// Environment variable that overrides the executable location
pub const EXIFTOOL_ENV: &str = "EXIFTOOL";

/// Flags passed on every write invocation
pub const COMMON_OPTIONS: &[&str] = &[
    "-charset",
    "filename=UTF8",
    "-charset",
    "exif=UTF8",
    "-charset",
    "iptc=UTF8",
    "-P",
];

/// Downgrades minor errors (e.g. unparsable maker notes) to warnings
pub const IGNORE_MINOR_ERRORS: &str = "-m";

/// Captured result of one tool run
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ToolOutput {
    /// stderr then stdout, every line joined with "; " so it fits a CSV cell
    pub fn diagnostic(&self) -> String {
        let mut text = single_line(&self.stderr);
        let out = single_line(&self.stdout);
        if !out.is_empty() {
            if !text.is_empty() {
                text.push_str("; ");
            }
            text.push_str(&out);
        }
        text
    }
}

/// Collapse multi-line tool output into a single line
pub fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Seam between the pipeline and the external metadata editor
pub trait MetadataTool: Send + Sync {
    /// Executable name, used in logs
    fn program(&self) -> &str;

    /// Run the tool with `args`. `Err` only when the process could not be spawned;
    /// a non-zero exit is reported through `ToolOutput::success`.
    fn execute(&self, args: &[String]) -> io::Result<ToolOutput>;

    /// `tool -ver` preflight
    fn version(&self) -> Result<String, AppError> {
        let output = self
            .execute(&["-ver".to_string()])
            .map_err(|_| AppError::ToolNotFound {
                tool_name: self.program().to_string(),
            })?;
        if !output.success {
            return Err(AppError::ToolNotFound {
                tool_name: self.program().to_string(),
            });
        }
        Ok(output.stdout.trim().to_string())
    }
}

/// The real exiftool subprocess
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
    display_name: String,
}

impl ExifTool {
    /// Locate exiftool: `$EXIFTOOL` first, then PATH
    pub fn locate() -> Result<Self, AppError> {
        if let Some(custom) = std::env::var_os(EXIFTOOL_ENV) {
            let path = PathBuf::from(custom);
            if path.is_file() {
                return Ok(Self::with_program(path));
            }
            tracing::warn!(path = ?path, "{} does not point to a file, falling back to PATH", EXIFTOOL_ENV);
        }

        which::which(EXIFTOOL)
            .map(Self::with_program)
            .map_err(|_| AppError::ToolNotFound {
                tool_name: EXIFTOOL.to_string(),
            })
    }

    pub fn with_program(program: PathBuf) -> Self {
        let display_name = program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| EXIFTOOL.to_string());
        Self {
            program,
            display_name,
        }
    }

    pub fn path(&self) -> &Path {
        &self.program
    }
}

impl MetadataTool for ExifTool {
    fn program(&self) -> &str {
        &self.display_name
    }

    fn execute(&self, args: &[String]) -> io::Result<ToolOutput> {
        tracing::debug!(tool = %self.display_name, args = ?args, "Executing external command");

        let start = Instant::now();
        let output = Command::new(&self.program).args(args).output()?;
        let duration = start.elapsed();

        // exiftool prints filenames in whatever encoding the FS handed it
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let exit_code = output.status.code();

        log_tool_run(&ToolRun {
            tool: &self.display_name,
            args,
            exit_code,
            duration,
            output: if stderr.is_empty() { &stdout } else { &stderr },
        });

        Ok(ToolOutput {
            success: output.status.success(),
            exit_code,
            stdout,
            stderr,
            duration,
        })
    }
}

/// Arguments for a write: `<common> [extra] -o <dest> <assignments...> <src>`
pub fn write_args(
    source: &Path,
    destination: &Path,
    assignments: &[String],
    extra_flags: &[&str],
) -> Vec<String> {
    let mut args: Vec<String> = COMMON_OPTIONS.iter().map(|s| s.to_string()).collect();
    args.extend(extra_flags.iter().map(|s| s.to_string()));
    args.push("-o".to_string());
    args.push(destination.to_string_lossy().to_string());
    args.extend(assignments.iter().cloned());
    args.push(source.to_string_lossy().to_string());
    args
}

/// Arguments for the duration probe: `-duration <path>`
pub fn duration_args(path: &Path) -> Vec<String> {
    vec!["-duration".to_string(), path.to_string_lossy().to_string()]
}

/// Parse exiftool's `Duration : 2.53 s` line (also `0:01:05` for long clips)
pub fn parse_duration(stdout: &str) -> Option<f64> {
    let line = stdout
        .lines()
        .find(|l| l.trim_start().starts_with("Duration"))?;
    let value = line.split_once(':')?.1.trim();

    // "2.53 s" or "2.53 s (approx)"
    if let Some((seconds, _)) = value.split_once(" s") {
        return seconds.trim().parse::<f64>().ok();
    }

    // h:mm:ss[.frac]
    let parts: Vec<&str> = value.split_whitespace().next()?.split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hours: f64 = parts[0].parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}
