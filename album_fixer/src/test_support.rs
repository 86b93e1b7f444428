//! Scripted stand-in for exiftool used by the unit tests.

use shared_utils::{MetadataTool, ToolOutput};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

struct FailureRule {
    needle: String,
    stderr: String,
    /// the rule does not fire when this flag is on the command line
    unless_flag: Option<String>,
}

/// Writes copy `src` to the `-o` target (refusing existing targets like the
/// real tool); durations come from a table keyed by file name.
#[derive(Default)]
pub struct FakeTool {
    durations: HashMap<String, f64>,
    failures: Vec<FailureRule>,
    missing: bool,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `execute` fails to spawn
    pub fn missing() -> Self {
        Self {
            missing: true,
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, file_name: &str, seconds: f64) -> Self {
        self.durations.insert(file_name.to_string(), seconds);
        self
    }

    /// Writes whose source path contains `needle` fail with `stderr`
    pub fn fail_when(mut self, needle: &str, stderr: &str) -> Self {
        self.failures.push(FailureRule {
            needle: needle.to_string(),
            stderr: stderr.to_string(),
            unless_flag: None,
        });
        self
    }

    pub fn fail_unless_flag(mut self, needle: &str, flag: &str, stderr: &str) -> Self {
        self.failures.push(FailureRule {
            needle: needle.to_string(),
            stderr: stderr.to_string(),
            unless_flag: Some(flag.to_string()),
        });
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn write_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c.iter().any(|a| a == "-o"))
            .collect()
    }

    pub fn probe_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.first().map(String::as_str) == Some("-duration"))
            .count()
    }

    fn write(&self, args: &[String]) -> ToolOutput {
        let out_idx = args.iter().position(|a| a == "-o").unwrap();
        let dest = PathBuf::from(&args[out_idx + 1]);
        let src = PathBuf::from(args.last().unwrap());

        for rule in &self.failures {
            let flagged = rule
                .unless_flag
                .as_ref()
                .map(|f| args.contains(f))
                .unwrap_or(false);
            if src.to_string_lossy().contains(&rule.needle) && !flagged {
                return failed(&rule.stderr);
            }
        }

        if dest.exists() {
            return failed(&format!(
                "Error: '{}' already exists - {}",
                dest.display(),
                src.display()
            ));
        }
        match std::fs::copy(&src, &dest) {
            Ok(_) => ToolOutput {
                success: true,
                exit_code: Some(0),
                stdout: "1 image files created".to_string(),
                ..Default::default()
            },
            Err(e) => failed(&format!("Error: {}", e)),
        }
    }
}

fn failed(stderr: &str) -> ToolOutput {
    ToolOutput {
        success: false,
        exit_code: Some(1),
        stderr: stderr.to_string(),
        stdout: "0 image files updated".to_string(),
        ..Default::default()
    }
}

impl MetadataTool for FakeTool {
    fn program(&self) -> &str {
        "fake-exiftool"
    }

    fn execute(&self, args: &[String]) -> io::Result<ToolOutput> {
        self.calls.lock().unwrap().push(args.to_vec());
        if self.missing {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not installed"));
        }

        match args.first().map(String::as_str) {
            Some("-ver") => Ok(ToolOutput {
                success: true,
                exit_code: Some(0),
                stdout: "12.76".to_string(),
                ..Default::default()
            }),
            Some("-duration") => {
                let name = PathBuf::from(&args[1])
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let stdout = self
                    .durations
                    .get(&name)
                    .map(|d| format!("Duration                        : {:.2} s", d))
                    .unwrap_or_default();
                Ok(ToolOutput {
                    success: true,
                    exit_code: Some(0),
                    stdout,
                    ..Default::default()
                })
            }
            _ => Ok(self.write(args)),
        }
    }
}
