//! Error reporting
//!
//! Per-file failures go to the ledger; what reaches this module stops at
//! least one directory. Reports go to stderr and to the log, with the full
//! cause chain.

use crate::app_error::AppError;
use std::error::Error;
use std::fmt;

/// How far an `AppError` reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The current directory is abandoned, the run goes on
    Recoverable,
    /// The run stops
    Fatal,
}

impl ErrorCategory {
    fn marker(self) -> &'static str {
        match self {
            ErrorCategory::Recoverable => "⚠️ ",
            ErrorCategory::Fatal => "🔥",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorCategory::Recoverable => "RECOVERABLE",
            ErrorCategory::Fatal => "FATAL",
        })
    }
}

/// Messages of `error.source()` and below, outermost first
pub fn cause_chain(error: &(dyn Error + 'static)) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = error.source();
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }
    causes
}

fn print_causes(causes: &[String]) {
    for (depth, cause) in causes.iter().enumerate() {
        eprintln!("   {}. Caused by: {}", depth + 1, cause);
    }
}

pub fn report_error(error: &AppError) {
    let category = error.category();
    let causes = cause_chain(error);

    eprintln!("{} [{}] {}", category.marker(), category, error);
    print_causes(&causes);
    tracing::error!(%category, causes = ?causes, "{}", error);
}

/// Top-level report for whatever `main` bubbles up
pub fn report_anyhow(error: &anyhow::Error) {
    let causes: Vec<String> = error.chain().skip(1).map(|e| e.to_string()).collect();

    eprintln!("{} ERROR: {}", ErrorCategory::Fatal.marker(), error);
    print_causes(&causes);
    tracing::error!(causes = ?causes, "{}", error);
}
