//! AppError - unified error type for fatal, directory-level conditions
//!
//! Per-file failures never become an `AppError`: they are recorded in the
//! ledger instead. Only conditions that stop a whole directory (or the run)
//! are expressed here.

use crate::error_handler::ErrorCategory;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Tool not found: {tool_name} (install it and make sure it is on PATH)")]
    ToolNotFound { tool_name: String },

    #[error("Directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger error at {}: {message}", path.display())]
    Ledger { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::ToolNotFound { .. } => ErrorCategory::Fatal,
            AppError::DirectoryNotFound { .. } | AppError::DirectoryCreate { .. } => {
                ErrorCategory::Recoverable
            }
            AppError::Ledger { .. } => ErrorCategory::Recoverable,
            AppError::Io(_) => ErrorCategory::Fatal,
        }
    }

    pub fn ledger(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        AppError::Ledger {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
