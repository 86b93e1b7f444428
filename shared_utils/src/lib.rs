//! Shared Utilities for album_fixer
//!
//! Plumbing that does not know about sidecars or error taxonomies:
//! - Logging (tracing + rolling file)
//! - ExifTool invocation behind the `MetadataTool` trait
//! - Destination copy primitives
//! - Directory enumeration and batch counters
//! - Unified error type and reporting
//! - Progress bars and summary reports

pub mod app_error;
pub mod batch;
pub mod error_handler;
pub mod exiftool;
pub mod file_copier;
pub mod logging;
pub mod progress;
pub mod report;

pub use app_error::AppError;
pub use batch::{collect_directories, extension_lowercase, has_extension, list_files, BatchResult};
pub use error_handler::{cause_chain, report_anyhow, report_error, ErrorCategory};
pub use exiftool::{ExifTool, MetadataTool, ToolOutput};
pub use file_copier::{
    copy_preserving_times, create_destination_dir, destination_path, ensure_destination,
    mirror_directory, same_contents, CopyOutcome,
};
pub use progress::create_progress_bar;
pub use report::{format_percent, print_error_list, print_summary_box};
