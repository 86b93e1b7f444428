//! Progress bars
//!
//! One bar style for every command: ████████▓░░░░░░░

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// indicatif wants (filled, current, empty)
pub const PROGRESS_CHARS: &str = "█▓░";

pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

pub const BATCH_TEMPLATE: &str = "{spinner:.green} {prefix:.cyan.bold} ▕{bar:35.green/black}▏ {percent:>3}% • {pos}/{len} • ⏱️ {elapsed_precise} • {msg}";

/// Bar over `total` items; `visible = false` gives a hidden bar with the same API
pub fn create_progress_bar(total: u64, prefix: &str, visible: bool) -> ProgressBar {
    let pb = ProgressBar::new(total);

    if !visible {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }

    let style = ProgressStyle::default_bar()
        .template(BATCH_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(PROGRESS_CHARS)
        .tick_chars(SPINNER_CHARS);
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
    pb
}
