//! Report Module
//!
//! Boxed summary output shared by the `process`, `fix-errors` and `analyze`
//! commands.

use console::style;

const BOX_WIDTH: usize = 58;

/// Print a titled box of `label: value` lines
pub fn print_summary_box(title: &str, lines: &[(&str, String)]) {
    let bar = "═".repeat(BOX_WIDTH);
    println!();
    println!("╔{}╗", bar);
    println!("║ {:<width$}║", title, width = BOX_WIDTH - 1);
    println!("╠{}╣", bar);
    for (label, value) in lines {
        let text = format!("{:<26}{:>12}", label, value);
        println!("║  {:<width$}║", text, width = BOX_WIDTH - 2);
    }
    println!("╚{}╝", bar);
}

/// Print `path → message` pairs under a red heading, capped at `limit`
pub fn print_error_list(heading: &str, errors: &[(String, String)], limit: usize) {
    if errors.is_empty() {
        return;
    }
    println!();
    println!("{}", style(heading).red().bold());
    for (path, message) in errors.iter().take(limit) {
        println!("   {} → {}", path, style(message).dim());
    }
    if errors.len() > limit {
        println!("   ... and {} more", errors.len() - limit);
    }
}

pub fn format_percent(part: usize, total: usize) -> String {
    if total == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", part as f64 / total as f64 * 100.0)
}
