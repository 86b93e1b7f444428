//! `analyze`: read-only report over every ledger under a directory.

use crate::classifier::{classify, ErrorKind};
use crate::ledger::{Ledger, LedgerRow, LEDGER_SUFFIX};
use anyhow::{bail, Result};
use console::style;
use shared_utils::{format_percent, print_summary_box};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Samples shown per error kind
pub const SAMPLES_PER_KIND: usize = 3;

#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub ledgers: Vec<PathBuf>,
    pub total: usize,
    pub processed: usize,
    pub remediated: usize,
    /// Unprocessed rows grouped by kind: (media file, errors)
    pub failures: BTreeMap<ErrorKind, Vec<(PathBuf, String)>>,
    /// Ledgers that could not be parsed
    pub unreadable: Vec<(PathBuf, String)>,
}

impl AnalysisReport {
    fn add(&mut self, row: LedgerRow) {
        self.total += 1;
        if row.processed {
            self.processed += 1;
            if row.messages.starts_with("[remediated:") {
                self.remediated += 1;
            }
            return;
        }
        let kind = classify(Some(&row.errors)).kind;
        self.failures
            .entry(kind)
            .or_default()
            .push((row.media_file, row.errors));
    }

    pub fn unprocessed(&self) -> usize {
        self.failures.values().map(Vec::len).sum()
    }

    pub fn print(&self) {
        print_summary_box(
            "📊 Ledger analysis",
            &[
                ("Ledgers:", self.ledgers.len().to_string()),
                ("Files:", self.total.to_string()),
                ("✅ Processed:", self.processed.to_string()),
                ("🩹 Remediated:", self.remediated.to_string()),
                ("❌ Unprocessed:", self.unprocessed().to_string()),
                ("Success rate:", format_percent(self.processed, self.total)),
            ],
        );

        for (kind, rows) in &self.failures {
            println!();
            println!(
                "{} {} ({})",
                style("▸").red(),
                style(kind.as_str()).bold(),
                rows.len()
            );
            for (media, errors) in rows.iter().take(SAMPLES_PER_KIND) {
                println!("   {} → {}", media.display(), style(errors).dim());
            }
        }

        for (path, error) in &self.unreadable {
            println!("{} {}: {}", style("⚠️").yellow(), path.display(), error);
        }
    }
}

/// Every `*_output.csv` below `dir`, in lexical order
pub fn find_ledgers(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().ends_with(LEDGER_SUFFIX))
        .map(|e| e.path().to_path_buf())
        .collect()
}

pub fn analyze(dir: &Path) -> Result<AnalysisReport> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }

    let mut report = AnalysisReport::default();
    for path in find_ledgers(dir) {
        match Ledger::at(&path).read_all() {
            Ok(rows) => {
                for row in rows {
                    report.add(row);
                }
                report.ledgers.push(path);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable ledger");
                report.unreadable.push((path, e.to_string()));
            }
        }
    }
    Ok(report)
}
