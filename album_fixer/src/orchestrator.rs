// ============================================================================
// 🎬 Orchestrator
// ============================================================================
//
// process:    source dir(s) → pair → build → apply → [remediate] → ledger
// fix-errors: destination ledgers → classify → remediate → rewrite ledger
//
// Per-file failures are recorded in the ledger and never stop a directory.
// A directory-level failure (unreadable source, uncreatable destination,
// unwritable ledger) stops that directory only; the run continues and the
// summary reports it.
//
// ============================================================================

use crate::applier::MetadataApplier;
use crate::classifier::{classify, ErrorKind, NO_SIDECAR_DIAGNOSTIC};
use crate::config::FixerConfig;
use crate::ledger::{Ledger, LedgerRow};
use crate::metadata_builder::{FieldAssignment, MetadataBuilder};
use crate::offset_time::OffsetTimeTable;
use crate::pairing::{MatchKind, PairResolver, Pairing, SidecarLoad};
use crate::probe::MediaProbe;
use crate::remediation::{remediate, RemediationContext};
use crate::sidecar::SidecarRecord;
use anyhow::{Context, Result};
use rayon::prelude::*;
use shared_utils::{
    collect_directories, create_destination_dir, create_progress_bar, destination_path,
    ensure_destination, format_percent, mirror_directory, print_error_list, print_summary_box,
    report_error, AppError, BatchResult, MetadataTool,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Counters for one `process` or `fix-errors` run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub directories: usize,
    pub failed_directories: Vec<(PathBuf, String)>,
    /// succeeded = processed rows, failed = unprocessed rows, skipped = rows
    /// that were already processed before a fix pass
    pub files: BatchResult,
    pub remediated: usize,
    pub outstanding: BTreeMap<ErrorKind, usize>,
    /// How media files were paired (process only)
    pub matches: BTreeMap<MatchKind, usize>,
}

impl RunSummary {
    fn record(&mut self, row: &LedgerRow) {
        if row.processed {
            self.files.success();
            if row.messages.starts_with("[remediated:") {
                self.remediated += 1;
            }
        } else {
            self.files.fail(row.media_file.clone(), row.errors.clone());
            *self
                .outstanding
                .entry(classify(Some(&row.errors)).kind)
                .or_insert(0) += 1;
        }
    }

    pub fn has_directory_failures(&self) -> bool {
        !self.failed_directories.is_empty()
    }

    pub fn print(&self, title: &str) {
        let mut lines = vec![
            ("Directories:", self.directories.to_string()),
            ("Files:", self.files.total.to_string()),
            ("✅ Processed:", self.files.succeeded.to_string()),
            ("🩹 Remediated:", self.remediated.to_string()),
            ("❌ Unprocessed:", self.files.failed.to_string()),
        ];
        if self.files.skipped > 0 {
            lines.push(("⏭️  Already processed:", self.files.skipped.to_string()));
        }
        lines.push((
            "Success rate:",
            format_percent(self.files.succeeded, self.files.total - self.files.skipped),
        ));
        for (kind, count) in &self.matches {
            lines.push((kind.label(), count.to_string()));
        }
        for (kind, count) in &self.outstanding {
            lines.push((kind.as_str(), count.to_string()));
        }
        print_summary_box(title, &lines);

        let failed_dirs: Vec<(String, String)> = self
            .failed_directories
            .iter()
            .map(|(p, e)| (p.display().to_string(), e.clone()))
            .collect();
        print_error_list("❌ Directories aborted:", &failed_dirs, usize::MAX);
    }
}

pub struct Orchestrator<'a> {
    tool: &'a dyn MetadataTool,
    config: &'a FixerConfig,
    offsets: OffsetTimeTable,
    probe: MediaProbe<'a>,
    pool: Option<rayon::ThreadPool>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(tool: &'a dyn MetadataTool, config: &'a FixerConfig) -> Result<Self> {
        let offsets = match &config.offset_file {
            Some(path) => OffsetTimeTable::load(path, &config.default_offset)?,
            None => OffsetTimeTable::with_default(&config.default_offset),
        };

        let pool = if config.jobs > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.jobs)
                    .build()
                    .context("Failed to create worker pool")?,
            )
        } else {
            None
        };

        Ok(Self {
            tool,
            config,
            offsets,
            probe: MediaProbe::new(tool),
            pool,
        })
    }

    /// Version of the metadata tool; fails when it cannot be run
    pub fn preflight(&self) -> Result<String, AppError> {
        let version = self.tool.version()?;
        info!("🔧 {} {}", self.tool.program(), version);
        Ok(version)
    }

    // ========================================================================
    // process
    // ========================================================================

    pub fn process(&self, source: &Path, dest: &Path) -> Result<RunSummary> {
        self.preflight()?;
        if !source.is_dir() {
            return Err(AppError::DirectoryNotFound {
                path: source.to_path_buf(),
            }
            .into());
        }
        create_destination_dir(dest)?;

        let dest_canonical = dest.canonicalize().unwrap_or_else(|_| dest.to_path_buf());
        let mut summary = RunSummary::default();

        for dir in collect_directories(source, self.config.nested) {
            let canonical = dir.canonicalize().unwrap_or_else(|_| dir.clone());
            if canonical.starts_with(&dest_canonical) {
                debug!(dir = %dir.display(), "Skipping destination tree");
                continue;
            }

            let dest_dir = mirror_directory(source, dest, &dir);
            summary.directories += 1;
            if let Err(e) = self.process_directory(&dir, &dest_dir, &mut summary) {
                report_error(&e);
                summary.failed_directories.push((dir, e.to_string()));
            }
        }

        Ok(summary)
    }

    fn process_directory(
        &self,
        dir: &Path,
        dest_dir: &Path,
        summary: &mut RunSummary,
    ) -> Result<(), AppError> {
        if !dir.is_dir() {
            return Err(AppError::DirectoryNotFound {
                path: dir.to_path_buf(),
            });
        }
        let pairings = PairResolver::new(&self.probe).resolve(dir)?;
        if pairings.is_empty() {
            info!("📂 {}: no media files", dir.display());
            return Ok(());
        }
        info!("📂 {}: {} media files", dir.display(), pairings.len());
        for pairing in &pairings {
            *summary.matches.entry(pairing.matched_by).or_insert(0) += 1;
        }

        create_destination_dir(dest_dir)?;
        let ledger = Ledger::for_directory(dest_dir);
        ledger.reset()?;

        let pb = create_progress_bar(
            pairings.len() as u64,
            &display_name(dir),
            self.config.show_progress,
        );
        let rows = self.map_ordered(&pairings, |pairing| {
            let row = self.process_pairing(pairing, dest_dir);
            pb.inc(1);
            row
        });
        pb.finish_and_clear();

        for row in &rows {
            ledger.append(row)?;
            summary.record(row);
        }

        let processed = rows.iter().filter(|r| r.processed).count();
        info!(
            "✅ {}: {}/{} processed, ledger {}",
            dir.display(),
            processed,
            rows.len(),
            ledger.path().display()
        );
        Ok(())
    }

    /// Pair → build → apply, then remediate inline when configured
    pub fn process_pairing(&self, pairing: &Pairing, dest_dir: &Path) -> LedgerRow {
        let media = pairing.media.path();
        let json = pairing.sidecar.clone();

        let (row, assignments) = match pairing.load_record() {
            SidecarLoad::Parsed(record) => {
                let assignments = MetadataBuilder::new(&self.offsets).build(&record, media);
                let outcome = MetadataApplier::new(self.tool).apply(media, &assignments, dest_dir);
                let row = if outcome.success {
                    LedgerRow::processed(
                        media.to_path_buf(),
                        json,
                        outcome.destination,
                        outcome.messages,
                    )
                } else {
                    LedgerRow::failed(
                        media.to_path_buf(),
                        json,
                        outcome.destination,
                        outcome.diagnostic,
                    )
                };
                (row, assignments)
            }
            SidecarLoad::Absent => (
                pass_through(media, json, dest_dir, NO_SIDECAR_DIAGNOSTIC.to_string()),
                Vec::new(),
            ),
            SidecarLoad::Malformed(e) => {
                warn!("⚠️  {}", e);
                (
                    pass_through(media, json, dest_dir, format!("No metadata found: {}", e)),
                    Vec::new(),
                )
            }
        };

        if row.processed || !self.config.remediate_inline {
            return row;
        }
        self.remediate_row(row, dest_dir, &assignments)
    }

    // ========================================================================
    // fix-errors
    // ========================================================================

    pub fn fix_errors(&self, dest: &Path) -> Result<RunSummary> {
        self.preflight()?;
        if !dest.is_dir() {
            return Err(AppError::DirectoryNotFound {
                path: dest.to_path_buf(),
            }
            .into());
        }

        let mut summary = RunSummary::default();
        for dir in collect_directories(dest, self.config.nested) {
            if let Err(e) = self.fix_directory(&dir, &mut summary) {
                report_error(&e);
                summary.failed_directories.push((dir, e.to_string()));
            }
        }
        Ok(summary)
    }

    fn fix_directory(&self, dir: &Path, summary: &mut RunSummary) -> Result<(), AppError> {
        let ledger = Ledger::for_directory(dir);
        if !ledger.exists() {
            debug!(dir = %dir.display(), "No ledger, skipping");
            return Ok(());
        }
        let rows = ledger.read_all()?;
        summary.directories += 1;

        let pending = rows.iter().filter(|r| !r.processed).count();
        info!(
            "🩹 {}: {} of {} rows unprocessed",
            ledger.path().display(),
            pending,
            rows.len()
        );

        let pb = create_progress_bar(
            rows.len() as u64,
            &display_name(dir),
            self.config.show_progress,
        );
        let fixed = self.map_ordered(&rows, |row| {
            let updated = self.fix_row(row, dir);
            pb.inc(1);
            updated
        });
        pb.finish_and_clear();

        for (before, after) in rows.iter().zip(&fixed) {
            if before.processed {
                summary.files.skip();
            } else {
                summary.record(after);
            }
        }

        if fixed != rows {
            ledger.rewrite(&fixed)?;
        }
        Ok(())
    }

    /// Remediate one ledger row; processed rows come back unchanged
    pub fn fix_row(&self, row: &LedgerRow, dest_dir: &Path) -> LedgerRow {
        if row.processed {
            return row.clone();
        }
        let assignments = self.rebuild_assignments(row);
        self.remediate_row(row.clone(), dest_dir, &assignments)
    }

    fn rebuild_assignments(&self, row: &LedgerRow) -> Vec<FieldAssignment> {
        let Some(json) = &row.json_file else {
            return Vec::new();
        };
        match SidecarRecord::load(json) {
            Ok(record) => MetadataBuilder::new(&self.offsets).build(&record, &row.media_file),
            Err(e) => {
                debug!(error = %e, "Sidecar unavailable for remediation");
                Vec::new()
            }
        }
    }

    fn remediate_row(
        &self,
        mut row: LedgerRow,
        dest_dir: &Path,
        assignments: &[FieldAssignment],
    ) -> LedgerRow {
        let classification = classify(Some(&row.errors));
        let applier = MetadataApplier::new(self.tool);
        let result = {
            let ctx = RemediationContext {
                media: &row.media_file,
                dest_dir,
                classification: &classification,
                assignments,
                applier: &applier,
            };
            remediate(&ctx)
        };
        row.apply_remediation(classification.kind, &result);
        row
    }

    /// Map `items` in order, on the worker pool when one is configured
    fn map_ordered<T, F>(&self, items: &[T], f: F) -> Vec<LedgerRow>
    where
        T: Sync,
        F: Fn(&T) -> LedgerRow + Sync + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(|| items.par_iter().map(&f).collect()),
            None => items.iter().map(f).collect(),
        }
    }
}

/// Unpaired or unreadable sidecar: copy the original, record the failure
fn pass_through(
    media: &Path,
    json: Option<PathBuf>,
    dest_dir: &Path,
    mut diagnostic: String,
) -> LedgerRow {
    let destination = match ensure_destination(media, dest_dir) {
        Ok(outcome) => outcome.path().to_path_buf(),
        Err(e) => {
            diagnostic.push_str(&format!("; copy failed: {}", e));
            destination_path(media, dest_dir)
        }
    };
    LedgerRow::failed(media.to_path_buf(), json, destination, diagnostic)
}

fn display_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| dir.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTool;
    use std::fs;
    use tempfile::TempDir;

    struct Workspace {
        _temp: TempDir,
        source: PathBuf,
        dest: PathBuf,
    }

    fn workspace() -> Workspace {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("album");
        let dest = temp.path().join("fixed");
        fs::create_dir_all(&source).unwrap();
        Workspace {
            _temp: temp,
            source,
            dest,
        }
    }

    fn quiet() -> FixerConfig {
        FixerConfig::new().with_progress(false)
    }

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    const SIDECAR: &str = r#"{"title": "t", "photoTakenTime": {"timestamp": "1609459200"}}"#;

    #[test]
    fn test_every_media_file_gets_a_row_and_a_copy() {
        let ws = workspace();
        write(&ws.source, "a.jpg", "a");
        write(&ws.source, "a.jpg.json", SIDECAR);
        write(&ws.source, "b.png", "b");
        write(&ws.source, "c.heic", "c");
        write(&ws.source, "c.heic.json", SIDECAR);
        write(&ws.source, "notes.txt", "x");

        let tool = FakeTool::new().fail_when(
            "c.heic",
            "Error: Not a valid HEIC (looks more like a JPEG) - c.heic",
        );
        let config = quiet().with_remediate_inline(false);
        let orchestrator = Orchestrator::new(&tool, &config).unwrap();
        let summary = orchestrator.process(&ws.source, &ws.dest).unwrap();

        let rows = Ledger::for_directory(&ws.dest).read_all().unwrap();
        let names: Vec<String> = rows
            .iter()
            .map(|r| r.media_file.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.png", "c.heic"]);

        assert!(rows[0].processed);
        assert!(rows[0].errors.is_empty());
        assert!(!rows[1].processed);
        assert_eq!(rows[1].errors, "No JSON file found.");
        assert!(rows[1].json_file.is_none());
        assert!(!rows[2].processed);
        assert!(rows[2].errors.contains("Not a valid HEIC"));

        for name in ["a.jpg", "b.png", "c.heic"] {
            assert!(ws.dest.join(name).is_file(), "{} missing", name);
        }
        assert!(!ws.dest.join("notes.txt").exists());
        assert_eq!(summary.matches[&MatchKind::Exact], 2);
        assert_eq!(summary.matches[&MatchKind::Unmatched], 1);
        assert_eq!(summary.files.succeeded, 1);
        assert_eq!(summary.files.failed, 2);
        assert!(!summary.has_directory_failures());
    }

    #[test]
    fn test_inline_remediation_fixes_extension() {
        let ws = workspace();
        write(&ws.source, "c.heic", "c");
        write(&ws.source, "c.heic.json", SIDECAR);
        let tool = FakeTool::new().fail_when(
            "c.heic",
            "Error: Not a valid HEIC (looks more like a JPEG) - c.heic",
        );
        let config = quiet();
        let summary = Orchestrator::new(&tool, &config)
            .unwrap()
            .process(&ws.source, &ws.dest)
            .unwrap();

        let rows = Ledger::for_directory(&ws.dest).read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].processed);
        assert!(rows[0].errors.is_empty());
        assert!(rows[0]
            .messages
            .starts_with("[remediated:incorrect_extension] Updated file extension from HEIC to JPEG"));
        assert_eq!(rows[0].destination_file, ws.dest.join("c.jpeg"));
        assert!(ws.dest.join("c.jpeg").is_file());
        assert_eq!(summary.remediated, 1);
    }

    #[test]
    fn test_fix_errors_is_idempotent() {
        let ws = workspace();
        write(&ws.source, "a.jpg", "a");
        write(&ws.source, "a.jpg.json", SIDECAR);
        write(&ws.source, "b.png", "b");
        write(&ws.source, "c.jpg", "c");
        write(&ws.source, "c.jpg.json", SIDECAR);

        let tool = FakeTool::new().fail_unless_flag(
            "c.jpg",
            "-m",
            "Error: [minor] Maker notes could not be parsed - c.jpg",
        );
        let config = quiet().with_remediate_inline(false);
        let orchestrator = Orchestrator::new(&tool, &config).unwrap();
        orchestrator.process(&ws.source, &ws.dest).unwrap();

        let ledger = Ledger::for_directory(&ws.dest);
        let before = ledger.read_all().unwrap();
        assert!(!before[2].processed);

        let first = orchestrator.fix_errors(&ws.dest).unwrap();
        let after_first = ledger.read_all().unwrap();
        assert_eq!(after_first[0], before[0]);
        assert!(after_first[2].processed);
        assert!(after_first[2].messages.starts_with("[remediated:maker_notes] Fixed maker notes issue"));
        assert!(!after_first[1].processed);
        assert!(after_first[1].messages.starts_with("[attempted:missing_metadata]"));
        assert_eq!(first.files.skipped, 1);
        assert_eq!(first.remediated, 1);

        let text_first = fs::read_to_string(ledger.path()).unwrap();
        orchestrator.fix_errors(&ws.dest).unwrap();
        assert_eq!(fs::read_to_string(ledger.path()).unwrap(), text_first);
    }

    #[test]
    fn test_file_exists_on_rerun() {
        let ws = workspace();
        write(&ws.source, "a.jpg", "a");
        write(&ws.source, "a.jpg.json", SIDECAR);
        let tool = FakeTool::new();
        let config = quiet();
        let orchestrator = Orchestrator::new(&tool, &config).unwrap();
        orchestrator.process(&ws.source, &ws.dest).unwrap();
        orchestrator.process(&ws.source, &ws.dest).unwrap();

        let rows = Ledger::for_directory(&ws.dest).read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].processed);
        assert!(rows[0]
            .messages
            .starts_with("[remediated:file_exists] File already exists in destination: a.jpg"));
    }

    #[test]
    fn test_malformed_sidecar_is_missing_metadata() {
        let ws = workspace();
        write(&ws.source, "a.jpg", "a");
        write(&ws.source, "a.jpg.json", "{broken");
        let tool = FakeTool::new();
        let config = quiet();
        Orchestrator::new(&tool, &config)
            .unwrap()
            .process(&ws.source, &ws.dest)
            .unwrap();

        let rows = Ledger::for_directory(&ws.dest).read_all().unwrap();
        assert!(!rows[0].processed);
        assert!(rows[0].errors.starts_with("No metadata found: "));
        assert!(rows[0].json_file.is_some());
        assert!(ws.dest.join("a.jpg").is_file());
        assert!(tool.write_calls().is_empty());
    }

    #[test]
    fn test_empty_sidecar_copies_without_tool() {
        let ws = workspace();
        write(&ws.source, "a.jpg", "a");
        write(&ws.source, "a.jpg.json", "{}");
        let tool = FakeTool::new();
        let config = quiet();
        Orchestrator::new(&tool, &config)
            .unwrap()
            .process(&ws.source, &ws.dest)
            .unwrap();

        let rows = Ledger::for_directory(&ws.dest).read_all().unwrap();
        assert!(rows[0].processed);
        assert!(tool.write_calls().is_empty());
    }

    #[test]
    fn test_nested_directories_are_mirrored() {
        let ws = workspace();
        let trip = ws.source.join("2021").join("trip");
        fs::create_dir_all(&trip).unwrap();
        write(&ws.source, "top.jpg", "t");
        write(&trip, "deep.jpg", "d");
        write(&trip, "deep.jpg.json", SIDECAR);

        let tool = FakeTool::new();
        let config = quiet().with_nested(true);
        let summary = Orchestrator::new(&tool, &config)
            .unwrap()
            .process(&ws.source, &ws.dest)
            .unwrap();

        assert!(ws.dest.join("top.jpg").is_file());
        assert!(ws.dest.join("2021/trip/deep.jpg").is_file());
        let rows = Ledger::for_directory(&ws.dest.join("2021/trip")).read_all().unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].processed);
        assert_eq!(summary.files.total, 2);
    }

    #[test]
    fn test_parallel_rows_keep_listing_order() {
        let ws = workspace();
        for i in 0..12 {
            write(&ws.source, &format!("img_{:02}.jpg", i), "x");
            write(&ws.source, &format!("img_{:02}.jpg.json", i), SIDECAR);
        }
        let tool = FakeTool::new();
        let config = quiet().with_jobs(4);
        Orchestrator::new(&tool, &config)
            .unwrap()
            .process(&ws.source, &ws.dest)
            .unwrap();

        let rows = Ledger::for_directory(&ws.dest).read_all().unwrap();
        let names: Vec<String> = rows
            .iter()
            .map(|r| r.media_file.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(rows.iter().all(|r| r.processed));
    }

    #[test]
    fn test_missing_tool_aborts_before_touching_destination() {
        let ws = workspace();
        write(&ws.source, "a.jpg", "a");
        let tool = FakeTool::missing();
        let config = quiet();
        let err = Orchestrator::new(&tool, &config)
            .unwrap()
            .process(&ws.source, &ws.dest)
            .unwrap_err();
        assert!(err.to_string().contains("Tool not found"));
        assert!(!ws.dest.exists());
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let ws = workspace();
        let tool = FakeTool::new();
        let config = quiet();
        let result = Orchestrator::new(&tool, &config)
            .unwrap()
            .process(&ws.source.join("nope"), &ws.dest);
        assert!(result.is_err());
    }

    #[test]
    fn test_uncreatable_destination_dir_aborts_only_that_directory() {
        let ws = workspace();
        let sub = ws.source.join("sub");
        fs::create_dir_all(&sub).unwrap();
        write(&ws.source, "top.jpg", "t");
        write(&sub, "a.jpg", "a");
        fs::create_dir_all(&ws.dest).unwrap();
        // a regular file where the mirrored directory should go
        fs::write(ws.dest.join("sub"), b"blocker").unwrap();

        let tool = FakeTool::new();
        let config = quiet().with_nested(true);
        let summary = Orchestrator::new(&tool, &config)
            .unwrap()
            .process(&ws.source, &ws.dest)
            .unwrap();

        assert!(summary.has_directory_failures());
        assert_eq!(summary.failed_directories[0].0, sub);
        assert!(ws.dest.join("top.jpg").is_file());
    }

    #[test]
    fn test_offset_file_is_used() {
        let ws = workspace();
        write(&ws.source, "a.jpg", "a");
        write(&ws.source, "a.jpg.json", SIDECAR);
        let offsets = ws.source.parent().unwrap().join("offsets.csv");
        fs::write(
            &offsets,
            "SourceFile,OffsetTime,OffsetTimeOriginal,OffsetTimeDigitized\na.jpg,+09:00,+09:00,+09:00\n",
        )
        .unwrap();

        let tool = FakeTool::new();
        let config = quiet().with_offset_file(Some(offsets));
        Orchestrator::new(&tool, &config)
            .unwrap()
            .process(&ws.source, &ws.dest)
            .unwrap();

        let args = &tool.write_calls()[0];
        assert!(args.contains(&"-DateTimeOriginal=2021:01:01 09:00:00".to_string()));
    }
}
