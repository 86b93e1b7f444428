// ============================================================================
// 📸 album-fixer CLI
// ============================================================================
//
// Usage:
//   album-fixer process /exports/Takeout /photos/fixed --nested
//   album-fixer fix-errors /photos/fixed --nested
//   album-fixer analyze /photos
//   album-fixer info
//
// ============================================================================

use album_fixer::{analyze, FixerConfig, Orchestrator};
use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{report_anyhow, ExifTool, MetadataTool};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "album-fixer")]
#[command(version, about = "Write JSON sidecar metadata back into exported photos and videos", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory for log files (default: system temp dir)
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Hide progress bars
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(clap::Args)]
struct OffsetArgs {
    /// `exiftool -csv` export with OffsetTime* columns
    #[arg(long, value_name = "FILE")]
    offset_file: Option<PathBuf>,

    /// UTC offset for files missing from the offset file
    #[arg(long, value_name = "+HH:MM", default_value = album_fixer::config::DEFAULT_OFFSET_TIME, allow_hyphen_values = true)]
    default_offset: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Pair, write metadata and copy every media file into DEST
    Process {
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        #[arg(value_name = "DEST")]
        dest: PathBuf,

        /// Also process every subdirectory
        #[arg(short, long)]
        nested: bool,

        #[command(flatten)]
        offsets: OffsetArgs,

        /// Worker threads per directory
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,

        /// Leave failures for a later fix-errors pass
        #[arg(long)]
        no_remediate: bool,
    },

    /// Retry every unprocessed ledger row under DEST
    FixErrors {
        #[arg(value_name = "DEST")]
        dest: PathBuf,

        #[arg(short, long)]
        nested: bool,

        #[command(flatten)]
        offsets: OffsetArgs,

        #[arg(short, long, default_value_t = 1)]
        jobs: usize,
    },

    /// Summarize every *_output.csv ledger under CSV_DIR
    Analyze {
        #[arg(value_name = "CSV_DIR")]
        csv_dir: PathBuf,
    },

    /// Print version and metadata tool status
    Info,
}

fn main() {
    let cli = Cli::parse();

    let mut log_config = LogConfig::default().with_verbose(cli.verbose);
    if let Some(dir) = &cli.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    if let Err(e) = init_logging("album_fixer", log_config) {
        eprintln!("⚠️  Logging disabled: {:#}", e);
    }

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            report_anyhow(&e);
            std::process::exit(1);
        }
    }
}

/// `Ok(false)` when the run finished but something needs a non-zero exit
fn run(cli: Cli) -> Result<bool> {
    let show_progress = !cli.no_progress;

    match cli.command {
        Commands::Process {
            source,
            dest,
            nested,
            offsets,
            jobs,
            no_remediate,
        } => {
            let tool = locate_tool()?;
            let config = FixerConfig::new()
                .with_nested(nested)
                .with_jobs(jobs)
                .with_remediate_inline(!no_remediate)
                .with_default_offset(offsets.default_offset)
                .with_offset_file(offsets.offset_file)
                .with_progress(show_progress);

            print_target("Source", &source);
            print_target("Destination", &dest);
            let summary = Orchestrator::new(&tool, &config)?.process(&source, &dest)?;
            summary.print("📸 Process summary");
            Ok(!summary.has_directory_failures())
        }

        Commands::FixErrors {
            dest,
            nested,
            offsets,
            jobs,
        } => {
            let tool = locate_tool()?;
            let config = FixerConfig::new()
                .with_nested(nested)
                .with_jobs(jobs)
                .with_default_offset(offsets.default_offset)
                .with_offset_file(offsets.offset_file)
                .with_progress(show_progress);

            print_target("Destination", &dest);
            let summary = Orchestrator::new(&tool, &config)?.fix_errors(&dest)?;
            summary.print("🩹 Fix-errors summary");
            Ok(!summary.has_directory_failures())
        }

        Commands::Analyze { csv_dir } => {
            let report = analyze(&csv_dir)?;
            report.print();
            Ok(true)
        }

        Commands::Info => {
            println!(
                "{} {}",
                style(env!("CARGO_PKG_NAME")).cyan().bold(),
                env!("CARGO_PKG_VERSION")
            );
            let tool = locate_tool()?;
            let version = tool.version()?;
            println!("🔧 {} {} ({})", tool.program(), version, tool.path().display());
            Ok(true)
        }
    }
}

fn locate_tool() -> Result<ExifTool> {
    Ok(ExifTool::locate()?)
}

fn print_target(label: &str, path: &Path) {
    println!("📁 {}: {}", label, style(path.display()).cyan());
}
