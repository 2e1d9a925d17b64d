//! vmtrail - offline memory map report.
//!
//! Reads saved `vmmap` outputs in the order given, prints a per-category
//! summary of the last one and the lifetime of every region across all of
//! them.
//!
//! Usage:
//!   vmtrail capture-*.txt            # summary + lifetimes
//!   vmtrail --top 5 a.txt b.txt      # only the five largest categories
//!   vmtrail --json a.txt b.txt       # machine-readable output

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{Level, debug, error, warn};
use tracing_subscriber::EnvFilter;

use vmtrail::report::{
    ReportJson, SnapshotSummaryJson, render_lifetimes, render_summary, snapshot_from_file,
};
use vmtrail::tracker::RegionTracker;
use vmtrail::util::MonotonicClock;

/// Offline memory map report.
#[derive(Parser)]
#[command(name = "vmtrail", about = "Summarize saved vmmap captures", version)]
struct Args {
    /// Saved captures, oldest first.
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Show only the N largest categories in the summary.
    #[arg(long, value_name = "N")]
    top: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber. Default level is WARN so the report is
/// not interleaved with progress messages.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("vmtrail={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let mut clock = MonotonicClock::new();
    let mut tracker = RegionTracker::new();
    let mut summaries = Vec::with_capacity(args.files.len());
    let mut last = None;

    for path in &args.files {
        let snapshot = match snapshot_from_file(path, &mut clock) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Error reading {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        };
        if snapshot.is_empty() {
            warn!("{}: no region lines found", path.display());
        }
        debug!("{}: {} regions", path.display(), snapshot.len());

        tracker.observe(&snapshot);
        summaries.push(SnapshotSummaryJson::new(path.display().to_string(), &snapshot));
        last = Some((path, snapshot));
    }

    let snapshot_count = tracker.snapshot_count();

    if args.json {
        let report = ReportJson {
            snapshots: summaries,
            regions: tracker.into_regions(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to encode report: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    if let Some((path, snapshot)) = &last {
        println!("Summary of {} ({} regions):", path.display(), snapshot.len());
        print!("{}", render_summary(snapshot, args.top));
    }
    println!(
        "\nRegion lifetimes across {} snapshots ({} regions):",
        snapshot_count,
        tracker.len()
    );
    print!("{}", render_lifetimes(tracker.regions(), snapshot_count));

    ExitCode::SUCCESS
}
