//! vmtraild - live memory map sampler.
//!
//! Runs `vmmap <pid>` at a fixed interval and writes every snapshot to stdout
//! as one JSON object per line. Logs go to stderr.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Releases unused memory back to the operating system.
/// Every capture allocates and frees up to `--max-output` bytes on the
/// sampling thread; purging keeps those pages from piling up in RSS.
fn release_memory_to_os() {
    // SAFETY: We're calling jemalloc's mallctl with valid arguments.
    // Arena index 4096 (MALLCTL_ARENAS_ALL) purges every arena, including the
    // one serving the sampling thread.
    unsafe {
        tikv_jemalloc_sys::mallctl(
            c"arena.4096.purge".as_ptr().cast(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            0,
        );
    }
}

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use vmtrail::api::JsonLinesSink;
use vmtrail::collector::{ChannelSink, CommandCapture, DeliveryError};
use vmtrail::config::{
    CaptureConfig, CollectorConfig, DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_PROGRAM, HistoryPolicy,
    parse_size_arg,
};
use vmtrail::fmt::{FmtStyle, format_bytes};
use vmtrail::handle::CollectorHandle;

/// How often the main loop re-checks the shutdown flag while waiting.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Memory is purged after every this many written snapshots.
const RELEASE_EVERY: u64 = 60;

fn should_release_memory(written: u64) -> bool {
    written > 0 && written.is_multiple_of(RELEASE_EVERY)
}

/// Live memory map sampler.
#[derive(Parser)]
#[command(name = "vmtraild", about = "Live memory map sampler", version)]
struct Args {
    /// Process to sample.
    #[arg(short, long)]
    pid: i64,

    /// Sampling interval in milliseconds.
    #[arg(short, long, env = "VMTRAIL_INTERVAL_MS", default_value = "1000")]
    interval_ms: i64,

    /// Sampling utility, invoked as `<command> <pid>`.
    #[arg(long, env = "VMTRAIL_COMMAND", default_value = DEFAULT_PROGRAM)]
    command: PathBuf,

    /// Maximum accepted output per capture (e.g., "10M", "512K").
    #[arg(long, value_parser = parse_size_arg, default_value_t = DEFAULT_MAX_OUTPUT_BYTES)]
    max_output: usize,

    /// Exit after this many snapshots have been written.
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Keep up to this many snapshots in memory (logged on shutdown).
    #[arg(long)]
    history: Option<usize>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["vmtraild", "vmtrail"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let config = match CollectorConfig::from_raw(args.pid, args.interval_ms) {
        Ok(config) => config.with_history(
            args.history
                .map(HistoryPolicy::Limit)
                .unwrap_or(HistoryPolicy::Disabled),
        ),
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };
    let capture = CommandCapture::new(&CaptureConfig {
        program: args.command.clone(),
        max_output_bytes: args.max_output,
    });

    info!("vmtraild {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: pid={}, interval={}ms, command={}, max_output={}",
        config.pid,
        config.interval.as_millis(),
        capture.program().display(),
        format_bytes(args.max_output as u64, FmtStyle::Compact)
    );

    let (sink, rx) = ChannelSink::channel();
    let mut handle = CollectorHandle::with_capture(config, capture, sink);

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    if let Err(e) = handle.start() {
        error!("Failed to start collector: {}", e);
        return ExitCode::FAILURE;
    }

    let mut out = JsonLinesSink::new(io::stdout());
    let mut exit = ExitCode::SUCCESS;

    while running.load(Ordering::SeqCst) {
        let snapshot = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(snapshot) => snapshot,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                error!("Collector went away");
                exit = ExitCode::FAILURE;
                break;
            }
        };

        let totals = snapshot.totals();
        debug!(
            "Snapshot: {} regions, virtual={}, resident={}, dirty={}, swapped={}",
            totals.region_count,
            format_bytes(totals.virtual_size, FmtStyle::Compact),
            format_bytes(totals.resident_size, FmtStyle::Compact),
            format_bytes(totals.dirty_size, FmtStyle::Compact),
            format_bytes(totals.swap_size, FmtStyle::Compact),
        );

        match out.write_snapshot(&snapshot) {
            Ok(()) => {}
            Err(DeliveryError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                info!("Output closed");
                break;
            }
            Err(e) => warn!("Failed to write snapshot: {}", e),
        }
        drop(snapshot);

        if should_release_memory(out.written()) {
            release_memory_to_os();
            debug!("Memory released after {} snapshots", out.written());
        }

        if args.count.is_some_and(|count| out.written() >= count) {
            break;
        }
    }

    info!("Shutting down...");
    handle.stop();
    if let Some(collector) = handle.collector() {
        info!(
            "Delivered {} snapshots, {} failed captures, {} retained",
            collector.snapshot_count(),
            collector.failure_count(),
            collector.history_len()
        );
    }
    handle.destroy();

    info!("Shutdown complete");
    exit
}
