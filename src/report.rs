//! Offline reports over saved captures.
//!
//! A saved capture is the raw stdout of one `vmmap <pid>` run. Its timestamp
//! is the file's modification time.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::collector::parse;
use crate::fmt::{FmtStyle, format_bytes, format_percent, format_range};
use crate::model::{CategoryTotals, Snapshot};
use crate::tracker::TrackedRegion;
use crate::util::{MonotonicClock, epoch_millis};

/// Loads one saved capture as a snapshot.
///
/// Timestamps pass through `clock`, so a sequence of files loaded in order
/// never goes back in time even when their mtimes do.
pub fn snapshot_from_file(path: &Path, clock: &mut MonotonicClock) -> io::Result<Snapshot> {
    let content = fs::read_to_string(path)?;
    let modified = fs::metadata(path)?.modified()?;
    let timestamp = clock.observe(epoch_millis(modified));
    Ok(Snapshot::new(timestamp, parse(&content)))
}

/// Per-category summary of one snapshot, largest virtual size first.
pub fn render_summary(snapshot: &Snapshot, top: Option<usize>) -> String {
    let mut categories = snapshot.category_totals();
    categories.sort_by(|a, b| b.virtual_size.cmp(&a.virtual_size));
    if let Some(top) = top {
        categories.truncate(top);
    }
    let total = snapshot.totals();

    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<28} {:>8} {:>8} {:>8} {:>8} {:>6} {:>7}",
        "REGION TYPE", "VIRTUAL", "RESIDENT", "DIRTY", "SWAPPED", "COUNT", "RSDNT%"
    );
    let _ = writeln!(out, "  {}", "─".repeat(80));
    for totals in &categories {
        push_totals_row(&mut out, totals);
    }
    let _ = writeln!(out, "  {}", "─".repeat(80));
    push_totals_row(&mut out, &total);
    out
}

fn push_totals_row(out: &mut String, totals: &CategoryTotals) {
    let _ = writeln!(
        out,
        "  {:<28} {:>8} {:>8} {:>8} {:>8} {:>6} {:>7}",
        truncate(&totals.category, 28),
        format_bytes(totals.virtual_size, FmtStyle::Compact),
        format_bytes(totals.resident_size, FmtStyle::Compact),
        format_bytes(totals.dirty_size, FmtStyle::Compact),
        format_bytes(totals.swap_size, FmtStyle::Compact),
        totals.region_count,
        format_percent(totals.resident_size, totals.virtual_size),
    );
}

/// One line per tracked region: identity, first/last index and presence.
pub fn render_lifetimes(regions: &[TrackedRegion], snapshot_count: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<28} {:<37} {:>6} {:>6} {:>6}",
        "REGION TYPE", "START - END", "FIRST", "LAST", "SEEN"
    );
    let _ = writeln!(out, "  {}", "─".repeat(87));
    for region in regions {
        let _ = writeln!(
            out,
            "  {:<28} {:<37} {:>6} {:>6} {:>6}",
            truncate(&region.key.category, 28),
            format_range(region.key.start_address, region.key.end_address),
            region.first_seen_index,
            region.last_seen_index,
            format!("{}/{}", region.occurrences, snapshot_count),
        );
    }
    out
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(width.saturating_sub(1)).collect();
        t.push('…');
        t
    }
}

// ── JSON output types ────────────────────────────────────────────────────────

/// Machine-readable form of an offline run.
#[derive(Debug, Serialize)]
pub struct ReportJson {
    pub snapshots: Vec<SnapshotSummaryJson>,
    pub regions: Vec<TrackedRegion>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotSummaryJson {
    pub file: String,
    pub timestamp: i64,
    pub totals: CategoryTotals,
    pub categories: Vec<CategoryTotals>,
}

impl SnapshotSummaryJson {
    pub fn new(file: String, snapshot: &Snapshot) -> Self {
        Self {
            file,
            timestamp: snapshot.timestamp,
            totals: snapshot.totals(),
            categories: snapshot.category_totals(),
        }
    }
}
