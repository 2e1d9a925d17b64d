//! Shared formatting helpers for reports and boundary records.
//!
//! Functions that differ between compact table columns and verbose log or
//! summary lines are parameterized via [`FmtStyle`].

use crate::model::Permissions;

/// Controls compact (table columns) vs verbose (summaries) output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmtStyle {
    /// Compact: no spaces, short suffixes ("1.5G")
    Compact,
    /// Detail: spaces, full suffixes ("1.5 GiB")
    Detail,
}

/// Format byte count as human-readable size.
///
/// Compact: `"1.5G"`, `"100.3M"`, `"50.0K"`, `"512B"`
/// Detail:  `"1.5 GiB"`, `"100.3 MiB"`, `"50.0 KiB"`, `"512 B"`
pub fn format_bytes(bytes: u64, style: FmtStyle) -> String {
    let (g, m, k, b) = match style {
        FmtStyle::Compact => ("G", "M", "K", "B"),
        FmtStyle::Detail => (" GiB", " MiB", " KiB", " B"),
    };
    let f = bytes as f64;
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.1}{}", f / (1024.0 * 1024.0 * 1024.0), g)
    } else if bytes >= 1024 * 1024 {
        format!("{:.1}{}", f / (1024.0 * 1024.0), m)
    } else if bytes >= 1024 {
        format!("{:.1}{}", f / 1024.0, k)
    } else {
        format!("{}{}", bytes, b)
    }
}

/// Format an address as `0x`-prefixed lowercase hex.
pub fn format_address(addr: u64) -> String {
    format!("{:#x}", addr)
}

/// Format an address range the way the sampling utility prints it.
pub fn format_range(start: u64, end: u64) -> String {
    format!("{:x}-{:x}", start, end)
}

/// Format current and maximum permissions as `"r-x/rwx"`.
pub fn format_protection(current: Permissions, max: Permissions) -> String {
    format!("{}/{}", current, max)
}

/// Format a count relative to a total as a percentage, `"-"` when the total
/// is zero.
pub fn format_percent(part: u64, total: u64) -> String {
    if total == 0 {
        return "-".to_string();
    }
    format!("{:.0}%", part as f64 * 100.0 / total as f64)
}
