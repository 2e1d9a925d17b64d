//! Parser for `vmmap`-style memory map reports.
//!
//! Pure functions: text in, typed regions out. A report mixes region lines with
//! headers, section markers, a legend and a summary table. Only region lines
//! carry an address range token (`HEX-HEX`), so that token is the anchor for
//! everything else: the category before it may contain spaces, and the columns
//! after it are located relative to it rather than by fixed offsets.
//!
//! ```text
//! MALLOC guard page   100000000-100004000 [ 16K  0K  0K  0K] ---/rwx SM=ZER
//! └── category ────┘  └── anchor ───────┘ └── sizes ───────┘ └ prot ┘ └ SM ┘ detail...
//! ```

use thiserror::Error;
use tracing::trace;

use crate::model::{Permissions, Region, SharingMode};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Why a single report line was rejected.
///
/// Never escapes [`parse`]; rejected lines are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no address range in line")]
    MissingAnchor,
    #[error("invalid address range '{0}'")]
    InvalidRange(String),
    #[error("missing '[ ... ]' size columns")]
    MissingBracket,
    #[error("expected 4 size columns, found {0}")]
    SizeColumns(usize),
    #[error("invalid size '{0}'")]
    InvalidSize(String),
}

/// Parses a full report into regions, in the order they appear.
///
/// Lines that are not region lines, or region lines that fail to decode, are
/// skipped. An input without any region line yields an empty vector.
pub fn parse(content: &str) -> Vec<Region> {
    let mut regions = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if !is_candidate(line) {
            continue;
        }
        match parse_region_line(line) {
            Ok(region) => regions.push(region),
            Err(e) => trace!(line = lineno + 1, error = %e, "skipping report line"),
        }
    }
    regions
}

/// Cheap pre-filter for lines that can never be region lines.
fn is_candidate(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    // "==== Writable regions for process 42", "===========  =======" dividers
    if trimmed.starts_with("==") {
        return false;
    }
    // Column headers of both the region list and the summary table.
    if trimmed.starts_with("REGION TYPE") {
        return false;
    }
    !trimmed
        .chars()
        .all(|c| matches!(c, '=' | '-' | '_' | ' ' | '\t'))
}

/// Parses one region line.
///
/// Format: `<category> <start>-<end> [ <vsize> <rsdnt> <dirty> <swap>] [<prt>/<max>] [SM=<mode>] [detail]`
pub fn parse_region_line(line: &str) -> Result<Region, ParseError> {
    let anchor = find_anchor(line).ok_or(ParseError::MissingAnchor)?;
    let category = line[..anchor.offset].trim().to_string();

    let (start_hex, end_hex) = anchor
        .token
        .split_once('-')
        .ok_or_else(|| ParseError::InvalidRange(anchor.token.to_string()))?;
    let start_address = u64::from_str_radix(start_hex, 16)
        .map_err(|_| ParseError::InvalidRange(anchor.token.to_string()))?;
    let end_address = u64::from_str_radix(end_hex, 16)
        .map_err(|_| ParseError::InvalidRange(anchor.token.to_string()))?;
    if start_address >= end_address {
        return Err(ParseError::InvalidRange(anchor.token.to_string()));
    }

    let rest = &line[anchor.offset + anchor.token.len()..];
    let open = rest.find('[').ok_or(ParseError::MissingBracket)?;
    let close = rest[open..]
        .find(']')
        .map(|idx| open + idx)
        .ok_or(ParseError::MissingBracket)?;

    let sizes: Vec<&str> = rest[open + 1..close].split_whitespace().collect();
    if sizes.len() != 4 {
        return Err(ParseError::SizeColumns(sizes.len()));
    }
    let virtual_size = parse_size(sizes[0])?;
    let resident_size = parse_size(sizes[1])?;
    let dirty_size = parse_size(sizes[2])?;
    let swap_size = parse_size(sizes[3])?;

    let mut tail = &rest[close + 1..];

    let (current_permissions, max_permissions) = match find_token(tail, is_protection_token) {
        Some((offset, token)) => {
            tail = &tail[offset + token.len()..];
            parse_protection(token)
        }
        None => (Permissions::NONE, Permissions::NONE),
    };

    let sharing_mode = match find_token(tail, |t| t.starts_with("SM=")) {
        Some((offset, token)) => {
            tail = &tail[offset + token.len()..];
            SharingMode::from_code(&token[3..]).unwrap_or_default()
        }
        None => SharingMode::default(),
    };

    let detail = tail.trim();
    let detail = (!detail.is_empty()).then(|| detail.to_string());

    Ok(Region {
        category,
        start_address,
        end_address,
        virtual_size,
        resident_size,
        dirty_size,
        swap_size,
        current_permissions,
        max_permissions,
        sharing_mode,
        detail,
    })
}

/// Parses a size token such as `824`, `512K`, `10.7M` or `2G` into bytes.
///
/// Suffixes are case-sensitive powers of 1024. The magnitude may carry one
/// fractional digit; the byte count is truncated. Anything else (empty
/// magnitude, lowercase units, deeper fractions, overflow) is an error.
pub fn parse_size(token: &str) -> Result<u64, ParseError> {
    let invalid = || ParseError::InvalidSize(token.to_string());

    let (magnitude, unit) = if let Some(num) = token.strip_suffix('G') {
        (num, GIB)
    } else if let Some(num) = token.strip_suffix('M') {
        (num, MIB)
    } else if let Some(num) = token.strip_suffix('K') {
        (num, KIB)
    } else {
        (token, 1)
    };

    let (whole, fraction) = match magnitude.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (magnitude, None),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let whole: u64 = whole.parse().map_err(|_| invalid())?;

    match fraction {
        None => whole.checked_mul(unit).ok_or_else(invalid),
        Some(fraction) => {
            let &[digit] = fraction.as_bytes() else {
                return Err(invalid());
            };
            if !digit.is_ascii_digit() {
                return Err(invalid());
            }
            // Work in tenths so that 10.7M is exact before truncation.
            let tenths = whole
                .checked_mul(10)
                .and_then(|t| t.checked_add(u64::from(digit - b'0')))
                .ok_or_else(invalid)?;
            tenths
                .checked_mul(unit)
                .map(|bytes| bytes / 10)
                .ok_or_else(invalid)
        }
    }
}

struct Anchor<'a> {
    offset: usize,
    token: &'a str,
}

/// Finds the first whitespace-delimited `HEX-HEX` token.
fn find_anchor(line: &str) -> Option<Anchor<'_>> {
    find_token(line, is_range_token).map(|(offset, token)| Anchor { offset, token })
}

fn is_range_token(token: &str) -> bool {
    match token.split_once('-') {
        Some((start, end)) => is_hex_run(start) && is_hex_run(end),
        None => false,
    }
}

fn is_hex_run(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// `rwx/rwx`-shaped token: two triples of `r`, `w`, `x` or `-` around a slash.
fn is_protection_token(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() == 7
        && bytes[3] == b'/'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 3 || matches!(b, b'r' | b'w' | b'x' | b'-'))
}

fn parse_protection(token: &str) -> (Permissions, Permissions) {
    let (current, max) = token.split_at(3);
    (
        Permissions::from_triple(current).unwrap_or(Permissions::NONE),
        Permissions::from_triple(&max[1..]).unwrap_or(Permissions::NONE),
    )
}

/// Returns the byte offset and text of the first whitespace-delimited token
/// in `s` that satisfies `pred`.
fn find_token(s: &str, pred: impl Fn(&str) -> bool) -> Option<(usize, &str)> {
    let mut start = None;
    for (idx, c) in s.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(from)) => {
                if pred(&s[from..idx]) {
                    return Some((from, &s[from..idx]));
                }
                start = None;
            }
            (false, None) => start = Some(idx),
            _ => {}
        }
    }
    let from = start?;
    pred(&s[from..]).then(|| (from, &s[from..]))
}
