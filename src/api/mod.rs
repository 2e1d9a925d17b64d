//! Types handed across the host boundary.
//!
//! A [`SnapshotRecord`] is a flattened, self-contained copy of one snapshot:
//! addresses as hex strings, permissions as `r-x/rwx`, sharing mode as its
//! short code. It owns all of its data and serializes to JSON unchanged.

mod json;
mod record;

pub use json::JsonLinesSink;
pub use record::{RegionRecord, SnapshotRecord};
