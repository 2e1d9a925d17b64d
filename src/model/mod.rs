//! Data model for sampled memory layouts.
//!
//! A [`Snapshot`] is one invocation of the sampling utility; it owns the
//! [`Region`]s parsed from that invocation, in the order they were printed.

mod region;
mod snapshot;

pub use region::{InvalidRange, Permissions, Region, SharingMode};
pub use snapshot::{CategoryTotals, Snapshot};
