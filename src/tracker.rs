//! Cross-snapshot region identity.
//!
//! A region is identified by its category and exact address range. Any change
//! to either bound produces a new identity, so a heap zone that grows shows up
//! as one region ending and another beginning.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::model::{Region, Snapshot};

/// Identity of a region across snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionKey {
    pub category: String,
    pub start_address: u64,
    pub end_address: u64,
}

impl RegionKey {
    pub fn of(region: &Region) -> Self {
        Self {
            category: region.category().to_string(),
            start_address: region.start_address(),
            end_address: region.end_address(),
        }
    }

    /// Stable 64-bit hash of the identity.
    pub fn id(&self) -> u64 {
        let mut buf = Vec::with_capacity(self.category.len() + 17);
        buf.extend_from_slice(self.category.as_bytes());
        buf.push(0);
        buf.extend_from_slice(&self.start_address.to_le_bytes());
        buf.extend_from_slice(&self.end_address.to_le_bytes());
        xxh3_64(&buf)
    }
}

/// A region identity and the span of snapshots it was observed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRegion {
    pub key: RegionKey,
    pub id: u64,
    /// Index of the first snapshot containing this region.
    pub first_seen_index: usize,
    /// Index of the last snapshot containing this region.
    pub last_seen_index: usize,
    /// Number of snapshots containing this region.
    pub occurrences: usize,
}

impl TrackedRegion {
    fn new(key: RegionKey, index: usize) -> Self {
        Self {
            id: key.id(),
            key,
            first_seen_index: index,
            last_seen_index: index,
            occurrences: 1,
        }
    }

    /// Number of snapshots between first and last sighting, inclusive.
    pub fn lifetime(&self) -> usize {
        self.last_seen_index - self.first_seen_index + 1
    }

    /// Whether snapshot `index` falls within the observed span.
    pub fn alive_at(&self, index: usize) -> bool {
        (self.first_seen_index..=self.last_seen_index).contains(&index)
    }

    /// True when the region was present in every snapshot of its span.
    pub fn is_continuous(&self) -> bool {
        self.occurrences == self.lifetime()
    }
}

/// Incremental fold over an ordered snapshot sequence.
///
/// Snapshots must be observed in capture order; indices are assigned from 0
/// in the order `observe` is called.
#[derive(Debug, Default)]
pub struct RegionTracker {
    regions: Vec<TrackedRegion>,
    index: HashMap<RegionKey, usize>,
    snapshots: usize,
}

impl RegionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds the next snapshot into the tracked set.
    pub fn observe(&mut self, snapshot: &Snapshot) {
        let snapshot_index = self.snapshots;
        self.snapshots += 1;

        for region in &snapshot.regions {
            let key = RegionKey::of(region);
            match self.index.get(&key) {
                Some(&pos) => {
                    let tracked = &mut self.regions[pos];
                    // Duplicate lines in one report count once.
                    if tracked.last_seen_index != snapshot_index {
                        tracked.last_seen_index = snapshot_index;
                        tracked.occurrences += 1;
                    }
                }
                None => {
                    self.index.insert(key.clone(), self.regions.len());
                    self.regions.push(TrackedRegion::new(key, snapshot_index));
                }
            }
        }
    }

    /// Tracked regions in order of first appearance.
    pub fn regions(&self) -> &[TrackedRegion] {
        &self.regions
    }

    pub fn get(&self, key: &RegionKey) -> Option<&TrackedRegion> {
        self.index.get(key).map(|&pos| &self.regions[pos])
    }

    /// Regions whose observed span covers snapshot `index`.
    pub fn alive_at(&self, index: usize) -> impl Iterator<Item = &TrackedRegion> {
        self.regions.iter().filter(move |r| r.alive_at(index))
    }

    /// Number of snapshots observed so far.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn into_regions(self) -> Vec<TrackedRegion> {
        self.regions
    }
}

/// Tracks a whole snapshot sequence at once.
pub fn track<'a>(snapshots: impl IntoIterator<Item = &'a Snapshot>) -> Vec<TrackedRegion> {
    let mut tracker = RegionTracker::new();
    for snapshot in snapshots {
        tracker.observe(snapshot);
    }
    tracker.into_regions()
}
