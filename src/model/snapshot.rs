//! Snapshot structures.
//!
//! A snapshot is produced by exactly one capture cycle and handed to the
//! consumer by value. It never points back into the collector.

use serde::{Deserialize, Serialize};

use super::region::Region;

/// The complete set of regions observed by one invocation of the sampling
/// utility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Milliseconds since the Unix epoch, taken when the capture was started.
    pub timestamp: i64,
    /// Regions in the order they appeared in the report (not address order).
    pub regions: Vec<Region>,
}

/// Aggregated sizes over a group of regions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub category: String,
    pub region_count: usize,
    pub virtual_size: u64,
    pub resident_size: u64,
    pub dirty_size: u64,
    pub swap_size: u64,
}

impl CategoryTotals {
    fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Self::default()
        }
    }

    fn add(&mut self, region: &Region) {
        self.region_count += 1;
        self.virtual_size = self.virtual_size.saturating_add(region.virtual_size);
        self.resident_size = self.resident_size.saturating_add(region.resident_size);
        self.dirty_size = self.dirty_size.saturating_add(region.dirty_size);
        self.swap_size = self.swap_size.saturating_add(region.swap_size);
    }
}

impl Snapshot {
    pub fn new(timestamp: i64, regions: Vec<Region>) -> Self {
        Self { timestamp, regions }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Sums over every region. The category of the result is `"TOTAL"`.
    pub fn totals(&self) -> CategoryTotals {
        let mut totals = CategoryTotals::new("TOTAL");
        for region in &self.regions {
            totals.add(region);
        }
        totals
    }

    /// Per-category sums, ordered by the first appearance of each category.
    pub fn category_totals(&self) -> Vec<CategoryTotals> {
        let mut out: Vec<CategoryTotals> = Vec::new();
        for region in &self.regions {
            match out.iter_mut().find(|t| t.category == region.category) {
                Some(totals) => totals.add(region),
                None => {
                    let mut totals = CategoryTotals::new(region.category.clone());
                    totals.add(region);
                    out.push(totals);
                }
            }
        }
        out
    }

    /// Finds the region whose address range contains `addr`.
    pub fn region_at(&self, addr: u64) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::parser::parse;

    const REPORT: &str = "\
__TEXT                      100484000-100f3c000    [ 10.7M  7904K     0K     0K] r-x/r-x SM=COW          /bin/app
MALLOC_TINY                 600000000-600100000    [ 1024K   208K   208K     0K] rw-/rwx SM=PRV          DefaultMallocZone_0x100f60000
__TEXT                      1a0000000-1a0010000    [   64K    64K     0K     0K] r-x/r-x SM=COW          /usr/lib/dyld
MALLOC_TINY                 600100000-600200000    [ 1024K   100K    50K    10K] rw-/rwx SM=PRV          DefaultMallocZone_0x100f60000
";

    #[test]
    fn test_category_totals_keep_first_appearance_order() {
        let snapshot = Snapshot::new(0, parse(REPORT));
        let totals = snapshot.category_totals();

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].category, "__TEXT");
        assert_eq!(totals[0].region_count, 2);
        assert_eq!(totals[0].resident_size, 7904 * 1024 + 64 * 1024);
        assert_eq!(totals[1].category, "MALLOC_TINY");
        assert_eq!(totals[1].dirty_size, 258 * 1024);
        assert_eq!(totals[1].swap_size, 10 * 1024);
    }

    #[test]
    fn test_totals() {
        let snapshot = Snapshot::new(0, parse(REPORT));
        let totals = snapshot.totals();
        assert_eq!(totals.category, "TOTAL");
        assert_eq!(totals.region_count, 4);
        assert_eq!(totals.virtual_size, 11219763 + 2 * 1024 * 1024 + 64 * 1024);
    }

    #[test]
    fn test_region_at() {
        let snapshot = Snapshot::new(0, parse(REPORT));
        let region = snapshot.region_at(0x600100010).unwrap();
        assert_eq!(region.start_address(), 0x600100000);
        assert!(snapshot.region_at(0x10).is_none());
        // End address is exclusive.
        let region = snapshot.region_at(0x600100000).unwrap();
        assert_eq!(region.resident_size(), 100 * 1024);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::new(42, Vec::new());
        assert!(snapshot.is_empty());
        assert!(snapshot.category_totals().is_empty());
        assert_eq!(snapshot.totals().region_count, 0);
    }
}
