//! Snapshot → SnapshotRecord conversion.

use serde::{Deserialize, Serialize};

use crate::fmt::{format_address, format_protection};
use crate::model::{Region, Snapshot};

/// One snapshot as delivered to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Capture time, milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub region_count: usize,
    pub regions: Vec<RegionRecord>,
}

/// One region as delivered to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub category: String,
    /// `0x`-prefixed lowercase hex.
    pub start: String,
    /// `0x`-prefixed lowercase hex, exclusive.
    pub end: String,
    pub virtual_size: u64,
    pub resident_size: u64,
    pub dirty_size: u64,
    pub swap_size: u64,
    /// Current and maximum protection, e.g. `"r-x/rwx"`.
    pub protection: String,
    /// Sharing mode code, e.g. `"COW"`.
    pub share_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl From<&Region> for RegionRecord {
    fn from(region: &Region) -> Self {
        Self {
            category: region.category().to_string(),
            start: format_address(region.start_address()),
            end: format_address(region.end_address()),
            virtual_size: region.virtual_size(),
            resident_size: region.resident_size(),
            dirty_size: region.dirty_size(),
            swap_size: region.swap_size(),
            protection: format_protection(region.current_permissions(), region.max_permissions()),
            share_mode: region.sharing_mode().code().to_string(),
            detail: region.detail().map(str::to_string),
        }
    }
}

impl From<&Snapshot> for SnapshotRecord {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            region_count: snapshot.len(),
            regions: snapshot.regions.iter().map(RegionRecord::from).collect(),
        }
    }
}

impl From<Snapshot> for SnapshotRecord {
    fn from(snapshot: Snapshot) -> Self {
        Self::from(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::scenarios::TYPICAL_REPORT;
    use crate::collector::parse;

    #[test]
    fn test_region_record_fields() {
        let snapshot = Snapshot::new(1_700_000_000_000, parse(TYPICAL_REPORT));
        let record = SnapshotRecord::from(&snapshot);

        assert_eq!(record.timestamp, 1_700_000_000_000);
        assert_eq!(record.region_count, 10);
        let text = &record.regions[0];
        assert_eq!(text.category, "__TEXT");
        assert_eq!(text.start, "0x100484000");
        assert_eq!(text.end, "0x100f3c000");
        assert_eq!(text.virtual_size, 11_219_763);
        assert_eq!(text.resident_size, 8_093_696);
        assert_eq!(text.protection, "r-x/r-x");
        assert_eq!(text.share_mode, "COW");
        assert_eq!(text.detail.as_deref(), Some("/bin/app"));
    }

    #[test]
    fn test_record_without_detail_omits_field() {
        let snapshot = Snapshot::new(5, parse(TYPICAL_REPORT));
        let record = SnapshotRecord::from(snapshot);
        let guard = &record.regions[2];
        assert_eq!(guard.category, "MALLOC guard page");
        assert_eq!(guard.detail, None);

        let json = serde_json::to_value(guard).unwrap();
        assert!(json.get("detail").is_none());
        assert_eq!(json["protection"], "---/rwx");
    }

    #[test]
    fn test_record_json_round_trip() {
        let record = SnapshotRecord::from(Snapshot::new(9, parse(TYPICAL_REPORT)));
        let json = serde_json::to_string(&record).unwrap();
        let back: SnapshotRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
