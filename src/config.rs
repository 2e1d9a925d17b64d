//! Collector and capture configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::collector::CollectorError;
use crate::collector::parser::parse_size;

/// Sampling utility run when nothing else is configured.
pub const DEFAULT_PROGRAM: &str = "vmmap";

/// Default ceiling on the utility's stdout (10 MiB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Default delay between capture cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Whether, and how many, delivered snapshots the collector keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryPolicy {
    /// Snapshots are only handed to the sink.
    #[default]
    Disabled,
    /// Every snapshot is also retained until `destroy()`.
    Unbounded,
    /// At most this many snapshots are retained; the oldest is dropped first.
    Limit(usize),
}

impl HistoryPolicy {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, HistoryPolicy::Disabled | HistoryPolicy::Limit(0))
    }
}

/// Settings owned by one collector instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Target process.
    pub pid: u32,
    /// Delay after each capture cycle, successful or not.
    pub interval: Duration,
    pub history: HistoryPolicy,
}

impl CollectorConfig {
    pub fn new(pid: u32, interval: Duration) -> Self {
        Self {
            pid,
            interval,
            history: HistoryPolicy::default(),
        }
    }

    /// Validates the integer arguments accepted at the host boundary.
    ///
    /// The pid must fit a positive `u32` and the interval must be positive.
    pub fn from_raw(target_id: i64, interval_ms: i64) -> Result<Self, CollectorError> {
        let pid = u32::try_from(target_id)
            .ok()
            .filter(|pid| *pid > 0)
            .ok_or(CollectorError::InvalidTarget(target_id))?;
        let interval = u64::try_from(interval_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .ok_or(CollectorError::InvalidInterval(interval_ms))?;
        Ok(Self::new(pid, interval))
    }

    pub fn with_history(mut self, history: HistoryPolicy) -> Self {
        self.history = history;
        self
    }
}

/// How the sampling utility is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Program path or name looked up in `PATH`.
    pub program: PathBuf,
    /// Output larger than this fails the capture.
    pub max_output_bytes: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Parses a human-readable size argument (e.g. "10M", "512K", "1048576").
///
/// Shaped for use as a `clap` value parser.
pub fn parse_size_arg(s: &str) -> Result<usize, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".to_string());
    }
    let bytes = parse_size(s).map_err(|e| e.to_string())?;
    usize::try_from(bytes).map_err(|_| format!("size '{}' is too large", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_accepts_valid_arguments() {
        let config = CollectorConfig::from_raw(4242, 250).unwrap();
        assert_eq!(config.pid, 4242);
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.history, HistoryPolicy::Disabled);
    }

    #[test]
    fn test_from_raw_rejects_bad_target() {
        for pid in [0, -1, i64::from(u32::MAX) + 1] {
            assert!(matches!(
                CollectorConfig::from_raw(pid, 100),
                Err(CollectorError::InvalidTarget(p)) if p == pid
            ));
        }
    }

    #[test]
    fn test_from_raw_rejects_bad_interval() {
        for ms in [0, -5] {
            assert!(matches!(
                CollectorConfig::from_raw(1, ms),
                Err(CollectorError::InvalidInterval(m)) if m == ms
            ));
        }
    }

    #[test]
    fn test_history_policy() {
        assert!(!HistoryPolicy::Disabled.is_enabled());
        assert!(!HistoryPolicy::Limit(0).is_enabled());
        assert!(HistoryPolicy::Limit(3).is_enabled());
        assert!(HistoryPolicy::Unbounded.is_enabled());
    }

    #[test]
    fn test_parse_size_arg() {
        assert_eq!(parse_size_arg("10M"), Ok(10 * 1024 * 1024));
        assert_eq!(parse_size_arg(" 512K "), Ok(512 * 1024));
        assert_eq!(parse_size_arg("4096"), Ok(4096));
        assert!(parse_size_arg("").is_err());
        assert!(parse_size_arg("ten").is_err());
    }

    #[test]
    fn test_capture_config_default() {
        let config = CaptureConfig::default();
        assert_eq!(config.program, PathBuf::from("vmmap"));
        assert_eq!(config.max_output_bytes, 10 * 1024 * 1024);
    }
}
