//! Background collector that samples one process at a fixed interval.
//!
//! The `Collector` owns a single sampling thread. Each cycle runs the capture
//! source, parses the report into a `Snapshot` and moves it into the sink.
//!
//! The only state touched by both the caller and the sampling thread is the
//! `running` flag (plus diagnostic counters and the optional history, which
//! has its own lock). Everything else the loop needs lives in a [`Worker`]
//! that is handed to the thread on `start()` and handed back by `join()` on
//! `stop()`, so the collector can be restarted without sharing the capture
//! source or the sink.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::collector::capture::Capture;
use crate::collector::parser::parse;
use crate::collector::sink::SnapshotSink;
use crate::config::{CollectorConfig, HistoryPolicy};
use crate::model::Snapshot;
use crate::util::MonotonicClock;

/// Lifecycle failures reported synchronously to the caller.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("invalid target process id: {0}")]
    InvalidTarget(i64),

    #[error("invalid sampling interval: {0} ms")]
    InvalidInterval(i64),

    #[error("failed to spawn sampling thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("collector has been destroyed")]
    Destroyed,

    #[error("sampling thread was lost; the collector cannot be restarted")]
    WorkerLost,
}

/// Lifecycle state of a collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    Running,
    /// Between clearing the running flag and the sampling thread exiting.
    Stopping,
}

impl fmt::Display for CollectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CollectorState::Idle => "idle",
            CollectorState::Running => "running",
            CollectorState::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    failed_captures: AtomicU64,
    failed_deliveries: AtomicU64,
}

type History = Arc<Mutex<VecDeque<Snapshot>>>;

fn lock_history(history: &Mutex<VecDeque<Snapshot>>) -> MutexGuard<'_, VecDeque<Snapshot>> {
    // A panic while holding the lock cannot leave the deque half-updated.
    history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Everything the sampling loop owns while it runs.
struct Worker<C, S> {
    pid: u32,
    interval: Duration,
    capture: C,
    sink: S,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    history: Option<History>,
    history_limit: Option<usize>,
    clock: MonotonicClock,
    cycles: u64,
}

impl<C: Capture, S: SnapshotSink> Worker<C, S> {
    fn run(mut self) -> Self {
        debug!(pid = self.pid, "sampling loop started");
        while self.running.load(Ordering::Acquire) {
            self.cycle();
            self.pause();
        }
        debug!(pid = self.pid, cycles = self.cycles, "sampling loop exited");
        self
    }

    /// One capture → parse → deliver round. Never fails; problems are logged.
    fn cycle(&mut self) {
        self.cycles += 1;
        let timestamp = self.clock.now_millis();
        let started = Instant::now();

        let raw = match self.capture.capture(self.pid) {
            Ok(raw) => raw,
            Err(e) => {
                self.counters.failed_captures.fetch_add(1, Ordering::Relaxed);
                warn!(pid = self.pid, cycle = self.cycles, error = %e, "capture failed");
                return;
            }
        };

        let snapshot = Snapshot::new(timestamp, parse(&raw));
        let region_count = snapshot.len();
        if let Some(history) = &self.history {
            let mut history = lock_history(history);
            if let Some(limit) = self.history_limit {
                while history.len() >= limit {
                    history.pop_front();
                }
            }
            history.push_back(snapshot.clone());
        }

        match self.sink.deliver(snapshot) {
            Ok(()) => {
                let delivered = self.counters.delivered.fetch_add(1, Ordering::Relaxed) + 1;
                let duration_ms = started.elapsed().as_millis() as u64;
                if delivered == 1 {
                    info!(pid = self.pid, regions = region_count, duration_ms, "first snapshot delivered");
                } else {
                    debug!(
                        pid = self.pid,
                        snapshot = delivered,
                        regions = region_count,
                        duration_ms,
                        "snapshot delivered"
                    );
                }
            }
            Err(e) => {
                self.counters.failed_deliveries.fetch_add(1, Ordering::Relaxed);
                warn!(pid = self.pid, cycle = self.cycles, error = %e, "snapshot delivery skipped");
            }
        }
    }

    /// Waits out the interval, returning early once the running flag clears.
    ///
    /// `stop()` unparks the thread, so the wait ends promptly.
    fn pause(&self) {
        let deadline = Instant::now() + self.interval;
        while self.running.load(Ordering::Acquire) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }
}

/// Samples one process on a background thread and pushes snapshots to a sink.
///
/// ```
/// use std::time::Duration;
/// use vmtrail::collector::{ChannelSink, Collector, MockCapture};
/// use vmtrail::config::CollectorConfig;
///
/// let (sink, rx) = ChannelSink::channel();
/// let config = CollectorConfig::new(4242, Duration::from_millis(10));
/// let mut collector = Collector::new(config, MockCapture::typical_process(), sink);
///
/// collector.start().unwrap();
/// let snapshot = rx.recv().unwrap();
/// collector.stop();
///
/// assert_eq!(snapshot.regions.len(), 10);
/// ```
pub struct Collector<C, S>
where
    C: Capture + 'static,
    S: SnapshotSink + 'static,
{
    config: CollectorConfig,
    state: CollectorState,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    history: Option<History>,
    /// Loop state while idle; moved into the thread while running.
    parked: Option<Worker<C, S>>,
    handle: Option<JoinHandle<Option<Worker<C, S>>>>,
    destroyed: bool,
}

impl<C, S> Collector<C, S>
where
    C: Capture + 'static,
    S: SnapshotSink + 'static,
{
    /// Creates an idle collector. No thread is started.
    pub fn new(config: CollectorConfig, capture: C, sink: S) -> Self {
        let running = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());
        let history = config
            .history
            .is_enabled()
            .then(|| Arc::new(Mutex::new(VecDeque::new())));
        let history_limit = match config.history {
            HistoryPolicy::Limit(n) => Some(n),
            _ => None,
        };

        let worker = Worker {
            pid: config.pid,
            interval: config.interval,
            capture,
            sink,
            running: Arc::clone(&running),
            counters: Arc::clone(&counters),
            history: history.clone(),
            history_limit,
            clock: MonotonicClock::new(),
            cycles: 0,
        };

        Self {
            config,
            state: CollectorState::Idle,
            running,
            counters,
            history,
            parked: Some(worker),
            handle: None,
            destroyed: false,
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == CollectorState::Running
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Starts the sampling thread.
    ///
    /// Calling `start()` on a running collector does nothing. If the thread
    /// cannot be spawned the collector stays idle and can be started again.
    pub fn start(&mut self) -> Result<(), CollectorError> {
        if self.destroyed {
            return Err(CollectorError::Destroyed);
        }
        if self.state == CollectorState::Running {
            return Ok(());
        }
        let worker = self.parked.take().ok_or(CollectorError::WorkerLost)?;

        // The worker is sent only once the thread exists, so a failed spawn
        // leaves it with us.
        let (tx, rx) = mpsc::sync_channel::<Worker<C, S>>(1);
        self.running.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name(format!("vmtrail-{}", self.config.pid))
            .spawn(move || rx.recv().ok().map(Worker::run));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                self.parked = Some(worker);
                error!(pid = self.config.pid, error = %e, "failed to spawn sampling thread");
                return Err(CollectorError::Spawn(e));
            }
        };
        if let Err(mpsc::SendError(worker)) = tx.send(worker) {
            // The thread died before receiving; nothing is running.
            self.running.store(false, Ordering::Release);
            self.parked = Some(worker);
            let _ = handle.join();
            return Err(CollectorError::WorkerLost);
        }

        self.handle = Some(handle);
        self.state = CollectorState::Running;
        info!(
            pid = self.config.pid,
            interval_ms = self.config.interval.as_millis() as u64,
            "collector started"
        );
        Ok(())
    }

    /// Stops the sampling thread and waits for it to exit.
    ///
    /// An in-flight capture is allowed to finish first. After this returns no
    /// capture is running and the sink will not be called again until the
    /// next `start()`. Does nothing when the collector is not running.
    pub fn stop(&mut self) {
        if self.state != CollectorState::Running {
            return;
        }
        self.state = CollectorState::Stopping;
        self.running.store(false, Ordering::Release);

        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            match handle.join() {
                Ok(Some(worker)) => self.parked = Some(worker),
                Ok(None) => error!(pid = self.config.pid, "sampling thread exited without its state"),
                Err(_) => error!(pid = self.config.pid, "sampling thread panicked"),
            }
        }

        self.state = CollectorState::Idle;
        info!(
            pid = self.config.pid,
            delivered = self.snapshot_count(),
            failed = self.failure_count(),
            "collector stopped"
        );
    }

    /// Stops the collector if needed and releases everything it retains.
    ///
    /// Safe to call repeatedly; only the first call has an effect.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.stop();
        if let Some(history) = self.history.take() {
            let mut history = lock_history(&history);
            history.clear();
            history.shrink_to_fit();
        }
        self.parked = None;
        self.destroyed = true;
        info!(pid = self.config.pid, "collector destroyed");
    }

    /// Number of snapshots successfully delivered so far. Diagnostics only.
    pub fn snapshot_count(&self) -> u64 {
        self.counters.delivered.load(Ordering::Relaxed)
    }

    /// Number of capture cycles that failed (spawn, exit status, output).
    pub fn failure_count(&self) -> u64 {
        self.counters.failed_captures.load(Ordering::Relaxed)
    }

    /// Number of snapshots lost because the sink rejected them.
    pub fn skipped_deliveries(&self) -> u64 {
        self.counters.failed_deliveries.load(Ordering::Relaxed)
    }

    /// Copies out the retained snapshots, oldest first.
    ///
    /// Empty when history is disabled or after `destroy()`.
    pub fn history(&self) -> Vec<Snapshot> {
        match &self.history {
            Some(history) => lock_history(history).iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Number of retained snapshots.
    pub fn history_len(&self) -> usize {
        self.history
            .as_ref()
            .map(|history| lock_history(history).len())
            .unwrap_or(0)
    }
}

impl<C, S> Drop for Collector<C, S>
where
    C: Capture + 'static,
    S: SnapshotSink + 'static,
{
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::capture::CaptureError;
    use crate::collector::mock::{MockCapture, MockStep};
    use crate::collector::sink::{ChannelSink, DeliveryError, from_fn};
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::Receiver;

    const RECV_TIMEOUT: Duration = Duration::from_secs(5);

    fn fast_config() -> CollectorConfig {
        CollectorConfig::new(4242, Duration::from_millis(5))
    }

    fn recv_n(rx: &Receiver<Snapshot>, n: usize) -> Vec<Snapshot> {
        (0..n)
            .map(|_| rx.recv_timeout(RECV_TIMEOUT).expect("snapshot not delivered"))
            .collect()
    }

    #[test]
    fn test_new_collector_is_idle() {
        let (sink, rx) = ChannelSink::channel();
        let mock = MockCapture::typical_process();
        let calls = mock.calls();
        let collector = Collector::new(fast_config(), mock, sink);

        assert_eq!(collector.state(), CollectorState::Idle);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_delivers_parsed_snapshots_in_order() {
        let (sink, rx) = ChannelSink::channel();
        let mut collector = Collector::new(fast_config(), MockCapture::typical_process(), sink);

        collector.start().unwrap();
        assert_eq!(collector.state(), CollectorState::Running);
        let snapshots = recv_n(&rx, 5);
        collector.stop();

        for pair in snapshots.windows(2) {
            assert!(pair[1].timestamp >= pair[0].timestamp);
        }
        assert!(snapshots.iter().all(|s| s.regions.len() == 10));
        assert!(collector.snapshot_count() >= 5);
    }

    #[test]
    fn test_every_cycle_delivered_exactly_once() {
        let (sink, rx) = ChannelSink::channel();
        let mock = MockCapture::typical_process();
        let calls = mock.calls();
        let mut collector = Collector::new(fast_config(), mock, sink);

        collector.start().unwrap();
        recv_n(&rx, 3);
        collector.stop();

        let delivered = 3 + rx.try_iter().count();
        assert_eq!(delivered, calls.load(Ordering::SeqCst));
        assert_eq!(collector.snapshot_count(), delivered as u64);
    }

    #[test]
    fn test_growing_heap_tracked_across_cycles() {
        let (sink, rx) = ChannelSink::channel();
        let mut collector = Collector::new(fast_config(), MockCapture::growing_heap(2), sink);

        collector.start().unwrap();
        let snapshots = recv_n(&rx, 3);
        collector.stop();

        assert_eq!(snapshots[0].regions.len(), 10);
        assert_eq!(snapshots[1].regions.len(), 11);
        assert_eq!(snapshots[2].regions.len(), 10);

        let tracked = crate::tracker::track(&snapshots);
        assert_eq!(tracked.len(), 13);

        let find = |category: &str, start: u64, end: u64| {
            tracked
                .iter()
                .find(|t| {
                    t.key.category == category
                        && t.key.start_address == start
                        && t.key.end_address == end
                })
                .unwrap()
        };

        let grown = find("MALLOC_SMALL", 0x608000000, 0x614000000);
        assert_eq!((grown.first_seen_index, grown.last_seen_index), (1, 1));

        let original = find("MALLOC_SMALL", 0x608000000, 0x610000000);
        assert_eq!((original.first_seen_index, original.last_seen_index), (0, 2));
        assert_eq!(original.occurrences, 2);
        assert!(!original.is_continuous());

        let mapped = find("mapped file", 0x103000000, 0x103800000);
        assert_eq!(mapped.lifetime(), 1);
    }

    #[test]
    fn test_start_twice_spawns_one_thread() {
        let (sink, rx) = ChannelSink::channel();
        let mock = MockCapture::typical_process().with_delay(Duration::from_millis(20));
        let calls = mock.calls();
        let config = CollectorConfig::new(4242, Duration::from_millis(200));
        let mut collector = Collector::new(config, mock, sink);

        collector.start().unwrap();
        collector.start().unwrap();
        recv_n(&rx, 1);
        collector.stop();

        // A second loop would have produced a second capture inside the
        // first interval.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let (sink, _rx) = ChannelSink::channel();
        let mut collector = Collector::new(fast_config(), MockCapture::typical_process(), sink);
        collector.stop();
        collector.stop();
        assert_eq!(collector.state(), CollectorState::Idle);
    }

    #[test]
    fn test_no_delivery_after_stop() {
        let (sink, rx) = ChannelSink::channel();
        let mock = MockCapture::typical_process();
        let calls = mock.calls();
        let mut collector = Collector::new(fast_config(), mock, sink);

        collector.start().unwrap();
        recv_n(&rx, 2);
        collector.stop();

        let calls_at_stop = calls.load(Ordering::SeqCst);
        let _ = rx.try_iter().count();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(calls.load(Ordering::SeqCst), calls_at_stop);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stop_waits_for_in_flight_capture() {
        let (sink, rx) = ChannelSink::channel();
        let mock = MockCapture::typical_process().with_delay(Duration::from_millis(100));
        let calls = mock.calls();
        let mut collector = Collector::new(fast_config(), mock, sink);

        collector.start().unwrap();
        while calls.load(Ordering::SeqCst) == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        collector.stop();

        // The capture that was running when stop() was called finished and
        // was delivered before stop() returned.
        assert_eq!(rx.try_iter().count(), 1);
        assert_eq!(collector.snapshot_count(), 1);
    }

    #[test]
    fn test_stop_interrupts_long_interval() {
        let (sink, rx) = ChannelSink::channel();
        let config = CollectorConfig::new(4242, Duration::from_secs(3600));
        let mut collector = Collector::new(config, MockCapture::typical_process(), sink);

        collector.start().unwrap();
        recv_n(&rx, 1);
        let started = Instant::now();
        collector.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_restart_after_stop() {
        let (sink, rx) = ChannelSink::channel();
        let mut collector = Collector::new(fast_config(), MockCapture::typical_process(), sink);

        collector.start().unwrap();
        recv_n(&rx, 1);
        collector.stop();
        let first_run = collector.snapshot_count();

        let _ = rx.try_iter().count();
        collector.start().unwrap();
        recv_n(&rx, 1);
        collector.stop();
        assert!(collector.snapshot_count() > first_run);
    }

    #[test]
    fn test_capture_failure_does_not_stop_loop() {
        let (sink, rx) = ChannelSink::channel();
        // Cycles 2 and 4 fail; everything after cycle 4 succeeds.
        let mock = MockCapture::failing_every(2, 4);
        let calls = mock.calls();
        let mut collector = Collector::new(fast_config(), mock, sink);

        collector.start().unwrap();
        let snapshots = recv_n(&rx, 4);
        collector.stop();

        assert!(calls.load(Ordering::SeqCst) >= 6);
        assert_eq!(collector.failure_count(), 2);
        assert!(snapshots.iter().all(|s| s.regions.len() == 10));
    }

    #[test]
    fn test_vanished_process_never_delivers() {
        let (sink, rx) = ChannelSink::channel();
        let mock = MockCapture::vanished_process();
        let calls = mock.calls();
        let mut collector = Collector::new(fast_config(), mock, sink);

        collector.start().unwrap();
        while calls.load(Ordering::SeqCst) < 3 {
            thread::sleep(Duration::from_millis(5));
        }
        collector.stop();

        assert!(rx.try_recv().is_err());
        assert_eq!(collector.snapshot_count(), 0);
        assert!(collector.failure_count() >= 3);
    }

    #[test]
    fn test_oversized_output_is_a_failed_cycle() {
        let (sink, rx) = ChannelSink::channel();
        let mock = MockCapture::scripted(
            [MockStep::TooLarge],
            MockStep::Report(crate::collector::mock::scenarios::TYPICAL_REPORT.to_string()),
        );
        let mut collector = Collector::new(fast_config(), mock, sink);

        collector.start().unwrap();
        recv_n(&rx, 1);
        collector.stop();
        assert_eq!(collector.failure_count(), 1);
    }

    #[test]
    fn test_unparseable_output_is_an_empty_snapshot() {
        let (sink, rx) = ChannelSink::channel();
        let mock = MockCapture::repeating(MockStep::Report("no regions here\n".into()));
        let mut collector = Collector::new(fast_config(), mock, sink);

        collector.start().unwrap();
        let snapshot = rx.recv_timeout(RECV_TIMEOUT).unwrap();
        collector.stop();
        assert!(snapshot.is_empty());
        assert_eq!(collector.failure_count(), 0);
    }

    struct FlakySink {
        calls: usize,
        tx: mpsc::Sender<Snapshot>,
    }

    impl SnapshotSink for FlakySink {
        fn deliver(&mut self, snapshot: Snapshot) -> Result<(), DeliveryError> {
            self.calls += 1;
            if self.calls == 1 {
                return Err(DeliveryError::Closed);
            }
            self.tx.send(snapshot).map_err(|_| DeliveryError::Closed)
        }
    }

    #[test]
    fn test_failed_delivery_is_skipped() {
        let (tx, rx) = mpsc::channel();
        let sink = FlakySink { calls: 0, tx };
        let mut collector = Collector::new(fast_config(), MockCapture::typical_process(), sink);

        collector.start().unwrap();
        recv_n(&rx, 2);
        collector.stop();
        assert_eq!(collector.skipped_deliveries(), 1);
        assert_eq!(collector.snapshot_count(), 2 + rx.try_iter().count() as u64);
    }

    #[test]
    fn test_history_limit_drops_oldest() {
        let (sink, rx) = ChannelSink::channel();
        let config = fast_config().with_history(HistoryPolicy::Limit(2));
        let mut collector = Collector::new(config, MockCapture::typical_process(), sink);

        collector.start().unwrap();
        let mut delivered = recv_n(&rx, 4);
        collector.stop();
        delivered.extend(rx.try_iter());

        let history = collector.history();
        assert_eq!(history.len(), 2);
        assert_eq!(collector.history_len(), 2);
        assert_eq!(history[1], delivered[delivered.len() - 1]);
        assert_eq!(history[0], delivered[delivered.len() - 2]);
    }

    #[test]
    fn test_history_disabled_by_default() {
        let (sink, rx) = ChannelSink::channel();
        let mut collector = Collector::new(fast_config(), MockCapture::typical_process(), sink);
        collector.start().unwrap();
        recv_n(&rx, 1);
        collector.stop();
        assert!(collector.history().is_empty());
    }

    #[test]
    fn test_destroy_releases_history_once() {
        let (sink, rx) = ChannelSink::channel();
        let config = fast_config().with_history(HistoryPolicy::Unbounded);
        let mut collector = Collector::new(config, MockCapture::typical_process(), sink);

        collector.start().unwrap();
        recv_n(&rx, 2);
        collector.destroy();

        assert!(collector.is_destroyed());
        assert_eq!(collector.state(), CollectorState::Idle);
        assert!(collector.history().is_empty());
        collector.destroy();
        collector.stop();
        assert!(matches!(collector.start(), Err(CollectorError::Destroyed)));
    }

    #[test]
    fn test_destroy_on_idle_collector() {
        let (sink, _rx) = ChannelSink::channel();
        let mut collector = Collector::new(fast_config(), MockCapture::typical_process(), sink);
        collector.destroy();
        assert!(collector.is_destroyed());
    }

    #[test]
    fn test_destroy_drops_sink() {
        let (sink, rx) = ChannelSink::channel();
        let mut collector = Collector::new(fast_config(), MockCapture::typical_process(), sink);
        collector.start().unwrap();
        recv_n(&rx, 1);
        collector.destroy();

        // All senders are gone once the worker is released.
        let _ = rx.try_iter().count();
        assert!(matches!(
            rx.recv_timeout(Duration::from_millis(100)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn test_drop_stops_thread() {
        let (sink, rx) = ChannelSink::channel();
        let mock = MockCapture::typical_process();
        let calls = mock.calls();
        {
            let mut collector = Collector::new(fast_config(), mock, sink);
            collector.start().unwrap();
            recv_n(&rx, 1);
        }
        let after_drop = calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(calls.load(Ordering::SeqCst), after_drop);
    }

    #[test]
    fn test_panicking_sink_loses_worker() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let sink = from_fn(move |_s: Snapshot| {
            seen.fetch_add(1, Ordering::SeqCst);
            panic!("consumer bug");
        });
        let mut collector = Collector::new(fast_config(), MockCapture::typical_process(), sink);

        collector.start().unwrap();
        while count.load(Ordering::SeqCst) == 0 {
            thread::sleep(Duration::from_millis(5));
        }
        collector.stop();
        assert_eq!(collector.state(), CollectorState::Idle);
        assert!(matches!(collector.start(), Err(CollectorError::WorkerLost)));
    }

    #[test]
    fn test_capture_error_display() {
        let err = CaptureError::NonZeroExit {
            program: "vmmap".into(),
            code: 1,
            stderr: "no such process".into(),
        };
        assert_eq!(err.to_string(), "'vmmap' exited with status 1: no such process");
    }
}
