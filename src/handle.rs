//! Host-facing collector handle.
//!
//! Mirrors the boundary operations a host runtime binds to: `create` with raw
//! integers, then `start`/`stop`/`destroy` which are all safe to repeat. The
//! sink is type-erased so one handle type serves every consumer.

use crate::collector::{
    Capture, Collector, CollectorError, CollectorState, CommandCapture, SnapshotSink,
};
use crate::config::{CaptureConfig, CollectorConfig};

type BoxedSink = Box<dyn SnapshotSink>;

/// Owning handle to one collector instance.
///
/// After [`destroy`](CollectorHandle::destroy) every operation is a no-op
/// except `start`, which reports [`CollectorError::Destroyed`].
pub struct CollectorHandle<C = CommandCapture>
where
    C: Capture + 'static,
{
    inner: Option<Collector<C, BoxedSink>>,
}

impl CollectorHandle<CommandCapture> {
    /// Creates an idle collector for `target_id` that runs `vmmap`.
    pub fn create(
        target_id: i64,
        interval_ms: i64,
        sink: impl SnapshotSink + 'static,
    ) -> Result<Self, CollectorError> {
        Self::create_with(target_id, interval_ms, &CaptureConfig::default(), sink)
    }

    /// Like [`create`](Self::create) with an explicit capture configuration.
    pub fn create_with(
        target_id: i64,
        interval_ms: i64,
        capture: &CaptureConfig,
        sink: impl SnapshotSink + 'static,
    ) -> Result<Self, CollectorError> {
        let config = CollectorConfig::from_raw(target_id, interval_ms)?;
        Ok(Self::with_capture(config, CommandCapture::new(capture), sink))
    }
}

impl<C: Capture + 'static> CollectorHandle<C> {
    /// Wraps an already validated configuration and capture source.
    pub fn with_capture(
        config: CollectorConfig,
        capture: C,
        sink: impl SnapshotSink + 'static,
    ) -> Self {
        let sink: BoxedSink = Box::new(sink);
        Self {
            inner: Some(Collector::new(config, capture, sink)),
        }
    }

    pub fn start(&mut self) -> Result<(), CollectorError> {
        match self.inner.as_mut() {
            Some(collector) => collector.start(),
            None => Err(CollectorError::Destroyed),
        }
    }

    pub fn stop(&mut self) {
        if let Some(collector) = self.inner.as_mut() {
            collector.stop();
        }
    }

    /// Stops sampling and frees the collector. Repeated calls do nothing.
    pub fn destroy(&mut self) {
        if let Some(mut collector) = self.inner.take() {
            collector.destroy();
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_none()
    }

    /// Current lifecycle state; `None` once destroyed.
    pub fn state(&self) -> Option<CollectorState> {
        self.inner.as_ref().map(Collector::state)
    }

    /// Snapshots delivered so far, 0 once destroyed. Diagnostics only.
    pub fn snapshot_count(&self) -> u64 {
        self.inner
            .as_ref()
            .map(Collector::snapshot_count)
            .unwrap_or(0)
    }

    pub fn collector(&self) -> Option<&Collector<C, BoxedSink>> {
        self.inner.as_ref()
    }
}

/// Destroys a handle if there is one. Accepts an absent handle.
pub fn destroy<C: Capture + 'static>(handle: Option<&mut CollectorHandle<C>>) {
    if let Some(handle) = handle {
        handle.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{ChannelSink, MockCapture};
    use std::time::Duration;

    fn mock_handle() -> (CollectorHandle<MockCapture>, std::sync::mpsc::Receiver<crate::model::Snapshot>) {
        let (sink, rx) = ChannelSink::channel();
        let config = CollectorConfig::from_raw(4242, 5).unwrap();
        (
            CollectorHandle::with_capture(config, MockCapture::typical_process(), sink),
            rx,
        )
    }

    #[test]
    fn test_create_validates_arguments() {
        let (sink, _rx) = ChannelSink::channel();
        assert!(matches!(
            CollectorHandle::create(0, 100, sink.clone()),
            Err(CollectorError::InvalidTarget(0))
        ));
        assert!(matches!(
            CollectorHandle::create(42, 0, sink.clone()),
            Err(CollectorError::InvalidInterval(0))
        ));

        let handle = CollectorHandle::create(42, 100, sink).unwrap();
        assert_eq!(handle.state(), Some(CollectorState::Idle));
        assert_eq!(handle.snapshot_count(), 0);
    }

    #[test]
    fn test_lifecycle_through_handle() {
        let (mut handle, rx) = mock_handle();
        handle.start().unwrap();
        handle.start().unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.stop();
        handle.stop();

        assert_eq!(handle.state(), Some(CollectorState::Idle));
        assert!(handle.snapshot_count() >= 1);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let (mut handle, rx) = mock_handle();
        handle.start().unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        handle.destroy();
        handle.destroy();
        handle.stop();
        assert!(handle.is_destroyed());
        assert_eq!(handle.state(), None);
        assert_eq!(handle.snapshot_count(), 0);
        assert!(matches!(handle.start(), Err(CollectorError::Destroyed)));
    }

    #[test]
    fn test_destroy_accepts_absent_handle() {
        destroy::<MockCapture>(None);

        let (mut handle, _rx) = mock_handle();
        destroy(Some(&mut handle));
        destroy(Some(&mut handle));
        assert!(handle.is_destroyed());
    }
}
