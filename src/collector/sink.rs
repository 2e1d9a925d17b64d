//! Delivery of snapshots to the consumer.
//!
//! The collector only knows the [`SnapshotSink`] capability. Each snapshot is
//! moved into [`SnapshotSink::deliver`]; the sink owns it from then on.

use std::io;
use std::sync::mpsc::{self, Receiver, Sender};

use thiserror::Error;

use crate::model::Snapshot;

/// Errors raised while handing a snapshot to its consumer.
///
/// A failed delivery loses that snapshot; the collector keeps running.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("snapshot receiver has been dropped")]
    Closed,

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write snapshot: {0}")]
    Io(#[from] io::Error),
}

/// Consumer of snapshots, called from the sampling thread.
///
/// Calls are sequential and in capture order; the next capture does not start
/// until `deliver` returns.
pub trait SnapshotSink: Send {
    fn deliver(&mut self, snapshot: Snapshot) -> Result<(), DeliveryError>;
}

impl<S: SnapshotSink + ?Sized> SnapshotSink for Box<S> {
    fn deliver(&mut self, snapshot: Snapshot) -> Result<(), DeliveryError> {
        (**self).deliver(snapshot)
    }
}

/// Sink backed by a closure. Built with [`from_fn`].
pub struct FnSink<F> {
    f: F,
}

/// Wraps a closure as a sink that never fails.
pub fn from_fn<F>(f: F) -> FnSink<F>
where
    F: FnMut(Snapshot) + Send,
{
    FnSink { f }
}

impl<F> SnapshotSink for FnSink<F>
where
    F: FnMut(Snapshot) + Send,
{
    fn deliver(&mut self, snapshot: Snapshot) -> Result<(), DeliveryError> {
        (self.f)(snapshot);
        Ok(())
    }
}

/// Sink that forwards snapshots over an `mpsc` channel, moving delivery onto
/// whichever thread owns the receiver.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<Snapshot>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Snapshot>) -> Self {
        Self { tx }
    }

    /// Creates a sink together with the receiving end.
    pub fn channel() -> (Self, Receiver<Snapshot>) {
        let (tx, rx) = mpsc::channel();
        (Self::new(tx), rx)
    }
}

impl SnapshotSink for ChannelSink {
    fn deliver(&mut self, snapshot: Snapshot) -> Result<(), DeliveryError> {
        self.tx.send(snapshot).map_err(|_| DeliveryError::Closed)
    }
}
