//! JSON lines output.

use std::io::Write;

use crate::api::SnapshotRecord;
use crate::collector::{DeliveryError, SnapshotSink};
use crate::model::Snapshot;

/// Sink that writes each snapshot as one JSON object per line.
///
/// The record is encoded fully before anything is written, so an encoding
/// failure skips the snapshot without leaving a partial line behind.
#[derive(Debug)]
pub struct JsonLinesSink<W> {
    writer: W,
    written: u64,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of lines written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Writes one snapshot without taking ownership of it.
    pub fn write_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), DeliveryError> {
        let mut line = serde_json::to_vec(&SnapshotRecord::from(snapshot))?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> SnapshotSink for JsonLinesSink<W> {
    fn deliver(&mut self, snapshot: Snapshot) -> Result<(), DeliveryError> {
        self.write_snapshot(&snapshot)
    }
}
