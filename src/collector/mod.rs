//! Periodic memory map sampling.
//!
//! This module runs the `vmmap` utility against one process at a fixed
//! interval, parses each report into a [`Snapshot`](crate::model::Snapshot)
//! and hands it to a consumer-supplied sink. A scripted mock capture source
//! allows the whole pipeline to be tested without the utility.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Collector                           │
//! │   start() ──► sampling thread ──► stop() joins it           │
//! │                                                             │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────────┐    │
//! │  │  Capture    │──►│  parser     │──►│  SnapshotSink   │    │
//! │  │  (trait)    │   │  parse()    │   │  (trait)        │    │
//! │  └──────┬──────┘   └─────────────┘   └────────┬────────┘    │
//! └─────────┼─────────────────────────────────────┼─────────────┘
//!           │                                     │
//!     ┌─────┴───────────┐            ┌────────────┼──────────────┐
//!     │                 │            │            │              │
//! ┌───▼──────────┐ ┌────▼────────┐ ┌─▼──────┐ ┌───▼─────────┐ ┌──▼─────────────┐
//! │CommandCapture│ │ MockCapture │ │ FnSink │ │ ChannelSink │ │ JsonLinesSink  │
//! │ (vmmap <pid>)│ │ (Testing)   │ └────────┘ └─────────────┘ │ (crate::api)   │
//! └──────────────┘ └─────────────┘                            └────────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (macOS)
//!
//! ```ignore
//! use std::time::Duration;
//! use vmtrail::collector::{ChannelSink, Collector, CommandCapture};
//! use vmtrail::config::CollectorConfig;
//!
//! let (sink, rx) = ChannelSink::channel();
//! let config = CollectorConfig::new(pid, Duration::from_secs(1));
//! let mut collector = Collector::new(config, CommandCapture::default(), sink);
//! collector.start()?;
//! for snapshot in rx.iter().take(10) {
//!     println!("{} regions", snapshot.len());
//! }
//! collector.destroy();
//! ```
//!
//! ## Testing (with MockCapture)
//!
//! ```
//! use vmtrail::collector::{MockCapture, parse, Capture};
//!
//! let mut capture = MockCapture::typical_process();
//! let report = capture.capture(4242).unwrap();
//! assert_eq!(parse(&report).len(), 10);
//! ```

mod capture;
#[allow(clippy::module_inception)]
mod collector;
pub mod mock;
pub mod parser;
mod sink;

pub use capture::{Capture, CaptureError, CommandCapture};
pub use collector::{Collector, CollectorError, CollectorState};
pub use mock::{MockCapture, MockStep};
pub use parser::{ParseError, parse, parse_region_line, parse_size};
pub use sink::{ChannelSink, DeliveryError, FnSink, SnapshotSink, from_fn};
