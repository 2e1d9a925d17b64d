//! vmtrail - periodic virtual memory map sampling.
//!
//! This library provides the core functionality shared between:
//! - `vmtraild` - live sampler streaming snapshots of one process as JSON lines
//! - `vmtrail` - offline summary and region lifetimes over saved captures

pub mod api;
pub mod collector;
pub mod config;
pub mod fmt;
pub mod handle;
pub mod model;
pub mod report;
pub mod tracker;
pub mod util;
