//! Mock capture source for testing.
//!
//! This module provides `MockCapture`, which replays scripted reports instead
//! of running the sampling utility, plus pre-built report fixtures so the
//! collector can be exercised on hosts without `vmmap`.

mod capture;
pub mod scenarios;

pub use capture::{MockCapture, MockStep};
