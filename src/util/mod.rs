//! Utility modules for vmtrail.

mod clock;

pub use clock::{MonotonicClock, epoch_millis};
