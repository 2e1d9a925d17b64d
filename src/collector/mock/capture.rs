//! Scripted capture source.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::collector::capture::{Capture, CaptureError};

const MOCK_PROGRAM: &str = "mock-vmmap";

/// Outcome of one scripted capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockStep {
    /// The utility printed this report and exited with status 0.
    Report(String),
    /// The utility exited with this non-zero status.
    Exit(i32),
    /// The utility printed more than the output ceiling.
    TooLarge,
}

/// Capture source that replays a script of outcomes.
///
/// Once the script is exhausted every further capture replays `fallback`.
/// The call counter is shared so a test can keep observing it after the mock
/// has been moved into a collector.
#[derive(Debug)]
pub struct MockCapture {
    steps: VecDeque<MockStep>,
    fallback: MockStep,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl MockCapture {
    /// Creates a mock that returns `step` on every capture.
    pub fn repeating(step: MockStep) -> Self {
        Self::scripted(std::iter::empty(), step)
    }

    /// Creates a mock that plays `steps` in order, then `fallback` forever.
    pub fn scripted(steps: impl IntoIterator<Item = MockStep>, fallback: MockStep) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            fallback,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Makes every capture block for `delay`, like a slow utility would.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shared counter of captures performed so far.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl Capture for MockCapture {
    fn capture(&mut self, _pid: u32) -> Result<String, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let step = self
            .steps
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match step {
            MockStep::Report(report) => Ok(report),
            MockStep::Exit(code) => Err(CaptureError::NonZeroExit {
                program: MOCK_PROGRAM.to_string(),
                code,
                stderr: format!("{MOCK_PROGRAM}: process not found"),
            }),
            MockStep::TooLarge => Err(CaptureError::OutputTooLarge {
                program: MOCK_PROGRAM.to_string(),
                limit: 0,
            }),
        }
    }
}
