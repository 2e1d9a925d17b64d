//! Running the sampling utility.
//!
//! The `Capture` trait lets the collector work with the real `vmmap` process
//! or with a scripted mock for testing.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use thiserror::Error;
use tracing::{debug, trace};

use crate::config::CaptureConfig;

/// Upper bound on the stderr text kept for error messages.
const MAX_STDERR_BYTES: u64 = 64 * 1024;

/// Errors from one invocation of the sampling utility.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with status {code}: {stderr}")]
    NonZeroExit {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("'{program}' was terminated by a signal")]
    Terminated { program: String },

    #[error("failed to read output of '{program}': {source}")]
    Read {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("output of '{program}' exceeded {limit} bytes")]
    OutputTooLarge { program: String, limit: usize },
}

/// Source of raw memory map reports.
pub trait Capture: Send {
    /// Produces the report text for process `pid`.
    fn capture(&mut self, pid: u32) -> Result<String, CaptureError>;
}

impl<C: Capture + ?Sized> Capture for Box<C> {
    fn capture(&mut self, pid: u32) -> Result<String, CaptureError> {
        (**self).capture(pid)
    }
}

/// Runs an external program as `<program> <pid>` and returns its stdout.
#[derive(Debug, Clone)]
pub struct CommandCapture {
    program: PathBuf,
    max_output_bytes: usize,
}

impl CommandCapture {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            program: config.program.clone(),
            max_output_bytes: config.max_output_bytes,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Kills and reaps a child we are abandoning.
    fn discard(child: &mut Child) {
        let _ = child.kill();
        let _ = child.wait();
    }
}

impl Default for CommandCapture {
    fn default() -> Self {
        Self::new(&CaptureConfig::default())
    }
}

impl Capture for CommandCapture {
    fn capture(&mut self, pid: u32) -> Result<String, CaptureError> {
        let program = self.program_name();
        debug!(program = %program, pid, "running capture");

        let mut child = Command::new(&self.program)
            .arg(pid.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: program.clone(),
                source,
            })?;

        // stderr is drained on its own thread so a chatty child cannot block
        // on a full stderr pipe while we are still reading stdout.
        let stderr_reader = child.stderr.take().and_then(|stderr| {
            thread::Builder::new()
                .name("vmtrail-stderr".to_string())
                .spawn(move || {
                    let mut buf = Vec::new();
                    let _ = stderr.take(MAX_STDERR_BYTES).read_to_end(&mut buf);
                    String::from_utf8_lossy(&buf).trim().to_string()
                })
                .ok()
        });

        let Some(mut stdout) = child.stdout.take() else {
            Self::discard(&mut child);
            return Err(CaptureError::Read {
                program,
                source: io::Error::other("stdout was not captured"),
            });
        };

        // Read one byte past the ceiling so an exact fit is not an overflow.
        let limit = self.max_output_bytes;
        let mut buf = Vec::with_capacity(limit.min(256 * 1024));
        let read = (&mut stdout)
            .take((limit as u64).saturating_add(1))
            .read_to_end(&mut buf);
        drop(stdout);

        if let Err(source) = read {
            Self::discard(&mut child);
            return Err(CaptureError::Read { program, source });
        }
        if buf.len() > limit {
            Self::discard(&mut child);
            return Err(CaptureError::OutputTooLarge { program, limit });
        }

        let status = child.wait().map_err(|source| CaptureError::Read {
            program: program.clone(),
            source,
        })?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(match status.code() {
                Some(code) => CaptureError::NonZeroExit {
                    program,
                    code,
                    stderr,
                },
                None => CaptureError::Terminated { program },
            });
        }

        trace!(bytes = buf.len(), "capture complete");
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
