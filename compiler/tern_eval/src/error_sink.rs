//! Side channel for failures inside spawned units of work.
//!
//! A spawned unit never reports back to the statement that spawned it. Its
//! uncaught throws and structural errors go to the interpreter's error sink
//! instead:
//! - `Log`: `tracing::error!` (default)
//! - `Buffer`: collected for the host or tests to inspect
//! - `Callback`: forwarded to a host closure
//!
//! Uses enum dispatch instead of trait objects.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tern_ir::Position;

use crate::spawn::TaskId;
use crate::Raise;

/// A failure from a spawned unit of work.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnFailure {
    pub task: TaskId,
    /// Position of the spawn statement that launched the task.
    pub position: Position,
    pub raise: Raise,
}

impl fmt::Display for SpawnFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} spawned at {} failed: {}",
            self.task, self.position, self.raise
        )
    }
}

/// Sink that captures failures in memory.
#[derive(Default)]
pub struct BufferErrorSink {
    failures: Mutex<Vec<SpawnFailure>>,
}

impl BufferErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self, failure: SpawnFailure) {
        self.failures.lock().push(failure);
    }

    /// Captured failures, oldest first.
    pub fn failures(&self) -> Vec<SpawnFailure> {
        self.failures.lock().clone()
    }

    /// Remove and return captured failures.
    pub fn take(&self) -> Vec<SpawnFailure> {
        std::mem::take(&mut *self.failures.lock())
    }
}

/// Host-supplied failure handler.
pub type ErrorCallback = Box<dyn Fn(&SpawnFailure) + Send + Sync>;

/// Error sink implementation using enum dispatch.
pub enum ErrorSinkImpl {
    /// Logs through `tracing` (default).
    Log,
    /// Captures for inspection.
    Buffer(BufferErrorSink),
    /// Forwards to a host closure.
    Callback(ErrorCallback),
}

impl ErrorSinkImpl {
    pub fn report(&self, failure: SpawnFailure) {
        match self {
            Self::Log => {
                tracing::error!(
                    task = %failure.task,
                    position = %failure.position,
                    "spawned task failed: {}",
                    failure.raise
                );
            }
            Self::Buffer(sink) => sink.report(failure),
            Self::Callback(callback) => callback(&failure),
        }
    }

    /// Captured failures; empty for sinks that don't capture.
    pub fn failures(&self) -> Vec<SpawnFailure> {
        match self {
            Self::Buffer(sink) => sink.failures(),
            Self::Log | Self::Callback(_) => Vec::new(),
        }
    }

    /// Remove and return captured failures; empty for sinks that don't capture.
    pub fn take(&self) -> Vec<SpawnFailure> {
        match self {
            Self::Buffer(sink) => sink.take(),
            Self::Log | Self::Callback(_) => Vec::new(),
        }
    }
}

impl fmt::Debug for ErrorSinkImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log => f.write_str("ErrorSinkImpl::Log"),
            Self::Buffer(sink) => write!(f, "ErrorSinkImpl::Buffer({})", sink.failures.lock().len()),
            Self::Callback(_) => f.write_str("ErrorSinkImpl::Callback"),
        }
    }
}

/// Shared error sink that can be passed around.
pub type SharedErrorSink = Arc<ErrorSinkImpl>;

/// Create the default sink, which logs failures.
pub fn log_sink() -> SharedErrorSink {
    Arc::new(ErrorSinkImpl::Log)
}

/// Create a sink that captures failures for inspection.
pub fn buffer_sink() -> SharedErrorSink {
    Arc::new(ErrorSinkImpl::Buffer(BufferErrorSink::new()))
}

/// Create a sink that forwards failures to `callback`.
pub fn callback_sink(callback: impl Fn(&SpawnFailure) + Send + Sync + 'static) -> SharedErrorSink {
    Arc::new(ErrorSinkImpl::Callback(Box::new(callback)))
}
