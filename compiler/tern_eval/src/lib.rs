#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
//! Tern Eval - statement execution engine for the Tern scripting language.
//!
//! This crate walks the statement tree from `tern_ir` against a live variable
//! environment. Expressions stay opaque: the host supplies an
//! [`ExprEvaluator`] and the executor calls it for every expression node.
//!
//! # Architecture
//!
//! - [`Scope`]: chained, shared, lock-guarded variable environment
//! - [`ControlSignal`] / [`Completion`]: the outcome of each statement, threaded
//!   upward until a loop, call boundary or `try` consumes it
//! - [`Interpreter`]: exhaustive dispatch over `Stmt<E>`
//! - [`ModuleRegistry`]: module scopes for `module.member` lookups
//! - [`TaskScheduler`]: runs `spawn` statements without blocking, reporting
//!   failures to an error sink
//!
//! # Errors
//!
//! Scripted exceptions are control signals and can be caught. Structural
//! errors ([`RuntimeError`]) abort the running `execute` and cannot.

mod control;
mod diagnostics;
mod environment;
pub mod error_sink;
pub mod errors;
mod evaluator;
pub mod interpreter;
mod module_registration;
mod shared;
pub mod spawn;
mod value;

#[cfg(test)]
pub(crate) mod test_helpers;
#[cfg(test)]
mod tests;

use std::sync::Once;

pub use control::{collapse_values, to_loop_action, Completion, ControlSignal, LoopAction};
pub use diagnostics::{call_depth, CallDepthGuard};
pub use environment::Scope;
pub use error_sink::{
    buffer_sink, callback_sink, log_sink, ErrorSinkImpl, SharedErrorSink, SpawnFailure,
};
pub use errors::{ErrorKind, Raise, RuntimeError};
pub use evaluator::{ExprEvaluator, PendingCall};
pub use interpreter::{ExecConfig, Execution, Interpreter, InterpreterBuilder};
pub use module_registration::ModuleRegistry;
pub use shared::SharedMutableRegistry;
pub use spawn::{SharedScheduler, SpawnStrategy, TaskHandle, TaskId, TaskScheduler, TaskStatus};
pub use value::{Callable, FunctionValue, Value};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=tern_eval=debug` or `RUST_LOG=tern_eval=trace`
/// (trace level emits a span per executed statement).
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            let installed = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
            if installed.is_err() {
                tracing::debug!("a global subscriber was already installed");
            }
        }
    });
}
