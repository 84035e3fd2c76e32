//! Tree-walking statement executor.
//!
//! [`Interpreter`] walks a `Stmt<E>` tree against a [`Scope`], delegating
//! every expression to the host's [`ExprEvaluator`]. Statement handlers return
//! a [`Completion`]; lists stop at the first non-`None` signal and hand it to
//! the nearest construct that consumes it.
//!
//! Structural errors ([`RuntimeError`]) are not signals. They unwind straight
//! out of the running `execute` or `call_body`, skipping `finally` bodies.

mod assign;
mod builder;
mod control_flow;
mod statements;

use std::sync::Arc;

use tern_ir::{HasPosition, Stmt};
use tern_stack::ensure_sufficient_stack;

use crate::control::{collapse_values, Completion, ControlSignal};
use crate::diagnostics::CallDepthGuard;
use crate::error_sink::SharedErrorSink;
use crate::errors::{
    break_outside_loop, cancelled, continue_outside_loop, uncaught_throw, RuntimeError,
};
use crate::module_registration::ModuleRegistry;
use crate::spawn::{self, SharedScheduler};
use crate::{ExprEvaluator, Raise, Scope, Value};

pub use builder::InterpreterBuilder;

/// Call depth limit applied when the host does not choose one.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Resolved execution policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecConfig {
    /// Maximum nesting of call boundaries per thread; `None` is unlimited.
    pub max_call_depth: Option<usize>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        ExecConfig {
            max_call_depth: Some(DEFAULT_MAX_CALL_DEPTH),
        }
    }
}

/// Outcome of [`Interpreter::execute`].
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Execution {
    /// Last value produced, or the collapsed return value after a `return`.
    pub value: Option<Value>,
    /// `None`, or `Return` when the script ended with a `return`.
    pub signal: ControlSignal,
}

/// Statement-level context threaded through nested blocks.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Cx {
    /// Enclosing loops up to the nearest call or module boundary.
    loop_depth: u32,
    /// Whether `return` has a call boundary to return to.
    callable: bool,
}

impl Cx {
    /// Fresh call boundary: `execute` and `call_body`.
    fn function() -> Self {
        Cx {
            loop_depth: 0,
            callable: true,
        }
    }

    /// Module body: nothing may escape it.
    fn module() -> Self {
        Cx {
            loop_depth: 0,
            callable: false,
        }
    }

    /// Host-driven blocks: every signal is handed back to the caller.
    fn open() -> Self {
        Cx {
            loop_depth: 1,
            callable: true,
        }
    }

    fn enter_loop(self) -> Self {
        Cx {
            loop_depth: self.loop_depth.saturating_add(1),
            ..self
        }
    }

    fn in_loop(self) -> bool {
        self.loop_depth > 0
    }
}

/// Statement executor handle.
///
/// Cloning is cheap; clones share the evaluator, module registry, scheduler
/// and error sink. Spawned units of work carry clones to other threads.
pub struct Interpreter<V: ExprEvaluator> {
    evaluator: Arc<V>,
    modules: ModuleRegistry,
    scheduler: SharedScheduler,
    error_sink: SharedErrorSink,
    config: ExecConfig,
}

impl<V: ExprEvaluator> Clone for Interpreter<V> {
    fn clone(&self) -> Self {
        Interpreter {
            evaluator: Arc::clone(&self.evaluator),
            modules: self.modules.clone(),
            scheduler: Arc::clone(&self.scheduler),
            error_sink: Arc::clone(&self.error_sink),
            config: self.config,
        }
    }
}

impl<V: ExprEvaluator> Interpreter<V> {
    /// Interpreter with default registry, thread-per-task scheduler and logging sink.
    pub fn new(evaluator: V) -> Self {
        InterpreterBuilder::new(evaluator).build()
    }

    pub fn builder(evaluator: V) -> InterpreterBuilder<V> {
        InterpreterBuilder::new(evaluator)
    }

    pub fn evaluator(&self) -> &V {
        &self.evaluator
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn scheduler(&self) -> &SharedScheduler {
        &self.scheduler
    }

    pub fn error_sink(&self) -> &SharedErrorSink {
        &self.error_sink
    }

    pub fn config(&self) -> ExecConfig {
        self.config
    }

    /// Run a top-level script in `scope`.
    ///
    /// The script is a call boundary: a `return` ends it with the collapsed
    /// return value. An uncaught throw becomes an `UncaughtThrow` error at the
    /// raise position. The statements run directly in `scope`, so top-level
    /// declarations are visible to the host afterwards.
    #[tracing::instrument(level = "debug", skip_all, fields(statements = stmts.len()))]
    pub fn execute(&self, stmts: &[Stmt<V::Expr>], scope: &Scope) -> Result<Execution, RuntimeError> {
        let _depth = CallDepthGuard::enter(self.config.max_call_depth)?;
        let completion = self.run_block(stmts, scope, Cx::function())?;
        match completion.signal {
            ControlSignal::None => Ok(Execution {
                value: completion.value,
                signal: ControlSignal::None,
            }),
            ControlSignal::Return(values) => Ok(Execution {
                value: Some(collapse_values(values.clone())),
                signal: ControlSignal::Return(values),
            }),
            ControlSignal::Throw { value, position } => {
                tracing::debug!(%position, %value, "uncaught throw");
                Err(uncaught_throw(value).at(position))
            }
            ControlSignal::Break => Err(break_outside_loop()),
            ControlSignal::Continue => Err(continue_outside_loop()),
        }
    }

    /// Run a function body in `scope` (already holding the parameters).
    ///
    /// Evaluators call this to invoke script functions. A `return` yields its
    /// collapsed values; a body that ends normally yields its last value, or
    /// `nil`. A throw escapes as [`Raise::Throw`].
    pub fn call_body(&self, body: &[Stmt<V::Expr>], scope: &Scope) -> Result<Value, Raise> {
        let _depth = CallDepthGuard::enter(self.config.max_call_depth)?;
        let completion = ensure_sufficient_stack(|| self.run_block(body, scope, Cx::function()))?;
        match completion.signal {
            ControlSignal::None => Ok(completion.value.unwrap_or_default()),
            ControlSignal::Return(values) => Ok(collapse_values(values)),
            ControlSignal::Throw { value, position } => Err(Raise::Throw {
                value,
                position: Some(position),
            }),
            ControlSignal::Break => Err(break_outside_loop().into()),
            ControlSignal::Continue => Err(continue_outside_loop().into()),
        }
    }

    /// Run `stmts` in `scope` and return the first non-`None` signal unconsumed.
    ///
    /// For hosts driving their own control constructs; `break`, `continue`
    /// and `return` are handed back rather than rejected.
    pub fn exec_block(&self, stmts: &[Stmt<V::Expr>], scope: &Scope) -> Result<Completion, RuntimeError> {
        self.run_block(stmts, scope, Cx::open())
    }

    /// Run a single statement in `scope`, handing back its signal.
    pub fn exec_stmt(&self, stmt: &Stmt<V::Expr>, scope: &Scope) -> Result<Completion, RuntimeError> {
        self.run_stmt(stmt, scope, Cx::open())
    }

    /// Resolve `module.member` for the expression evaluator.
    pub fn resolve_qualified(&self, module: &str, member: &str) -> Result<Value, RuntimeError> {
        self.modules.resolve_qualified(module, member)
    }

    pub(crate) fn run_block(
        &self,
        stmts: &[Stmt<V::Expr>],
        scope: &Scope,
        cx: Cx,
    ) -> Result<Completion, RuntimeError> {
        let mut last = None;
        for stmt in stmts {
            if spawn::cancellation_requested() {
                return Err(cancelled().at(stmt.position()));
            }
            let completion = self.run_stmt(stmt, scope, cx)?;
            let is_normal = completion.is_normal();
            if completion.value.is_some() {
                last = completion.value;
            }
            if !is_normal {
                return Ok(Completion {
                    value: last,
                    signal: completion.signal,
                });
            }
        }
        Ok(Completion {
            value: last,
            signal: ControlSignal::None,
        })
    }

    /// Run `stmts` in a fresh child of `scope`.
    fn run_child_block(
        &self,
        stmts: &[Stmt<V::Expr>],
        scope: &Scope,
        cx: Cx,
    ) -> Result<Completion, RuntimeError> {
        let child = scope.new_child();
        ensure_sufficient_stack(|| self.run_block(stmts, &child, cx))
    }

    fn run_stmt(&self, stmt: &Stmt<V::Expr>, scope: &Scope, cx: Cx) -> Result<Completion, RuntimeError> {
        let position = stmt.position();
        let _span = tracing::trace_span!("stmt", kind = stmt.kind_name(), %position).entered();
        match self.dispatch(stmt, scope, cx) {
            Ok(completion) => Ok(completion),
            Err(Raise::Throw {
                value,
                position: raised_at,
            }) => Ok(Completion::signal(ControlSignal::Throw {
                value,
                position: raised_at.unwrap_or(position),
            })),
            Err(Raise::Error(err)) => Err(err.or_position(position)),
        }
    }

    #[inline]
    fn eval(&self, expr: &V::Expr, scope: &Scope) -> Result<Value, Raise> {
        self.evaluator.eval(self, expr, scope)
    }

    /// Evaluate left to right.
    fn eval_all(&self, exprs: &[V::Expr], scope: &Scope) -> Result<Vec<Value>, Raise> {
        exprs.iter().map(|expr| self.eval(expr, scope)).collect()
    }
}

/// Fail with `Cancelled` when the running task has been asked to stop.
fn check_cancelled() -> Result<(), RuntimeError> {
    if spawn::cancellation_requested() {
        return Err(cancelled());
    }
    Ok(())
}

impl<V: ExprEvaluator + std::fmt::Debug> std::fmt::Debug for Interpreter<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("evaluator", &self.evaluator)
            .field("modules", &self.modules.names())
            .field("scheduler", &self.scheduler)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
