//! `InterpreterBuilder` for creating Interpreter instances with various configurations.

use std::sync::Arc;

use super::{ExecConfig, Interpreter};
use crate::error_sink::{log_sink, SharedErrorSink};
use crate::module_registration::ModuleRegistry;
use crate::spawn::{SharedScheduler, SpawnStrategy, TaskScheduler};
use crate::ExprEvaluator;

/// Builder for [`Interpreter`].
///
/// Only the evaluator is required. Defaults: a fresh module registry, a
/// thread-per-task scheduler, the logging error sink, and a call depth limit
/// of [`DEFAULT_MAX_CALL_DEPTH`](super::DEFAULT_MAX_CALL_DEPTH).
pub struct InterpreterBuilder<V: ExprEvaluator> {
    evaluator: Arc<V>,
    modules: Option<ModuleRegistry>,
    scheduler: Option<SharedScheduler>,
    spawn_strategy: SpawnStrategy,
    error_sink: Option<SharedErrorSink>,
    config: ExecConfig,
}

impl<V: ExprEvaluator> InterpreterBuilder<V> {
    pub fn new(evaluator: V) -> Self {
        Self::with_shared_evaluator(Arc::new(evaluator))
    }

    /// Start from an evaluator already shared with other interpreters.
    pub fn with_shared_evaluator(evaluator: Arc<V>) -> Self {
        InterpreterBuilder {
            evaluator,
            modules: None,
            scheduler: None,
            spawn_strategy: SpawnStrategy::default(),
            error_sink: None,
            config: ExecConfig::default(),
        }
    }

    /// Share an existing module registry.
    #[must_use]
    pub fn modules(mut self, modules: ModuleRegistry) -> Self {
        self.modules = Some(modules);
        self
    }

    /// Share an existing scheduler. Overrides [`spawn_strategy`](Self::spawn_strategy).
    #[must_use]
    pub fn scheduler(mut self, scheduler: SharedScheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Strategy for a scheduler created by `build`.
    #[must_use]
    pub fn spawn_strategy(mut self, strategy: SpawnStrategy) -> Self {
        self.spawn_strategy = strategy;
        self
    }

    /// Where failures of spawned tasks are reported.
    #[must_use]
    pub fn error_sink(mut self, sink: SharedErrorSink) -> Self {
        self.error_sink = Some(sink);
        self
    }

    /// Maximum nesting of call boundaries per thread; `None` for unlimited.
    #[must_use]
    pub fn max_call_depth(mut self, limit: Option<usize>) -> Self {
        self.config.max_call_depth = limit;
        self
    }

    pub fn build(self) -> Interpreter<V> {
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TaskScheduler::new(self.spawn_strategy)));
        Interpreter {
            evaluator: self.evaluator,
            modules: self.modules.unwrap_or_default(),
            scheduler,
            error_sink: self.error_sink.unwrap_or_else(log_sink),
            config: self.config,
        }
    }
}
