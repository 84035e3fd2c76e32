//! Loops and try/catch/finally.

use tern_ir::{Block, CForStmt, ForInStmt, LoopStmt, TryStmt};
use tern_stack::ensure_sufficient_stack;

use super::{check_cancelled, Cx, Interpreter};
use crate::control::{to_loop_action, Completion, ControlSignal, LoopAction};
use crate::errors::{cardinality_mismatch, not_iterable, RuntimeError};
use crate::{ExprEvaluator, Raise, Scope, Value};

impl<V: ExprEvaluator> Interpreter<V> {
    /// Body, then catch for a throw, then finally on every exit path.
    ///
    /// A non-`None` signal from finally replaces the pending one.
    pub(super) fn exec_try(
        &self,
        stmt: &TryStmt<V::Expr>,
        scope: &Scope,
        cx: Cx,
    ) -> Result<Completion, Raise> {
        let mut pending = self.run_child_block(&stmt.body, scope, cx)?;

        if let Some(catch) = &stmt.catch {
            let thrown = match &pending.signal {
                ControlSignal::Throw { value, .. } => Some(value.clone()),
                _ => None,
            };
            if let Some(value) = thrown {
                let catch_scope = scope.new_child();
                if let Some(var) = &catch.var {
                    catch_scope.define(var.clone(), value);
                }
                pending =
                    ensure_sufficient_stack(|| self.run_block(&catch.body, &catch_scope, cx))?;
            }
        }

        if let Some(finally) = &stmt.finally {
            let outcome = self.run_child_block(finally, scope, cx)?;
            if !outcome.is_normal() {
                return Ok(outcome);
            }
        }
        Ok(pending)
    }

    /// Range loop. Each iteration binds the loop variables in its own child scope.
    pub(super) fn exec_for_in(
        &self,
        stmt: &ForInStmt<V::Expr>,
        scope: &Scope,
        cx: Cx,
    ) -> Result<Completion, Raise> {
        let iterable = self.eval(&stmt.iterable, scope)?;
        let rows = iteration_rows(iterable, stmt.vars.len())?;
        let body_cx = cx.enter_loop();

        for row in rows {
            check_cancelled()?;
            let iteration = scope.new_child();
            for (name, value) in stmt.vars.iter().zip(row) {
                iteration.define(name.clone(), value);
            }
            let outcome = ensure_sufficient_stack(|| self.run_block(&stmt.body, &iteration, body_cx))?;
            match to_loop_action(outcome.signal) {
                LoopAction::Next => {}
                LoopAction::Break => break,
                LoopAction::Exit(signal) => return Ok(Completion::signal(signal)),
            }
        }
        Ok(Completion::empty())
    }

    /// `for init; condition; update { }`.
    ///
    /// Init runs once in a loop scope shared by condition and update; each
    /// iteration's body gets a child of it. Update also runs after `continue`.
    pub(super) fn exec_c_for(
        &self,
        stmt: &CForStmt<V::Expr>,
        scope: &Scope,
        cx: Cx,
    ) -> Result<Completion, Raise> {
        let loop_scope = scope.new_child();
        if let Some(init) = &stmt.init {
            let outcome = self.run_stmt(init, &loop_scope, cx)?;
            if !outcome.is_normal() {
                return Ok(Completion::signal(outcome.signal));
            }
        }

        let body_cx = cx.enter_loop();
        loop {
            check_cancelled()?;
            if let Some(condition) = &stmt.condition {
                if !self.eval(condition, &loop_scope)?.is_truthy() {
                    break;
                }
            }
            if let Some(exit) = self.run_iteration(&stmt.body, &loop_scope, body_cx)? {
                return Ok(exit);
            }
            if let Some(update) = &stmt.update {
                self.eval(update, &loop_scope)?;
            }
        }
        Ok(Completion::empty())
    }

    /// `for condition { }`, or `for { }` which runs until break, return or throw.
    pub(super) fn exec_loop(
        &self,
        stmt: &LoopStmt<V::Expr>,
        scope: &Scope,
        cx: Cx,
    ) -> Result<Completion, Raise> {
        let body_cx = cx.enter_loop();
        loop {
            check_cancelled()?;
            if let Some(condition) = &stmt.condition {
                if !self.eval(condition, scope)?.is_truthy() {
                    break;
                }
            }
            if let Some(exit) = self.run_iteration(&stmt.body, scope, body_cx)? {
                return Ok(exit);
            }
        }
        Ok(Completion::empty())
    }

    /// Run one loop iteration.
    ///
    /// `Ok(None)` keeps looping. `Ok(Some(_))` leaves the loop with that
    /// completion: empty after `break`, the signal after `return` or `throw`.
    fn run_iteration(
        &self,
        body: &Block<V::Expr>,
        scope: &Scope,
        body_cx: Cx,
    ) -> Result<Option<Completion>, RuntimeError> {
        let outcome = self.run_child_block(body, scope, body_cx)?;
        Ok(match to_loop_action(outcome.signal) {
            LoopAction::Next => None,
            LoopAction::Break => Some(Completion::empty()),
            LoopAction::Exit(signal) => Some(Completion::signal(signal)),
        })
    }
}

/// Materialize the bindings of a range loop, one row per iteration.
///
/// - list, one variable: each element
/// - list, several variables: each element is a list unpacked positionally,
///   missing positions bound to `nil`
/// - map: the key, or key and value, in key order
/// - string, one variable: each character
fn iteration_rows(iterable: Value, arity: usize) -> Result<Vec<Vec<Value>>, RuntimeError> {
    match iterable {
        Value::List(items) if arity <= 1 => Ok(items.into_iter().map(|item| vec![item]).collect()),
        Value::List(items) => items
            .into_iter()
            .map(|item| match item {
                Value::List(mut parts) => {
                    parts.resize(arity, Value::Nil);
                    Ok(parts)
                }
                _ => Err(cardinality_mismatch(arity, 1)),
            })
            .collect(),
        Value::Map(entries) => match arity {
            0 | 1 => Ok(entries.into_keys().map(|key| vec![Value::Str(key)]).collect()),
            2 => Ok(entries
                .into_iter()
                .map(|(key, value)| vec![Value::Str(key), value])
                .collect()),
            _ => Err(cardinality_mismatch(arity, 2)),
        },
        Value::Str(text) if arity <= 1 => Ok(text
            .chars()
            .map(|c| vec![Value::Str(c.to_string())])
            .collect()),
        Value::Str(_) => Err(cardinality_mismatch(arity, 1)),
        other => Err(not_iterable(&other)),
    }
}
