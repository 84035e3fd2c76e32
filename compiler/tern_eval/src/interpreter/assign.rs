//! Multi-assignment and comma-ok map item assignment.

use tern_ir::{AssignStmt, AssignTarget, MapItemAssignStmt};

use super::Interpreter;
use crate::control::Completion;
use crate::errors::{cardinality_mismatch, RuntimeError};
use crate::{ExprEvaluator, Raise, Scope, Value};

impl<V: ExprEvaluator> Interpreter<V> {
    /// `a, b = x, y`, `a, b = f()` and compound forms such as `a += x`.
    ///
    /// Every right-hand side is evaluated before any target is written.
    /// A compound update reads then writes its target; the pair is not atomic
    /// with respect to spawned tasks sharing the scope.
    pub(super) fn exec_assign(
        &self,
        stmt: &AssignStmt<V::Expr>,
        scope: &Scope,
    ) -> Result<Completion, Raise> {
        let sources = self.eval_all(&stmt.values, scope)?;
        let values = reconcile(stmt.targets.len(), sources)?;

        let mut last = Value::Nil;
        for (target, value) in stmt.targets.iter().zip(values) {
            let value = if stmt.op.is_compound() {
                let current = self.read_target(target, scope)?;
                self.evaluator
                    .apply_compound(stmt.op, current, value)
                    .map_err(|raise| raise.or_position(stmt.position))?
            } else {
                value
            };
            self.write_target(target, value.clone(), scope)?;
            last = value;
        }
        Ok(Completion::value(last))
    }

    /// `v, ok = m[k]`: the first target receives the value, the second whether
    /// it was present (not `nil`).
    pub(super) fn exec_map_item_assign(
        &self,
        stmt: &MapItemAssignStmt<V::Expr>,
        scope: &Scope,
    ) -> Result<Completion, Raise> {
        if stmt.targets.len() > 2 {
            return Err(cardinality_mismatch(stmt.targets.len(), 2).into());
        }
        let value = self.eval(&stmt.value, scope)?;
        let present = Value::Bool(!value.is_nil());
        for (target, result) in stmt.targets.iter().zip([value.clone(), present]) {
            self.write_target(target, result, scope)?;
        }
        Ok(Completion::value(value))
    }

    fn read_target(&self, target: &AssignTarget<V::Expr>, scope: &Scope) -> Result<Value, Raise> {
        match target {
            AssignTarget::Ident { name, position } => {
                scope.get(name.as_str()).map_err(|err| err.at(*position).into())
            }
            AssignTarget::Place { expr, position } => self
                .eval(expr, scope)
                .map_err(|raise| raise.or_position(*position)),
        }
    }

    fn write_target(
        &self,
        target: &AssignTarget<V::Expr>,
        value: Value,
        scope: &Scope,
    ) -> Result<(), Raise> {
        match target {
            AssignTarget::Ident { name, position } => scope
                .set(name.as_str(), value)
                .map_err(|err| err.at(*position).into()),
            AssignTarget::Place { expr, position } => self
                .evaluator
                .assign(self, expr, value, scope)
                .map_err(|raise| raise.or_position(*position)),
        }
    }
}

/// Pair right-hand values with `targets` left-hand targets.
///
/// Equal counts pair positionally. Several targets and a single list of the
/// same length unpack it. Anything else is a cardinality mismatch.
fn reconcile(targets: usize, mut values: Vec<Value>) -> Result<Vec<Value>, RuntimeError> {
    if values.len() == targets {
        return Ok(values);
    }
    if targets > 1 && values.len() == 1 {
        return match values.pop() {
            Some(Value::List(items)) if items.len() == targets => Ok(items),
            Some(Value::List(items)) => Err(cardinality_mismatch(targets, items.len())),
            _ => Err(cardinality_mismatch(targets, 1)),
        };
    }
    Err(cardinality_mismatch(targets, values.len()))
}
