//! Statement dispatch and the straight-line statement forms.

use std::sync::Arc;

use tern_ir::{IfStmt, ModuleStmt, ReturnStmt, SpawnStmt, Stmt, SwitchStmt, ThrowStmt, VarStmt};
use tern_stack::ensure_sufficient_stack;

use super::{Cx, Interpreter};
use crate::control::{Completion, ControlSignal};
use crate::errors::{
    break_outside_loop, cardinality_mismatch, continue_outside_loop, module_escape, not_invokable,
    return_outside_function,
};
use crate::{ExprEvaluator, Raise, Scope, Value};

impl<V: ExprEvaluator> Interpreter<V> {
    /// Exhaustive dispatch over the statement taxonomy.
    pub(super) fn dispatch(
        &self,
        stmt: &Stmt<V::Expr>,
        scope: &Scope,
        cx: Cx,
    ) -> Result<Completion, Raise> {
        match stmt {
            Stmt::Expr(s) => Ok(Completion::value(self.eval(&s.expr, scope)?)),
            Stmt::If(s) => self.exec_if(s, scope, cx),
            Stmt::Try(s) => self.exec_try(s, scope, cx),
            Stmt::ForIn(s) => self.exec_for_in(s, scope, cx),
            Stmt::CFor(s) => self.exec_c_for(s, scope, cx),
            Stmt::Loop(s) => self.exec_loop(s, scope, cx),
            Stmt::Break(position) => {
                if !cx.in_loop() {
                    return Err(break_outside_loop().at(*position).into());
                }
                Ok(Completion::signal(ControlSignal::Break))
            }
            Stmt::Continue(position) => {
                if !cx.in_loop() {
                    return Err(continue_outside_loop().at(*position).into());
                }
                Ok(Completion::signal(ControlSignal::Continue))
            }
            Stmt::Return(s) => self.exec_return(s, scope, cx),
            Stmt::Throw(s) => self.exec_throw(s, scope),
            Stmt::Module(s) => self.exec_module(s, scope),
            Stmt::Switch(s) => self.exec_switch(s, scope, cx),
            Stmt::Var(s) => self.exec_var(s, scope),
            Stmt::Assign(s) => self.exec_assign(s, scope),
            Stmt::MapItemAssign(s) => self.exec_map_item_assign(s, scope),
            Stmt::Spawn(s) => self.exec_spawn(s, scope),
        }
    }

    /// The first branch whose condition is truthy runs; otherwise the else body.
    fn exec_if(&self, stmt: &IfStmt<V::Expr>, scope: &Scope, cx: Cx) -> Result<Completion, Raise> {
        for branch in &stmt.branches {
            let condition = self
                .eval(&branch.condition, scope)
                .map_err(|raise| raise.or_position(branch.position))?;
            if condition.is_truthy() {
                return Ok(self.run_child_block(&branch.body, scope, cx)?);
            }
        }
        match &stmt.else_body {
            Some(body) => Ok(self.run_child_block(body, scope, cx)?),
            None => Ok(Completion::empty()),
        }
    }

    fn exec_return(
        &self,
        stmt: &ReturnStmt<V::Expr>,
        scope: &Scope,
        cx: Cx,
    ) -> Result<Completion, Raise> {
        if !cx.callable {
            return Err(return_outside_function().at(stmt.position).into());
        }
        let values = self.eval_all(&stmt.values, scope)?;
        Ok(Completion::signal(ControlSignal::Return(values)))
    }

    fn exec_throw(&self, stmt: &ThrowStmt<V::Expr>, scope: &Scope) -> Result<Completion, Raise> {
        let value = self.eval(&stmt.value, scope)?;
        Ok(Completion::signal(ControlSignal::Throw {
            value,
            position: stmt.position,
        }))
    }

    /// Run the body in a child scope and register that scope under the module name.
    fn exec_module(&self, stmt: &ModuleStmt<V::Expr>, scope: &Scope) -> Result<Completion, Raise> {
        let module_scope = scope.new_child();
        let outcome =
            ensure_sufficient_stack(|| self.run_block(&stmt.body, &module_scope, Cx::module()))?;
        if !outcome.is_normal() {
            return Err(module_escape(stmt.name.as_str(), outcome.signal.keyword())
                .at(stmt.position)
                .into());
        }
        self.modules.register(stmt.name.clone(), module_scope);
        Ok(Completion::empty())
    }

    /// The subject is evaluated once; case values are evaluated in order
    /// until one matches. Cases never fall through.
    fn exec_switch(
        &self,
        stmt: &SwitchStmt<V::Expr>,
        scope: &Scope,
        cx: Cx,
    ) -> Result<Completion, Raise> {
        let subject = self.eval(&stmt.subject, scope)?;
        for case in &stmt.cases {
            for candidate in &case.values {
                let candidate = self
                    .eval(candidate, scope)
                    .map_err(|raise| raise.or_position(case.position))?;
                if candidate.equals(&subject) {
                    return Ok(self.run_child_block(&case.body, scope, cx)?);
                }
            }
        }
        match &stmt.default {
            Some(body) => Ok(self.run_child_block(body, scope, cx)?),
            None => Ok(Completion::empty()),
        }
    }

    /// Always defines new bindings in the current scope.
    ///
    /// Names without a paired value are bound to `nil`. Several names with a
    /// single list value of the same length unpack it; a list of any other
    /// length is bound whole to the first name.
    fn exec_var(&self, stmt: &VarStmt<V::Expr>, scope: &Scope) -> Result<Completion, Raise> {
        let names = stmt.names.len();
        let mut values = self.eval_all(&stmt.values, scope)?;
        if values.len() > names {
            return Err(cardinality_mismatch(names, values.len()).into());
        }
        if names > 1 && values.len() == 1 {
            if let Some(Value::List(items)) = values.first() {
                if items.len() == names {
                    values = items.clone();
                }
            }
        }
        let mut values = values.into_iter();
        for name in &stmt.names {
            scope.define(name.clone(), values.next().unwrap_or_default());
        }
        Ok(Completion::empty())
    }

    /// Prepare the call in the current context, then hand it to the scheduler
    /// without waiting for it.
    fn exec_spawn(&self, stmt: &SpawnStmt<V::Expr>, scope: &Scope) -> Result<Completion, Raise> {
        let Some(call) = self.evaluator.prepare_call(self, &stmt.call, scope)? else {
            return Err(not_invokable().at(stmt.position).into());
        };
        self.scheduler
            .spawn(call, stmt.position, Arc::clone(&self.error_sink));
        Ok(Completion::empty())
    }
}
