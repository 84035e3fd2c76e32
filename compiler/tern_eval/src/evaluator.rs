//! The seam between statement execution and the host's expression language.
//!
//! The executor never looks inside an expression. Everything an expression
//! does (arithmetic, comparison, calls, indexing, member access) happens in
//! an [`ExprEvaluator`] supplied by the host. Evaluators that run function
//! bodies call back into [`Interpreter::call_body`].

use tern_ir::AssignOp;

use crate::{FunctionValue, Interpreter, Raise, Scope, Value};

/// Host-provided expression evaluation.
pub trait ExprEvaluator: Send + Sync + Sized + 'static {
    /// The host's expression node type.
    type Expr: Send + Sync;

    /// Evaluate `expr` in `scope`.
    fn eval(
        &self,
        interp: &Interpreter<Self>,
        expr: &Self::Expr,
        scope: &Scope,
    ) -> Result<Value, Raise>;

    /// Write `value` into an index or member place such as `m["k"]` or `obj.f`.
    fn assign(
        &self,
        interp: &Interpreter<Self>,
        place: &Self::Expr,
        value: Value,
        scope: &Scope,
    ) -> Result<(), Raise>;

    /// Combine `current` and `rhs` for a compound assignment (`+=`, `<<=`, ...).
    ///
    /// Never called with [`AssignOp::Assign`].
    fn apply_compound(&self, op: AssignOp, current: Value, rhs: Value) -> Result<Value, Raise>;

    /// Evaluate the callee and arguments of a call expression without invoking it.
    ///
    /// Returns `Ok(None)` when `expr` is not a call.
    fn prepare_call(
        &self,
        interp: &Interpreter<Self>,
        expr: &Self::Expr,
        scope: &Scope,
    ) -> Result<Option<PendingCall>, Raise>;
}

/// A call whose callee and arguments are already evaluated.
#[derive(Clone, Debug)]
pub struct PendingCall {
    pub callee: FunctionValue,
    pub args: Vec<Value>,
}

impl PendingCall {
    pub fn new(callee: FunctionValue, args: Vec<Value>) -> Self {
        PendingCall { callee, args }
    }

    pub fn invoke(self) -> Result<Value, Raise> {
        self.callee.call(self.args)
    }
}
