//! A tiny expression language for exercising the statement executor.
//!
//! `TestEvaluator` implements [`ExprEvaluator`] over [`TestExpr`]: literals,
//! variables, lists, a few binary operators, indexing, calls, closures and
//! qualified module lookups. [`Harness`] wires it to a root scope holding an
//! `out` builtin that records its arguments.

use std::sync::Arc;

use parking_lot::Mutex;
use tern_ir::{
    AssignOp, AssignStmt, AssignTarget, Block, CForStmt, CatchClause, ExprStmt, ForInStmt,
    LoopStmt, MapItemAssignStmt, ModuleStmt, Name, Position, ReturnStmt, SpawnStmt, Stmt,
    SwitchCase, SwitchStmt, ThrowStmt, TryStmt, VarStmt,
};

use crate::errors::invalid_operation;
use crate::{
    Callable, ExprEvaluator, Execution, FunctionValue, Interpreter, InterpreterBuilder,
    PendingCall, Raise, RuntimeError, Scope, Value,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Lt,
    Eq,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TestExpr {
    Lit(Value),
    Var(String),
    List(Vec<TestExpr>),
    Binary(BinOp, Box<TestExpr>, Box<TestExpr>),
    /// `target[key]`; a missing map key or list index reads as `nil`.
    Index(Box<TestExpr>, Box<TestExpr>),
    Call(Box<TestExpr>, Vec<TestExpr>),
    /// Function literal; captures the scope it is evaluated in.
    Func(Arc<FuncDef>),
    /// `module.member`
    Member(String, String),
    /// Raises a structural `InvalidOperation` error.
    Fail(String),
    /// Raises the value as a scripted exception from inside an expression.
    Raise(Box<TestExpr>),
    /// Assignment expression `name = value`, yielding the value.
    Set(String, Box<TestExpr>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncDef {
    pub name: String,
    pub params: Vec<Name>,
    pub body: Block<TestExpr>,
}

/// A function literal closed over its defining scope.
struct ScriptFunction {
    def: Arc<FuncDef>,
    closure: Scope,
    interp: Interpreter<TestEvaluator>,
}

impl Callable for ScriptFunction {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn call(&self, args: Vec<Value>) -> Result<Value, Raise> {
        let frame = self.closure.new_child();
        let mut args = args.into_iter();
        for param in &self.def.params {
            frame.define(param.clone(), args.next().unwrap_or_default());
        }
        self.interp.call_body(&self.def.body, &frame)
    }
}

#[derive(Debug, Default)]
pub struct TestEvaluator;

impl TestEvaluator {
    fn eval_callee(
        &self,
        interp: &Interpreter<Self>,
        callee: &TestExpr,
        args: &[TestExpr],
        scope: &Scope,
    ) -> Result<PendingCall, Raise> {
        let Value::Function(function) = self.eval(interp, callee, scope)? else {
            return Err(invalid_operation("value is not callable").into());
        };
        let args = args
            .iter()
            .map(|arg| self.eval(interp, arg, scope))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PendingCall::new(function, args))
    }
}

impl ExprEvaluator for TestEvaluator {
    type Expr = TestExpr;

    fn eval(
        &self,
        interp: &Interpreter<Self>,
        expr: &TestExpr,
        scope: &Scope,
    ) -> Result<Value, Raise> {
        match expr {
            TestExpr::Lit(value) => Ok(value.clone()),
            TestExpr::Var(name) => Ok(scope.get(name)?),
            TestExpr::List(items) => items
                .iter()
                .map(|item| self.eval(interp, item, scope))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            TestExpr::Binary(op, left, right) => {
                let left = self.eval(interp, left, scope)?;
                let right = self.eval(interp, right, scope)?;
                binary(*op, left, right)
            }
            TestExpr::Index(target, key) => {
                let target = self.eval(interp, target, scope)?;
                let key = self.eval(interp, key, scope)?;
                index_value(&target, &key)
            }
            TestExpr::Call(callee, args) => self.eval_callee(interp, callee, args, scope)?.invoke(),
            TestExpr::Func(def) => Ok(Value::function(ScriptFunction {
                def: Arc::clone(def),
                closure: scope.clone(),
                interp: interp.clone(),
            })),
            TestExpr::Member(module, member) => Ok(interp.resolve_qualified(module, member)?),
            TestExpr::Fail(message) => Err(invalid_operation(message.clone()).into()),
            TestExpr::Raise(value) => Err(Raise::throw(self.eval(interp, value, scope)?)),
            TestExpr::Set(name, value) => {
                let value = self.eval(interp, value, scope)?;
                scope.set(name, value.clone())?;
                Ok(value)
            }
        }
    }

    fn assign(
        &self,
        interp: &Interpreter<Self>,
        place: &TestExpr,
        value: Value,
        scope: &Scope,
    ) -> Result<(), Raise> {
        let TestExpr::Index(target, key) = place else {
            return Err(invalid_operation("invalid assignment target").into());
        };
        let TestExpr::Var(name) = target.as_ref() else {
            return Err(invalid_operation("only variables can be indexed for assignment").into());
        };
        let key = self.eval(interp, key, scope)?;
        let mut container = scope.get(name)?;
        match (&mut container, key) {
            (Value::Map(entries), Value::Str(key)) => {
                entries.insert(key, value);
            }
            (Value::List(items), Value::Int(i)) => {
                let slot = usize::try_from(i)
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(|| invalid_operation("index out of range"))?;
                *slot = value;
            }
            _ => return Err(invalid_operation("cannot index-assign").into()),
        }
        Ok(scope.set(name, container)?)
    }

    fn apply_compound(&self, op: AssignOp, current: Value, rhs: Value) -> Result<Value, Raise> {
        let op = match op {
            AssignOp::Add => BinOp::Add,
            AssignOp::Sub => BinOp::Sub,
            AssignOp::Mul => BinOp::Mul,
            other => {
                return Err(invalid_operation(format!("unsupported operator {other}")).into());
            }
        };
        binary(op, current, rhs)
    }

    fn prepare_call(
        &self,
        interp: &Interpreter<Self>,
        expr: &TestExpr,
        scope: &Scope,
    ) -> Result<Option<PendingCall>, Raise> {
        match expr {
            TestExpr::Call(callee, args) => self.eval_callee(interp, callee, args, scope).map(Some),
            _ => Ok(None),
        }
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "mixed int/float arithmetic follows float semantics"
)]
fn binary(op: BinOp, left: Value, right: Value) -> Result<Value, Raise> {
    let value = match (op, left, right) {
        (BinOp::Eq, l, r) => Value::Bool(l.equals(&r)),
        (BinOp::Add, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
        (BinOp::Sub, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_sub(b)),
        (BinOp::Mul, Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_mul(b)),
        (BinOp::Lt, Value::Int(a), Value::Int(b)) => Value::Bool(a < b),
        (BinOp::Add, Value::Float(a), Value::Int(b)) => Value::Float(a + b as f64),
        (BinOp::Add, Value::Str(a), Value::Str(b)) => Value::Str(a + &b),
        (BinOp::Add, Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Value::List(a)
        }
        (op, l, r) => {
            return Err(invalid_operation(format!(
                "unsupported operands for {op:?}: {} and {}",
                l.type_name(),
                r.type_name()
            ))
            .into());
        }
    };
    Ok(value)
}

fn index_value(target: &Value, key: &Value) -> Result<Value, Raise> {
    match (target, key) {
        (Value::Map(entries), Value::Str(key)) => Ok(entries.get(key).cloned().unwrap_or_default()),
        (Value::List(items), Value::Int(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or_default()),
        _ => Err(invalid_operation(format!("cannot index {}", target.type_name())).into()),
    }
}

/// `out(...)` builtin: records one value per call (a list when called with
/// several arguments).
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Value>>>);

impl Recorder {
    pub fn values(&self) -> Vec<Value> {
        self.0.lock().clone()
    }
}

impl Callable for Recorder {
    fn name(&self) -> &str {
        "out"
    }

    fn call(&self, args: Vec<Value>) -> Result<Value, Raise> {
        self.0.lock().push(crate::collapse_values(args));
        Ok(Value::Nil)
    }
}

/// Interpreter, root scope and `out` recorder.
pub struct Harness {
    pub interp: Interpreter<TestEvaluator>,
    pub scope: Scope,
    pub out: Recorder,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with(|builder| builder)
    }

    pub fn with(
        configure: impl FnOnce(InterpreterBuilder<TestEvaluator>) -> InterpreterBuilder<TestEvaluator>,
    ) -> Self {
        crate::init_tracing();
        let interp = configure(Interpreter::builder(TestEvaluator)).build();
        let scope = Scope::new();
        let out = Recorder::default();
        scope.define("out", Value::Function(FunctionValue::new(out.clone())));
        Harness { interp, scope, out }
    }

    pub fn run(&self, stmts: &[Stmt<TestExpr>]) -> Result<Execution, RuntimeError> {
        self.interp.execute(stmts, &self.scope)
    }

    /// Values recorded by `out`, in call order.
    pub fn output(&self) -> Vec<Value> {
        self.out.values()
    }

    pub fn get(&self, name: &str) -> Value {
        self.scope.get(name).unwrap()
    }
}

// Positions

pub fn at(line: u32) -> Position {
    Position::new(line, 1)
}

const P: Position = Position::DUMMY;

// Expressions

pub fn int(n: i64) -> TestExpr {
    TestExpr::Lit(Value::Int(n))
}

pub fn text(s: &str) -> TestExpr {
    TestExpr::Lit(Value::string(s))
}

pub fn nil() -> TestExpr {
    TestExpr::Lit(Value::Nil)
}

pub fn boolean(b: bool) -> TestExpr {
    TestExpr::Lit(Value::Bool(b))
}

pub fn map(entries: &[(&str, Value)]) -> TestExpr {
    TestExpr::Lit(Value::Map(
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect(),
    ))
}

pub fn var(name: &str) -> TestExpr {
    TestExpr::Var(name.to_string())
}

pub fn list(items: Vec<TestExpr>) -> TestExpr {
    TestExpr::List(items)
}

pub fn bin(op: BinOp, left: TestExpr, right: TestExpr) -> TestExpr {
    TestExpr::Binary(op, Box::new(left), Box::new(right))
}

pub fn add(left: TestExpr, right: TestExpr) -> TestExpr {
    bin(BinOp::Add, left, right)
}

pub fn lt(left: TestExpr, right: TestExpr) -> TestExpr {
    bin(BinOp::Lt, left, right)
}

pub fn eq(left: TestExpr, right: TestExpr) -> TestExpr {
    bin(BinOp::Eq, left, right)
}

pub fn index(target: TestExpr, key: TestExpr) -> TestExpr {
    TestExpr::Index(Box::new(target), Box::new(key))
}

pub fn call(name: &str, args: Vec<TestExpr>) -> TestExpr {
    TestExpr::Call(Box::new(var(name)), args)
}

pub fn func(name: &str, params: &[&str], body: Block<TestExpr>) -> TestExpr {
    TestExpr::Func(Arc::new(FuncDef {
        name: name.to_string(),
        params: params.iter().map(|p| Name::new(p)).collect(),
        body,
    }))
}

pub fn member(module: &str, name: &str) -> TestExpr {
    TestExpr::Member(module.to_string(), name.to_string())
}

pub fn fail(message: &str) -> TestExpr {
    TestExpr::Fail(message.to_string())
}

pub fn raise(value: TestExpr) -> TestExpr {
    TestExpr::Raise(Box::new(value))
}

pub fn set(name: &str, value: TestExpr) -> TestExpr {
    TestExpr::Set(name.to_string(), Box::new(value))
}

// Statements

pub fn expr(e: TestExpr) -> Stmt<TestExpr> {
    Stmt::Expr(ExprStmt {
        expr: e,
        position: P,
    })
}

pub fn out(args: Vec<TestExpr>) -> Stmt<TestExpr> {
    expr(call("out", args))
}

pub fn define(names: &[&str], values: Vec<TestExpr>) -> Stmt<TestExpr> {
    Stmt::Var(VarStmt {
        names: names.iter().map(|n| Name::new(n)).collect(),
        values,
        position: P,
    })
}

/// `var name = func(params) { body }`
pub fn def(name: &str, params: &[&str], body: Block<TestExpr>) -> Stmt<TestExpr> {
    define(&[name], vec![func(name, params, body)])
}

pub fn assign(names: &[&str], values: Vec<TestExpr>) -> Stmt<TestExpr> {
    assign_op(names, AssignOp::Assign, values)
}

pub fn assign_op(names: &[&str], op: AssignOp, values: Vec<TestExpr>) -> Stmt<TestExpr> {
    Stmt::Assign(AssignStmt {
        targets: names.iter().map(|n| AssignTarget::ident(*n, P)).collect(),
        op,
        values,
        position: P,
    })
}

pub fn assign_place(place: TestExpr, op: AssignOp, value: TestExpr) -> Stmt<TestExpr> {
    Stmt::Assign(AssignStmt {
        targets: vec![AssignTarget::Place {
            expr: place,
            position: P,
        }],
        op,
        values: vec![value],
        position: P,
    })
}

pub fn map_item(names: &[&str], value: TestExpr) -> Stmt<TestExpr> {
    Stmt::MapItemAssign(MapItemAssignStmt {
        targets: names.iter().map(|n| AssignTarget::ident(*n, P)).collect(),
        value,
        position: P,
    })
}

pub fn if_else(cond: TestExpr, then: Block<TestExpr>, otherwise: Block<TestExpr>) -> Stmt<TestExpr> {
    Stmt::If(tern_ir::IfStmt::new(cond, then, P).otherwise(otherwise))
}

pub fn when(cond: TestExpr, then: Block<TestExpr>) -> Stmt<TestExpr> {
    Stmt::If(tern_ir::IfStmt::new(cond, then, P))
}

pub fn for_in(vars: &[&str], iterable: TestExpr, body: Block<TestExpr>) -> Stmt<TestExpr> {
    Stmt::ForIn(ForInStmt {
        vars: vars.iter().map(|v| Name::new(v)).collect(),
        iterable,
        body,
        position: P,
    })
}

pub fn c_for(
    init: Option<Stmt<TestExpr>>,
    condition: Option<TestExpr>,
    update: Option<TestExpr>,
    body: Block<TestExpr>,
) -> Stmt<TestExpr> {
    Stmt::CFor(CForStmt {
        init: init.map(Box::new),
        condition,
        update,
        body,
        position: P,
    })
}

pub fn while_loop(condition: Option<TestExpr>, body: Block<TestExpr>) -> Stmt<TestExpr> {
    Stmt::Loop(LoopStmt {
        condition,
        body,
        position: P,
    })
}

pub fn brk() -> Stmt<TestExpr> {
    Stmt::Break(P)
}

pub fn cont() -> Stmt<TestExpr> {
    Stmt::Continue(P)
}

pub fn ret(values: Vec<TestExpr>) -> Stmt<TestExpr> {
    Stmt::Return(ReturnStmt { values, position: P })
}

pub fn throw_at(value: TestExpr, position: Position) -> Stmt<TestExpr> {
    Stmt::Throw(ThrowStmt { value, position })
}

pub fn throw(value: TestExpr) -> Stmt<TestExpr> {
    throw_at(value, P)
}

pub fn try_stmt(
    body: Block<TestExpr>,
    catch: Option<(Option<&str>, Block<TestExpr>)>,
    finally: Option<Block<TestExpr>>,
) -> Stmt<TestExpr> {
    Stmt::Try(TryStmt {
        body,
        catch: catch.map(|(var, body)| CatchClause {
            var: var.map(Name::new),
            body,
            position: P,
        }),
        finally,
        position: P,
    })
}

pub fn module(name: &str, body: Block<TestExpr>) -> Stmt<TestExpr> {
    Stmt::Module(ModuleStmt {
        name: Name::new(name),
        body,
        position: P,
    })
}

pub fn case(values: Vec<TestExpr>, body: Block<TestExpr>) -> SwitchCase<TestExpr> {
    SwitchCase {
        values,
        body,
        position: P,
    }
}

pub fn switch(
    subject: TestExpr,
    cases: Vec<SwitchCase<TestExpr>>,
    default: Option<Block<TestExpr>>,
) -> Stmt<TestExpr> {
    Stmt::Switch(SwitchStmt {
        subject,
        cases,
        default,
        position: P,
    })
}

pub fn spawn(call_expr: TestExpr) -> Stmt<TestExpr> {
    Stmt::Spawn(SpawnStmt {
        call: call_expr,
        position: P,
    })
}
