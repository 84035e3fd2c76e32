//! Statement Types
//!
//! The closed statement taxonomy. `Stmt<E>` is exhaustively matched by the
//! executor, so adding a variant fails to compile until every consumer
//! handles it.
//!
//! `E` is the host's expression node type. This crate never inspects it.

use crate::{AssignOp, HasPosition, Name, Position};

/// Ordered statement list (a block body).
pub type Block<E> = Vec<Stmt<E>>;

/// Statement node.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt<E> {
    /// `expr`
    Expr(ExprStmt<E>),
    /// `if c { } else if c { } else { }`
    If(IfStmt<E>),
    /// `try { } catch e { } finally { }`
    Try(TryStmt<E>),
    /// `for a, b in value { }`
    ForIn(ForInStmt<E>),
    /// `for init; cond; update { }`
    CFor(CForStmt<E>),
    /// `for cond { }` and `for { }`
    Loop(LoopStmt<E>),
    Break(Position),
    Continue(Position),
    /// `return a, b`
    Return(ReturnStmt<E>),
    /// `throw value`
    Throw(ThrowStmt<E>),
    /// `module name { }`
    Module(ModuleStmt<E>),
    /// `switch value { case a, b: ... default: ... }`
    Switch(SwitchStmt<E>),
    /// `var a, b = x, y`
    Var(VarStmt<E>),
    /// `a, b = x, y` and `a += x`
    Assign(AssignStmt<E>),
    /// `v, ok = m[k]`
    MapItemAssign(MapItemAssignStmt<E>),
    /// `go f(x)`
    Spawn(SpawnStmt<E>),
}

impl<E> Stmt<E> {
    /// Short keyword-style label, used in traces and diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Stmt::Expr(_) => "expr",
            Stmt::If(_) => "if",
            Stmt::Try(_) => "try",
            Stmt::ForIn(_) => "for-in",
            Stmt::CFor(_) => "c-for",
            Stmt::Loop(_) => "loop",
            Stmt::Break(_) => "break",
            Stmt::Continue(_) => "continue",
            Stmt::Return(_) => "return",
            Stmt::Throw(_) => "throw",
            Stmt::Module(_) => "module",
            Stmt::Switch(_) => "switch",
            Stmt::Var(_) => "var",
            Stmt::Assign(_) => "assign",
            Stmt::MapItemAssign(_) => "map-item-assign",
            Stmt::Spawn(_) => "spawn",
        }
    }
}

impl<E> HasPosition for Stmt<E> {
    fn position(&self) -> Position {
        match self {
            Stmt::Expr(s) => s.position,
            Stmt::If(s) => s.position,
            Stmt::Try(s) => s.position,
            Stmt::ForIn(s) => s.position,
            Stmt::CFor(s) => s.position,
            Stmt::Loop(s) => s.position,
            Stmt::Break(position) | Stmt::Continue(position) => *position,
            Stmt::Return(s) => s.position,
            Stmt::Throw(s) => s.position,
            Stmt::Module(s) => s.position,
            Stmt::Switch(s) => s.position,
            Stmt::Var(s) => s.position,
            Stmt::Assign(s) => s.position,
            Stmt::MapItemAssign(s) => s.position,
            Stmt::Spawn(s) => s.position,
        }
    }
}

/// Expression evaluated for effect.
#[derive(Clone, Debug, PartialEq)]
pub struct ExprStmt<E> {
    pub expr: E,
    pub position: Position,
}

/// Conditional with an else-if chain.
///
/// `branches[0]` is the `if` itself; later entries are the `else if`s in
/// source order. The first truthy condition's body runs; otherwise `else_body`.
#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt<E> {
    pub branches: Vec<CondBranch<E>>,
    pub else_body: Option<Block<E>>,
    pub position: Position,
}

impl<E> IfStmt<E> {
    pub fn new(condition: E, then: Block<E>, position: Position) -> Self {
        IfStmt {
            branches: vec![CondBranch {
                condition,
                body: then,
                position,
            }],
            else_body: None,
            position,
        }
    }

    #[must_use]
    pub fn else_if(mut self, condition: E, body: Block<E>, position: Position) -> Self {
        self.branches.push(CondBranch {
            condition,
            body,
            position,
        });
        self
    }

    #[must_use]
    pub fn otherwise(mut self, body: Block<E>) -> Self {
        self.else_body = Some(body);
        self
    }
}

/// One `condition { body }` arm of an [`IfStmt`].
#[derive(Clone, Debug, PartialEq)]
pub struct CondBranch<E> {
    pub condition: E,
    pub body: Block<E>,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TryStmt<E> {
    pub body: Block<E>,
    pub catch: Option<CatchClause<E>>,
    pub finally: Option<Block<E>>,
    pub position: Position,
}

/// `catch var { body }`; `var` is absent for `catch { }`.
#[derive(Clone, Debug, PartialEq)]
pub struct CatchClause<E> {
    pub var: Option<Name>,
    pub body: Block<E>,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForInStmt<E> {
    pub vars: Vec<Name>,
    pub iterable: E,
    pub body: Block<E>,
    pub position: Position,
}

/// C-style loop. An absent condition loops until break, return or throw.
#[derive(Clone, Debug, PartialEq)]
pub struct CForStmt<E> {
    pub init: Option<Box<Stmt<E>>>,
    pub condition: Option<E>,
    pub update: Option<E>,
    pub body: Block<E>,
    pub position: Position,
}

/// Condition loop. An absent condition loops until break, return or throw.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopStmt<E> {
    pub condition: Option<E>,
    pub body: Block<E>,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStmt<E> {
    pub values: Vec<E>,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ThrowStmt<E> {
    pub value: E,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ModuleStmt<E> {
    pub name: Name,
    pub body: Block<E>,
    pub position: Position,
}

/// Switch with ordered cases and an optional default. Cases never fall through.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchStmt<E> {
    pub subject: E,
    pub cases: Vec<SwitchCase<E>>,
    pub default: Option<Block<E>>,
    pub position: Position,
}

/// `case a, b: body`; matches when any value equals the switch subject.
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchCase<E> {
    pub values: Vec<E>,
    pub body: Block<E>,
    pub position: Position,
}

/// Declaration. `values` may be shorter than `names`.
#[derive(Clone, Debug, PartialEq)]
pub struct VarStmt<E> {
    pub names: Vec<Name>,
    pub values: Vec<E>,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignStmt<E> {
    pub targets: Vec<AssignTarget<E>>,
    pub op: AssignOp,
    pub values: Vec<E>,
    pub position: Position,
}

/// Comma-ok lookup assignment: targets receive the value and whether it was present.
#[derive(Clone, Debug, PartialEq)]
pub struct MapItemAssignStmt<E> {
    pub targets: Vec<AssignTarget<E>>,
    pub value: E,
    pub position: Position,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SpawnStmt<E> {
    pub call: E,
    pub position: Position,
}

/// Left-hand side of an assignment.
#[derive(Clone, Debug, PartialEq)]
pub enum AssignTarget<E> {
    /// A bare variable, written through the scope chain.
    Ident { name: Name, position: Position },
    /// Index or member place, written by the expression evaluator.
    Place { expr: E, position: Position },
}

impl<E> AssignTarget<E> {
    pub fn ident(name: impl Into<Name>, position: Position) -> Self {
        AssignTarget::Ident {
            name: name.into(),
            position,
        }
    }
}

impl<E> HasPosition for AssignTarget<E> {
    fn position(&self) -> Position {
        match self {
            AssignTarget::Ident { position, .. } | AssignTarget::Place { position, .. } => {
                *position
            }
        }
    }
}

macro_rules! impl_has_position {
    ($($node:ident),* $(,)?) => {
        $(
            impl<E> HasPosition for $node<E> {
                #[inline]
                fn position(&self) -> Position {
                    self.position
                }
            }
        )*
    };
}

impl_has_position!(
    ExprStmt,
    IfStmt,
    CondBranch,
    TryStmt,
    CatchClause,
    ForInStmt,
    CForStmt,
    LoopStmt,
    ReturnStmt,
    ThrowStmt,
    ModuleStmt,
    SwitchStmt,
    SwitchCase,
    VarStmt,
    AssignStmt,
    MapItemAssignStmt,
    SpawnStmt,
);
