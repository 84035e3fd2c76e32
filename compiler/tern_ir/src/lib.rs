//! Tern IR - the statement tree consumed by the executor.
//!
//! This crate is pure data:
//! - `Position` for source locations and the `HasPosition` capability
//! - `Name` for identifiers
//! - `AssignOp` for plain and compound assignment
//! - `Stmt<E>`, the closed statement taxonomy
//!
//! Expressions are opaque here. `Stmt<E>` is generic over the expression node
//! type produced by the host's parser; the executor hands every `E` to the
//! host's expression evaluator.
//!
//! The tree is immutable once built. Every node records its `Position` at
//! construction and never changes it.

mod name;
mod op;
mod position;
pub mod stmt;

pub use name::Name;
pub use op::AssignOp;
pub use position::{HasPosition, Position};
pub use stmt::{
    AssignStmt, AssignTarget, Block, CForStmt, CatchClause, CondBranch, ExprStmt, ForInStmt, IfStmt,
    LoopStmt, MapItemAssignStmt, ModuleStmt, ReturnStmt, SpawnStmt, Stmt, SwitchCase, SwitchStmt,
    ThrowStmt, TryStmt, VarStmt,
};
