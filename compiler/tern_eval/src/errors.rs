//! Error types and centralized error constructors for the executor.
//!
//! Two failure classes exist:
//!
//! - **Scripted exceptions** travel as `ControlSignal::Throw` and can be caught
//!   by `try`/`catch`. Evaluators and callables produce them as [`Raise::Throw`].
//! - **Structural errors** ([`RuntimeError`]) abort the current `execute` call.
//!   They are never caught by `try`/`catch` and `finally` bodies do not run for them.
//!
//! Factory functions below are the single import point for building errors.

use std::fmt;

use tern_ir::Position;

use crate::Value;

/// Category of a structural error.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("undefined name: {name}")]
    UndefinedName { name: String },

    #[error("break outside of a loop")]
    BreakOutsideLoop,

    #[error("continue outside of a loop")]
    ContinueOutsideLoop,

    #[error("return outside of a function")]
    ReturnOutsideFunction,

    #[error("assignment mismatch: {targets} targets but {values} values")]
    CardinalityMismatch { targets: usize, values: usize },

    #[error("cannot iterate over {type_name}")]
    NotIterable { type_name: &'static str },

    #[error("spawn requires a call expression")]
    NotInvokable,

    #[error("{signal} cannot escape module {module}")]
    ModuleEscape {
        module: String,
        signal: &'static str,
    },

    #[error("uncaught exception: {value}")]
    UncaughtThrow { value: Value },

    #[error("maximum call depth exceeded (limit: {limit})")]
    RecursionLimit { limit: usize },

    #[error("task cancelled")]
    Cancelled,

    #[error("unknown module: {name}")]
    UnknownModule { name: String },

    #[error("module {module} has no member {member}")]
    UnknownMember { module: String, member: String },

    /// Failure reported by an expression evaluator or host callable.
    #[error("{message}")]
    InvalidOperation { message: String },
}

/// A structural error, fatal to the running `execute` call.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{kind}{}", at_position(.position))]
pub struct RuntimeError {
    pub kind: ErrorKind,
    /// Where the error surfaced; filled in by the innermost statement that knows.
    pub position: Option<Position>,
}

fn at_position(position: &Option<Position>) -> String {
    position.map(|p| format!(" at {p}")).unwrap_or_default()
}

impl RuntimeError {
    pub fn new(kind: ErrorKind) -> Self {
        RuntimeError {
            kind,
            position: None,
        }
    }

    /// Attach a position, replacing any existing one.
    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Attach a position only if none has been recorded yet.
    #[must_use]
    pub fn or_position(mut self, position: Position) -> Self {
        if self.position.is_none() {
            self.position = Some(position);
        }
        self
    }
}

/// Failure outcome of evaluating an expression or invoking a callable.
#[derive(Clone, Debug, PartialEq)]
pub enum Raise {
    /// A catchable scripted exception.
    Throw {
        value: Value,
        position: Option<Position>,
    },
    /// A structural error; not catchable.
    Error(RuntimeError),
}

impl Raise {
    /// Throw a value from an unknown position; the statement that observes it supplies one.
    pub fn throw(value: impl Into<Value>) -> Self {
        Raise::Throw {
            value: value.into(),
            position: None,
        }
    }

    /// Record `position` unless the raise already carries one.
    #[must_use]
    pub fn or_position(self, position: Position) -> Self {
        match self {
            Raise::Throw {
                value,
                position: None,
            } => Raise::Throw {
                value,
                position: Some(position),
            },
            Raise::Error(err) => Raise::Error(err.or_position(position)),
            raise @ Raise::Throw { .. } => raise,
        }
    }
}

impl From<RuntimeError> for Raise {
    fn from(err: RuntimeError) -> Self {
        Raise::Error(err)
    }
}

impl fmt::Display for Raise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Raise::Throw { value, position } => {
                write!(f, "uncaught exception: {value}{}", at_position(position))
            }
            Raise::Error(err) => write!(f, "{err}"),
        }
    }
}

// Name Errors

#[cold]
pub fn undefined_name(name: &str) -> RuntimeError {
    RuntimeError::new(ErrorKind::UndefinedName {
        name: name.to_string(),
    })
}

// Control Flow Errors

#[cold]
pub fn break_outside_loop() -> RuntimeError {
    RuntimeError::new(ErrorKind::BreakOutsideLoop)
}

#[cold]
pub fn continue_outside_loop() -> RuntimeError {
    RuntimeError::new(ErrorKind::ContinueOutsideLoop)
}

#[cold]
pub fn return_outside_function() -> RuntimeError {
    RuntimeError::new(ErrorKind::ReturnOutsideFunction)
}

#[cold]
pub fn module_escape(module: &str, signal: &'static str) -> RuntimeError {
    RuntimeError::new(ErrorKind::ModuleEscape {
        module: module.to_string(),
        signal,
    })
}

#[cold]
pub fn uncaught_throw(value: Value) -> RuntimeError {
    RuntimeError::new(ErrorKind::UncaughtThrow { value })
}

// Assignment and Iteration Errors

#[cold]
pub fn cardinality_mismatch(targets: usize, values: usize) -> RuntimeError {
    RuntimeError::new(ErrorKind::CardinalityMismatch { targets, values })
}

#[cold]
pub fn not_iterable(value: &Value) -> RuntimeError {
    RuntimeError::new(ErrorKind::NotIterable {
        type_name: value.type_name(),
    })
}

// Concurrency Errors

#[cold]
pub fn not_invokable() -> RuntimeError {
    RuntimeError::new(ErrorKind::NotInvokable)
}

#[cold]
pub fn cancelled() -> RuntimeError {
    RuntimeError::new(ErrorKind::Cancelled)
}

#[cold]
pub fn recursion_limit(limit: usize) -> RuntimeError {
    RuntimeError::new(ErrorKind::RecursionLimit { limit })
}

// Module Errors

#[cold]
pub fn unknown_module(name: &str) -> RuntimeError {
    RuntimeError::new(ErrorKind::UnknownModule {
        name: name.to_string(),
    })
}

#[cold]
pub fn unknown_member(module: &str, member: &str) -> RuntimeError {
    RuntimeError::new(ErrorKind::UnknownMember {
        module: module.to_string(),
        member: member.to_string(),
    })
}

// Evaluator Errors

#[cold]
pub fn invalid_operation(message: impl Into<String>) -> RuntimeError {
    RuntimeError::new(ErrorKind::InvalidOperation {
        message: message.into(),
    })
}
