//! Control signals threaded between nested statement lists.
//!
//! Every statement produces a [`Completion`]. A statement list stops at the
//! first completion whose signal is not [`ControlSignal::None`] and hands it to
//! the enclosing construct:
//!
//! - loops consume `Break` and `Continue` (see [`to_loop_action`])
//! - call boundaries consume `Return`
//! - `try`/`catch` consumes `Throw`

use tern_ir::Position;

use crate::Value;

/// Outcome tag of a statement execution.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum ControlSignal {
    /// Normal completion; the next statement runs.
    #[default]
    None,
    Break,
    Continue,
    /// Values of a `return`, in source order.
    Return(Vec<Value>),
    /// A scripted exception and where it was raised.
    Throw { value: Value, position: Position },
}

impl ControlSignal {
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, ControlSignal::None)
    }

    /// Collapse a `return` list into a single value.
    ///
    /// No values yields `nil`, one value yields itself and several yield a list.
    /// Any other signal yields `None`.
    pub fn return_value(&self) -> Option<Value> {
        match self {
            ControlSignal::Return(values) => Some(collapse_values(values.clone())),
            _ => None,
        }
    }

    /// Keyword naming the signal, for diagnostics.
    pub fn keyword(&self) -> &'static str {
        match self {
            ControlSignal::None => "none",
            ControlSignal::Break => "break",
            ControlSignal::Continue => "continue",
            ControlSignal::Return(_) => "return",
            ControlSignal::Throw { .. } => "throw",
        }
    }
}

/// Pack zero, one or many values the way `return` and calls see them.
pub fn collapse_values(mut values: Vec<Value>) -> Value {
    match values.len() {
        0 => Value::Nil,
        1 => values.pop().unwrap_or_default(),
        _ => Value::List(values),
    }
}

/// Result of executing one statement or one statement list.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Completion {
    /// Last value produced, if any statement produced one.
    pub value: Option<Value>,
    pub signal: ControlSignal,
}

impl Completion {
    /// Normal completion without a value.
    #[inline]
    pub fn empty() -> Self {
        Completion::default()
    }

    /// Normal completion carrying `value`.
    #[inline]
    pub fn value(value: Value) -> Self {
        Completion {
            value: Some(value),
            signal: ControlSignal::None,
        }
    }

    #[inline]
    pub fn signal(signal: ControlSignal) -> Self {
        Completion {
            value: None,
            signal,
        }
    }

    #[inline]
    pub fn is_normal(&self) -> bool {
        self.signal.is_none()
    }
}

/// What a loop does after one iteration of its body.
#[derive(Clone, Debug, PartialEq)]
pub enum LoopAction {
    /// Run the next iteration (normal completion or `continue`).
    Next,
    /// Leave the loop; code after it runs normally.
    Break,
    /// Leave the loop and propagate the signal (`return` or `throw`).
    Exit(ControlSignal),
}

/// Apply loop-body consumption rules to the signal of one iteration.
#[inline]
pub fn to_loop_action(signal: ControlSignal) -> LoopAction {
    match signal {
        ControlSignal::None | ControlSignal::Continue => LoopAction::Next,
        ControlSignal::Break => LoopAction::Break,
        signal @ (ControlSignal::Return(_) | ControlSignal::Throw { .. }) => LoopAction::Exit(signal),
    }
}
