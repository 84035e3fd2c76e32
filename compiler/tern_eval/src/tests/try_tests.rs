//! try/catch/finally unwinding.

use crate::errors::ErrorKind;
use crate::test_helpers::*;
use crate::{ControlSignal, Value};
use pretty_assertions::assert_eq;

fn mark() -> tern_ir::Stmt<TestExpr> {
    out(vec![text("mark")])
}

#[test]
fn catch_return_survives_signal_free_finally() {
    let h = Harness::new();
    let result = h
        .run(&[try_stmt(
            vec![throw(int(5))],
            Some((Some("e"), vec![ret(vec![add(var("e"), int(1))])])),
            Some(vec![mark()]),
        )])
        .unwrap();
    assert_eq!(result.value, Some(Value::Int(6)));
    assert_eq!(result.signal, ControlSignal::Return(vec![Value::Int(6)]));
    assert_eq!(h.output(), vec![Value::string("mark")]);
}

#[test]
fn finally_return_overrides_pending_return() {
    let h = Harness::new();
    let result = h
        .run(&[try_stmt(
            vec![ret(vec![int(1)])],
            None,
            Some(vec![ret(vec![int(2)])]),
        )])
        .unwrap();
    assert_eq!(result.value, Some(Value::Int(2)));
}

#[test]
fn finally_return_overrides_uncaught_throw() {
    let h = Harness::new();
    let result = h
        .run(&[try_stmt(
            vec![throw(text("lost"))],
            None,
            Some(vec![ret(vec![int(2)])]),
        )])
        .unwrap();
    assert_eq!(result.value, Some(Value::Int(2)));
}

#[test]
fn finally_throw_replaces_pending_return() {
    let h = Harness::new();
    let err = h
        .run(&[try_stmt(
            vec![ret(vec![int(1)])],
            None,
            Some(vec![throw(int(9))]),
        )])
        .unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::UncaughtThrow {
            value: Value::Int(9)
        }
    );
}

#[test]
fn catch_binds_thrown_value_in_own_scope() {
    let h = Harness::new();
    h.run(&[try_stmt(
        vec![throw(text("oops"))],
        Some((Some("e"), vec![out(vec![var("e")])])),
        None,
    )])
    .unwrap();
    assert_eq!(h.output(), vec![Value::string("oops")]);
    assert!(!h.scope.contains("e"));
}

#[test]
fn catch_without_variable() {
    let h = Harness::new();
    h.run(&[try_stmt(
        vec![throw(int(1))],
        Some((None, vec![out(vec![text("caught")])])),
        None,
    )])
    .unwrap();
    assert_eq!(h.output(), vec![Value::string("caught")]);
}

#[test]
fn catch_skipped_without_throw() {
    let h = Harness::new();
    h.run(&[try_stmt(
        vec![out(vec![text("body")])],
        Some((Some("e"), vec![out(vec![text("catch")])])),
        Some(vec![mark()]),
    )])
    .unwrap();
    assert_eq!(h.output(), vec![Value::string("body"), Value::string("mark")]);
}

#[test]
fn evaluator_raise_is_catchable() {
    let h = Harness::new();
    h.run(&[try_stmt(
        vec![expr(raise(int(5)))],
        Some((Some("e"), vec![out(vec![var("e")])])),
        None,
    )])
    .unwrap();
    assert_eq!(h.output(), vec![Value::Int(5)]);
}

#[test]
fn throw_from_called_function_is_caught_at_call_site() {
    let h = Harness::new();
    h.run(&[
        def("f", &[], vec![throw(text("deep"))]),
        try_stmt(
            vec![expr(call("f", vec![])), out(vec![text("unreachable")])],
            Some((Some("e"), vec![out(vec![var("e")])])),
            None,
        ),
    ])
    .unwrap();
    assert_eq!(h.output(), vec![Value::string("deep")]);
}

#[test]
fn throw_in_catch_propagates_after_finally() {
    let h = Harness::new();
    let err = h
        .run(&[try_stmt(
            vec![throw(int(1))],
            Some((Some("e"), vec![throw(add(var("e"), int(1)))])),
            Some(vec![mark()]),
        )])
        .unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::UncaughtThrow {
            value: Value::Int(2)
        }
    );
    assert_eq!(h.output(), vec![Value::string("mark")]);
}

#[test]
fn try_without_catch_rethrows_to_outer_try() {
    let h = Harness::new();
    h.run(&[try_stmt(
        vec![try_stmt(
            vec![throw(text("inner"))],
            None,
            Some(vec![out(vec![text("inner finally")])]),
        )],
        Some((Some("e"), vec![out(vec![var("e")])])),
        None,
    )])
    .unwrap();
    assert_eq!(
        h.output(),
        vec![Value::string("inner finally"), Value::string("inner")]
    );
}

#[test]
fn finally_runs_on_break_and_continue() {
    let h = Harness::new();
    h.run(&[
        for_in(
            &["x"],
            list(vec![int(1), int(2), int(3)]),
            vec![try_stmt(
                vec![
                    when(eq(var("x"), int(1)), vec![cont()]),
                    when(eq(var("x"), int(2)), vec![brk()]),
                ],
                None,
                Some(vec![out(vec![var("x")])]),
            )],
        ),
        out(vec![text("after")]),
    ])
    .unwrap();
    assert_eq!(
        h.output(),
        vec![Value::Int(1), Value::Int(2), Value::string("after")]
    );
}

#[test]
fn finally_break_overrides_return() {
    let h = Harness::new();
    h.run(&[
        def(
            "f",
            &[],
            vec![
                for_in(
                    &["x"],
                    list(vec![int(1)]),
                    vec![try_stmt(vec![ret(vec![text("early")])], None, Some(vec![brk()]))],
                ),
                ret(vec![text("late")]),
            ],
        ),
        out(vec![call("f", vec![])]),
    ])
    .unwrap();
    assert_eq!(h.output(), vec![Value::string("late")]);
}

#[test]
fn structural_error_skips_catch_and_finally() {
    let h = Harness::new();
    let err = h
        .run(&[try_stmt(
            vec![expr(fail("broken"))],
            Some((None, vec![out(vec![text("caught")])])),
            Some(vec![mark()]),
        )])
        .unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::InvalidOperation {
            message: "broken".to_string()
        }
    );
    assert!(h.output().is_empty());
}
