use super::helpers::*;
use crate::config::RuntimeConfig;
use crate::engine::{bind, Engine};
use crate::errors::RuntimeError;
use crate::handlers::{CaptureOutputApi, DenySuspendApi, HandlerSet};
use crate::value::Value;
use serde_json::json;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Re-evaluate the same program in the same scope until it stops
/// suspending, the host's polling loop in miniature.
fn converge(engine: &Engine, program: &serde_json::Value, max_passes: usize) -> (Value, usize) {
    let stmts = bind(program, None).expect("program should bind");
    let scope = engine.initial_scope();
    let inputs = HashMap::new();

    let mut passes = 0;
    loop {
        passes += 1;
        assert!(passes <= max_passes, "run did not converge");
        let result = engine.evaluate(&stmts, &scope, &inputs).unwrap();
        if result != Value::Suspend {
            return (result, passes);
        }
    }
}

#[test]
fn test_deny_policy_fails_immediately() {
    let mut handlers = HandlerSet::null_set();
    handlers.switch_suspend(Box::new(DenySuspendApi));
    let engine = Engine::new(RuntimeConfig::default(), handlers);

    let program = json!([
        {"type": "suspend", "line": 3, "seconds": lit(5)},
        ret(lit("never reached")),
    ]);

    let err = run_with(&engine, &program).unwrap_err();
    assert_eq!(err, RuntimeError::CannotSuspend { line: 3 });
}

#[test]
fn test_suspend_marks_point_and_resume_consumes_it() {
    let engine = null_engine();
    let stmts = bind(
        &json!([
            assign("a", lit(1)),
            suspend(lit(5)),
            ret(var("a")),
        ]),
        None,
    )
    .unwrap();
    let scope = engine.initial_scope();
    let inputs = HashMap::new();

    // First pass suspends after declaring its wait
    assert_eq!(engine.evaluate(&stmts, &scope, &inputs).unwrap(), Value::Suspend);
    let suspend_api = engine.handlers().suspend();
    assert_eq!(suspend_api.current_resume_point().as_deref(), Some("suspend:0"));
    assert_eq!(suspend_api.wait_seconds(), 5.0);

    // Second pass consumes the resume point and completes
    assert_eq!(engine.evaluate(&stmts, &scope, &inputs).unwrap(), Value::Num(1.0));
    assert_eq!(engine.handlers().suspend().current_resume_point(), None);
}

#[test]
fn test_loop_resumes_from_saved_iteration() {
    let capture = CaptureOutputApi::new();
    let lines = capture.handle();
    let mut handlers = HandlerSet::null_set();
    handlers.switch_output(Box::new(capture));
    let engine = Engine::new(RuntimeConfig::default(), handlers);

    // Each iteration suspends first, then prints: completed iterations must
    // not print again on re-entry.
    let stmts = bind(
        &json!([
            {"type": "for", "var": "x",
             "iter": {"type": "list", "items": [lit(1), lit(2), lit(3)]},
             "body": [
                suspend(lit(0)),
                expr_stmt(call("print", vec![var("x")])),
             ]},
        ]),
        None,
    )
    .unwrap();
    let scope = engine.initial_scope();
    let inputs = HashMap::new();

    let mut passes = 0;
    loop {
        passes += 1;
        assert!(passes <= 10, "run did not converge");
        if engine.evaluate(&stmts, &scope, &inputs).unwrap() != Value::Suspend {
            break;
        }
    }

    // One pass per suspension plus the completing pass
    assert_eq!(passes, 4);
    assert_eq!(lines.borrow().as_slice(), ["1", "2", "3"]);
}

#[test]
fn test_sequential_suspends_each_fire_once() {
    let engine = null_engine();

    // One pass per suspension plus the completing pass; on the final pass
    // the first node replays past the second node's pending point without
    // re-suspending.
    let program = json!([suspend(lit(0)), suspend(lit(0)), ret(lit(1))]);
    let (result, passes) = converge(&engine, &program, 10);

    assert_eq!(result, Value::Num(1.0));
    assert_eq!(passes, 3);
}

#[test]
fn test_while_loop_restores_counter_across_suspensions() {
    let engine = null_engine();

    // The counter drives the condition; replay resets it to 0 at the top,
    // so the loop must put its saved state back before re-entering.
    let program = json!([
        assign("i", lit(0)),
        {"type": "while",
         "cond": binary("lt", var("i"), lit(3)),
         "body": [
            assign("i", binary("add", var("i"), lit(1))),
            suspend(lit(0)),
         ]},
        ret(var("i")),
    ]);
    let (result, passes) = converge(&engine, &program, 10);

    assert_eq!(result, Value::Num(3.0));
    assert_eq!(passes, 4);
}

#[test]
fn test_for_loop_restores_accumulator_across_suspensions() {
    let engine = null_engine();

    let program = json!([
        assign("total", lit(0)),
        {"type": "for", "var": "x",
         "iter": {"type": "list", "items": [lit(1), lit(2), lit(3)]},
         "body": [
            assign("total", binary("add", var("total"), var("x"))),
            suspend(lit(0)),
         ]},
        ret(var("total")),
    ]);
    let (result, passes) = converge(&engine, &program, 10);

    assert_eq!(result, Value::Num(6.0));
    assert_eq!(passes, 4);
}

#[test]
fn test_suspension_inside_call_propagates_through_operator() {
    let engine = null_engine();

    // The call suspends mid-expression; the addition must yield the
    // sentinel instead of a type error, then complete on resume.
    let program = json!([
        {"type": "func_def", "name": "g", "params": [],
         "body": [suspend(lit(0)), ret(lit(5))]},
        assign("a", binary("add", call("g", vec![]), lit(1))),
        ret(var("a")),
    ]);
    let (result, passes) = converge(&engine, &program, 10);

    assert_eq!(result, Value::Num(6.0));
    assert_eq!(passes, 2);
}

#[test]
fn test_suspension_inside_call_propagates_through_condition() {
    let engine = null_engine();

    let program = json!([
        {"type": "func_def", "name": "g", "params": [],
         "body": [suspend(lit(0)), ret(lit(1))]},
        {"type": "if", "cond": call("g", vec![]),
         "then_body": [ret(lit("yes"))],
         "else_body": [ret(lit("no"))]},
    ]);
    let (result, passes) = converge(&engine, &program, 10);

    assert_eq!(result, Value::Str("yes".to_string()));
    assert_eq!(passes, 2);
}

#[tokio::test]
async fn test_run_polls_until_completion() {
    let engine = null_engine();
    let program = bind(
        &json!([
            assign("a", lit(7)),
            suspend(lit(0)),
            ret(var("a")),
        ]),
        None,
    )
    .unwrap();

    let cancel = CancellationToken::new();
    let result = engine.run(&program, &HashMap::new(), &cancel).await.unwrap();
    assert_eq!(result, Value::Num(7.0));
}

#[tokio::test]
async fn test_cancelled_token_interrupts_suspended_run() {
    let engine = null_engine();
    let program = bind(&json!([suspend(lit(3600)), ret(lit(1))]), None).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = engine.run(&program, &HashMap::new(), &cancel).await.unwrap_err();
    assert!(err.to_string().contains("cancelled"));
}
