use super::helpers::*;
use crate::errors::RuntimeError;
use crate::value::Value;
use serde_json::json;

#[test]
fn test_define_and_call() {
    let program = json!([
        {"type": "func_def", "name": "add", "params": ["x", "y"],
         "body": [ret(binary("add", var("x"), var("y")))]},
        ret(call("add", vec![lit(2), lit(3)])),
    ]);
    assert_eq!(run(&program).unwrap(), Value::Num(5.0));
}

#[test]
fn test_closure_sees_definition_site_globals() {
    let program = json!([
        assign("base", lit(10)),
        {"type": "func_def", "name": "bump", "params": ["x"],
         "body": [ret(binary("add", var("x"), var("base")))]},
        ret(call("bump", vec![lit(5)])),
    ]);
    assert_eq!(run(&program).unwrap(), Value::Num(15.0));
}

#[test]
fn test_call_locals_are_isolated() {
    // The callee's local must not leak into the caller's scope
    let program = json!([
        {"type": "func_def", "name": "f", "params": [],
         "body": [assign("local_only", lit(1)), ret(lit(0))]},
        expr_stmt(call("f", vec![])),
        ret(var("local_only")),
    ]);
    assert_eq!(run(&program).unwrap(), Value::Null);
}

#[test]
fn test_arity_mismatch_fails_before_body_runs() {
    // The body raises if executed; the arity check must win
    let program = json!([
        {"type": "func_def", "name": "f", "params": ["x"],
         "body": [expr_stmt(call("fail", vec![lit("body ran")]))]},
        {"type": "expr", "line": 4, "expr": call("f", vec![lit(1), lit(2)])},
    ]);

    let err = run(&program).unwrap_err();
    assert_eq!(
        err,
        RuntimeError::ArityMismatch {
            name: "f".to_string(),
            expected: 1,
            got: 2,
            line: 4
        }
    );
}

#[test]
fn test_unbounded_recursion_aborts_stack_too_deep() {
    // function f(x) { return f(x); } f(1)
    let program = json!([
        {"type": "func_def", "name": "f", "params": ["x"],
         "body": [ret(call("f", vec![var("x")]))]},
        ret(call("f", vec![lit(1)])),
    ]);

    let err = run(&program).unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::StackTooDeep { depth: 101, .. }
    ));
}

#[test]
fn test_recursion_below_threshold_completes() {
    // factorial(10) recurses well under the abort depth
    let program = json!([
        {"type": "func_def", "name": "fact", "params": ["n"],
         "body": [
            {"type": "if",
             "cond": binary("le", var("n"), lit(1)),
             "then_body": [ret(lit(1))]},
            ret(binary("mul", var("n"), call("fact", vec![binary("sub", var("n"), lit(1))]))),
         ]},
        ret(call("fact", vec![lit(10)])),
    ]);
    assert_eq!(run(&program).unwrap(), Value::Num(3628800.0));
}

#[test]
fn test_calling_a_non_function_fails() {
    let program = json!([
        assign("x", lit(3)),
        ret(call("x", vec![])),
    ]);
    assert!(matches!(
        run(&program).unwrap_err(),
        RuntimeError::TypeError { .. }
    ));
}
