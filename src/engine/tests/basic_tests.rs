use super::helpers::*;
use crate::config::RuntimeConfig;
use crate::engine::Engine;
use crate::handlers::{CaptureOutputApi, HandlerSet};
use crate::value::Value;
use maplit::hashmap;
use serde_json::json;

#[test]
fn test_reassignment_returns_latest() {
    // a = 1; a = 2; return a;
    let program = json!([
        assign("a", lit(1)),
        assign("a", lit(2)),
        ret(var("a")),
    ]);
    assert_eq!(run(&program).unwrap(), Value::Num(2.0));
}

#[test]
fn test_arithmetic_and_precedence_as_bound() {
    // return 2 + 3 * 4 (precedence already resolved by the parser)
    let program = json!([ret(binary(
        "add",
        lit(2),
        binary("mul", lit(3), lit(4))
    ))]);
    assert_eq!(run(&program).unwrap(), Value::Num(14.0));
}

#[test]
fn test_string_concatenation() {
    let program = json!([ret(binary("add", lit("item-"), lit(7)))]);
    assert_eq!(run(&program).unwrap(), Value::Str("item-7".to_string()));
}

#[test]
fn test_division_by_zero_fails() {
    let program = json!([ret(binary("div", lit(1), lit(0)))]);
    assert!(run(&program).is_err());
}

#[test]
fn test_if_else_branches() {
    let program = json!([
        {"type": "if",
         "cond": binary("gt", lit(5), lit(3)),
         "then_body": [ret(lit("yes"))],
         "else_body": [ret(lit("no"))]}
    ]);
    assert_eq!(run(&program).unwrap(), Value::Str("yes".to_string()));
}

#[test]
fn test_while_loop_sums() {
    // i = 0; total = 0; while i < 5 { total = total + i; i = i + 1 } return total
    let program = json!([
        assign("i", lit(0)),
        assign("total", lit(0)),
        {"type": "while",
         "cond": binary("lt", var("i"), lit(5)),
         "body": [
            assign("total", binary("add", var("total"), var("i"))),
            assign("i", binary("add", var("i"), lit(1))),
         ]},
        ret(var("total")),
    ]);
    assert_eq!(run(&program).unwrap(), Value::Num(10.0));
}

#[test]
fn test_for_loop_with_break() {
    let program = json!([
        assign("total", lit(0)),
        {"type": "for", "var": "x",
         "iter": {"type": "list", "items": [lit(1), lit(2), lit(3), lit(4)]},
         "body": [
            {"type": "if",
             "cond": binary("eq", var("x"), lit(3)),
             "then_body": [{"type": "break"}]},
            assign("total", binary("add", var("total"), var("x"))),
         ]},
        ret(var("total")),
    ]);
    assert_eq!(run(&program).unwrap(), Value::Num(3.0));
}

#[test]
fn test_print_goes_through_output_handler() {
    let capture = CaptureOutputApi::new();
    let lines = capture.handle();
    let mut handlers = HandlerSet::null_set();
    handlers.switch_output(Box::new(capture));
    let engine = Engine::new(RuntimeConfig::default(), handlers);

    let program = json!([expr_stmt(call("print", vec![lit("count:"), lit(3)]))]);
    run_with(&engine, &program).unwrap();

    assert_eq!(lines.borrow().as_slice(), ["count: 3"]);
}

#[test]
fn test_props_injected_from_config() {
    let config = RuntimeConfig {
        properties: hashmap! { "region".to_string() => "eu".to_string() },
        ..RuntimeConfig::default()
    };
    let engine = Engine::new(config, HandlerSet::null_set());

    let program = json!([ret(var("PROPS.region"))]);
    assert_eq!(
        run_with(&engine, &program).unwrap(),
        Value::Str("eu".to_string())
    );
}

#[test]
fn test_env_injected_as_map() {
    let program = json!([ret(call("typeOf", vec![var("ENV")]))]);
    assert_eq!(run(&program).unwrap(), Value::Str("map".to_string()));
}

#[test]
fn test_unbound_variable_is_null() {
    let program = json!([ret(var("never_bound"))]);
    assert_eq!(run(&program).unwrap(), Value::Null);
}

#[test]
fn test_host_native_null_input_is_explicit_null() {
    let engine = null_engine();
    let stmts = crate::engine::bind(&json!([ret(var("n"))]), None).unwrap();
    let scope = engine.initial_scope();
    let inputs = hashmap! { "n".to_string() => json!(null) };

    assert_eq!(engine.evaluate(&stmts, &scope, &inputs).unwrap(), Value::Null);
}

#[test]
fn test_program_without_return_yields_void() {
    let program = json!([assign("a", lit(1))]);
    assert_eq!(run(&program).unwrap(), Value::Void);
}

#[test]
fn test_index_expression() {
    let program = json!([
        assign("xs", json!({"type": "list", "items": [lit(10), lit(20)]})),
        ret(json!({"type": "index", "target": var("xs"), "index": lit(1)})),
    ]);
    assert_eq!(run(&program).unwrap(), Value::Num(20.0));
}
