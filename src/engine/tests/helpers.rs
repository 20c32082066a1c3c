//! Shared test plumbing: JSON node constructors and one-shot runners

use crate::config::RuntimeConfig;
use crate::engine::{bind, Engine};
use crate::errors::RuntimeError;
use crate::handlers::HandlerSet;
use crate::value::Value;
use serde_json::{json, Value as Json};
use std::collections::HashMap;

pub fn null_engine() -> Engine {
    Engine::new(RuntimeConfig::default(), HandlerSet::null_set())
}

/// Bind and evaluate once under an isolated-test handler set.
pub fn run(program: &Json) -> Result<Value, RuntimeError> {
    run_with(&null_engine(), program)
}

pub fn run_with(engine: &Engine, program: &Json) -> Result<Value, RuntimeError> {
    let stmts = bind(program, None).expect("program should bind");
    let scope = engine.initial_scope();
    engine.evaluate(&stmts, &scope, &HashMap::new())
}

/* ----- node constructors ----- */

pub fn lit(value: impl Into<Json>) -> Json {
    json!({"type": "literal", "value": value.into()})
}

pub fn var(name: &str) -> Json {
    json!({"type": "var", "name": name})
}

pub fn assign(target: &str, expr: Json) -> Json {
    json!({"type": "assign", "target": target, "expr": expr})
}

pub fn ret(expr: Json) -> Json {
    json!({"type": "return", "value": expr})
}

pub fn call(name: &str, args: Vec<Json>) -> Json {
    json!({"type": "call", "name": name, "args": args})
}

pub fn expr_stmt(expr: Json) -> Json {
    json!({"type": "expr", "expr": expr})
}

pub fn binary(op: &str, left: Json, right: Json) -> Json {
    json!({"type": "binary", "op": op, "left": left, "right": right})
}

pub fn suspend(seconds: Json) -> Json {
    json!({"type": "suspend", "seconds": seconds})
}
