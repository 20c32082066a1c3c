//! Builtin functions backed by the capability handlers
//!
//! Builtins live in the shared constant scope: free functions (`print`,
//! `fail`, `typeOf`) plus one namespace map per capability (`data.pull`,
//! `cache.get`, ...). Each call checks its own arity, asks the handler's
//! availability where the operation is effectful, and attributes handler
//! errors (raised with line 0) to the calling node's line.

use crate::engine::EvalContext;
use crate::errors::RuntimeError;
use crate::handlers::Locator;
use crate::scope::ScopeRef;
use crate::value::{to_native, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/* ===================== Builtin ===================== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Builtin {
    Print,
    Fail,
    TypeOf,
    DataPull,
    DataPush,
    IoRead,
    IoWrite,
    IoExists,
    IoList,
    OutPrint,
    InputRead,
    CacheGet,
    CachePut,
    CacheRemove,
    PortSend,
    ScriptRun,
}

/// Seed the shared constant scope with the builtin surface.
pub fn inject_builtins(constant: &ScopeRef) {
    let mut scope = constant.borrow_mut();

    scope.define("print", Value::Native(Builtin::Print));
    scope.define("fail", Value::Native(Builtin::Fail));
    scope.define("typeOf", Value::Native(Builtin::TypeOf));

    scope.define("data", namespace(&[("pull", Builtin::DataPull), ("push", Builtin::DataPush)]));
    scope.define(
        "io",
        namespace(&[
            ("read", Builtin::IoRead),
            ("write", Builtin::IoWrite),
            ("exists", Builtin::IoExists),
            ("list", Builtin::IoList),
        ]),
    );
    scope.define("out", namespace(&[("print", Builtin::OutPrint)]));
    scope.define("input", namespace(&[("read", Builtin::InputRead)]));
    scope.define(
        "cache",
        namespace(&[
            ("get", Builtin::CacheGet),
            ("put", Builtin::CachePut),
            ("remove", Builtin::CacheRemove),
        ]),
    );
    scope.define("port", namespace(&[("send", Builtin::PortSend)]));
    scope.define("script", namespace(&[("run", Builtin::ScriptRun)]));
}

fn namespace(entries: &[(&str, Builtin)]) -> Value {
    Value::Map(
        entries
            .iter()
            .map(|(name, b)| (name.to_string(), Value::Native(*b)))
            .collect(),
    )
}

/* ===================== Dispatch ===================== */

pub fn call(
    builtin: Builtin,
    args: Vec<Value>,
    scope: &ScopeRef,
    ctx: &EvalContext,
    line: usize,
) -> Result<Value, RuntimeError> {
    match builtin {
        Builtin::Print | Builtin::OutPrint => {
            let text = args.iter().map(render).collect::<Vec<_>>().join(" ");
            ctx.handlers
                .output()
                .print(&text)
                .map_err(|e| e.at_line(line))?;
            Ok(Value::Void)
        }

        Builtin::Fail => {
            let [value] = take_args("fail", args, line)?;
            Err(RuntimeError::Thrown { value, line })
        }

        Builtin::TypeOf => {
            let [value] = take_args("typeOf", args, line)?;
            Ok(Value::Str(value.type_name().to_string()))
        }

        Builtin::DataPull => {
            let [locator] = take_args("data.pull", args, line)?;
            let locator = parse_locator(&locator, line)?;
            ctx.handlers
                .data()
                .pull(&locator)
                .map_err(|e| e.at_line(line))
        }

        Builtin::DataPush => {
            let (locator, value, content_type) = match args.len() {
                2 => {
                    let [l, v] = take_args("data.push", args, line)?;
                    (l, v, None)
                }
                3 => {
                    let [l, v, ct] = take_args("data.push", args, line)?;
                    let ct = ct
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| {
                            RuntimeError::type_error("data.push content type must be a string", line)
                        })?;
                    (l, v, Some(ct))
                }
                n => {
                    return Err(RuntimeError::ArityMismatch {
                        name: "data.push".to_string(),
                        expected: 2,
                        got: n,
                        line,
                    })
                }
            };
            let locator = parse_locator(&locator, line)?;
            ctx.handlers
                .data()
                .push(&locator, &value, content_type.as_deref())
                .map_err(|e| e.at_line(line))?;
            Ok(Value::Void)
        }

        Builtin::IoRead => {
            let [path] = take_args("io.read", args, line)?;
            let path = str_arg("io.read", &path, line)?;
            ctx.handlers
                .io()
                .read_text(path)
                .map(Value::Str)
                .map_err(|e| e.at_line(line))
        }

        Builtin::IoWrite => {
            let [path, text] = take_args("io.write", args, line)?;
            let path = str_arg("io.write", &path, line)?;
            let text = str_arg("io.write", &text, line)?;
            ctx.handlers
                .io()
                .write_text(path, text)
                .map_err(|e| e.at_line(line))?;
            Ok(Value::Void)
        }

        Builtin::IoExists => {
            let [path] = take_args("io.exists", args, line)?;
            let path = str_arg("io.exists", &path, line)?;
            ctx.handlers
                .io()
                .exists(path)
                .map(Value::Bool)
                .map_err(|e| e.at_line(line))
        }

        Builtin::IoList => {
            let [path] = take_args("io.list", args, line)?;
            let path = str_arg("io.list", &path, line)?;
            let names = ctx
                .handlers
                .io()
                .list_dir(path)
                .map_err(|e| e.at_line(line))?;
            Ok(Value::List(names.into_iter().map(Value::Str).collect()))
        }

        Builtin::InputRead => {
            let prompt = match args.len() {
                0 => String::new(),
                1 => {
                    let [p] = take_args("input.read", args, line)?;
                    str_arg("input.read", &p, line)?.to_string()
                }
                n => {
                    return Err(RuntimeError::ArityMismatch {
                        name: "input.read".to_string(),
                        expected: 1,
                        got: n,
                        line,
                    })
                }
            };
            ctx.handlers
                .input()
                .read_line(&prompt)
                .map(Value::Str)
                .map_err(|e| e.at_line(line))
        }

        Builtin::CacheGet => {
            let [key] = take_args("cache.get", args, line)?;
            let key = str_arg("cache.get", &key, line)?;
            let cached = ctx
                .handlers
                .cache()
                .get(key)
                .map_err(|e| e.at_line(line))?;
            Ok(cached.unwrap_or(Value::Null))
        }

        Builtin::CachePut => {
            let [key, value] = take_args("cache.put", args, line)?;
            let key = str_arg("cache.put", &key, line)?;
            ctx.handlers
                .cache()
                .put(key, value.clone())
                .map_err(|e| e.at_line(line))?;
            Ok(Value::Void)
        }

        Builtin::CacheRemove => {
            let [key] = take_args("cache.remove", args, line)?;
            let key = str_arg("cache.remove", &key, line)?;
            ctx.handlers
                .cache()
                .remove(key)
                .map_err(|e| e.at_line(line))?;
            Ok(Value::Void)
        }

        Builtin::PortSend => {
            let [port, payload] = take_args("port.send", args, line)?;
            let port = str_arg("port.send", &port, line)?;
            ctx.handlers
                .port()
                .send(port, &payload)
                .map_err(|e| e.at_line(line))
        }

        Builtin::ScriptRun => run_script(args, scope, ctx, line),
    }
}

/// Fetch a stored program by name, validate the argument map against its
/// declared parameters, and run it in a scope isolated from the caller's
/// locals.
fn run_script(
    args: Vec<Value>,
    scope: &ScopeRef,
    ctx: &EvalContext,
    line: usize,
) -> Result<Value, RuntimeError> {
    let (name, call_args) = match args.len() {
        1 => {
            let [n] = take_args("script.run", args, line)?;
            (n, Value::Map(HashMap::new()))
        }
        2 => {
            let [n, a] = take_args("script.run", args, line)?;
            (n, a)
        }
        n => {
            return Err(RuntimeError::ArityMismatch {
                name: "script.run".to_string(),
                expected: 1,
                got: n,
                line,
            })
        }
    };
    let name = str_arg("script.run", &name, line)?;
    let Value::Map(call_args) = call_args else {
        return Err(RuntimeError::type_error(
            "script.run arguments must be a map",
            line,
        ));
    };

    let script = ctx
        .handlers
        .script()
        .fetch(name)
        .map_err(|e| e.at_line(line))?;

    let native_args: HashMap<String, serde_json::Value> = call_args
        .iter()
        .map(|(k, v)| (k.clone(), to_native(v)))
        .collect();
    let validated = script.meta.validate_args(&native_args).map_err(|e| e.at_line(line))?;

    let program = crate::engine::bind(&script.program, None).map_err(|e| {
        RuntimeError::unsupported(format!("script '{}' failed to bind: {}", name, e), line)
    })?;

    let run_scope = crate::scope::isolated(scope);
    for (arg_name, arg_value) in validated {
        run_scope.borrow_mut().define(arg_name, arg_value);
    }

    match crate::engine::statements::exec_block(&program, &run_scope, ctx)? {
        crate::engine::statements::Flow::Return(v) => Ok(v),
        crate::engine::statements::Flow::Suspend => Ok(Value::Suspend),
        _ => Ok(Value::Void),
    }
}

/* ===================== Helpers ===================== */

fn take_args<const N: usize>(
    name: &str,
    args: Vec<Value>,
    line: usize,
) -> Result<[Value; N], RuntimeError> {
    let got = args.len();
    args.try_into().map_err(|_| RuntimeError::ArityMismatch {
        name: name.to_string(),
        expected: N,
        got,
        line,
    })
}

fn str_arg<'v>(name: &str, value: &'v Value, line: usize) -> Result<&'v str, RuntimeError> {
    value.as_str().ok_or_else(|| {
        RuntimeError::type_error(
            format!("{} expects a string, got {}", name, value.type_name()),
            line,
        )
    })
}

fn parse_locator(value: &Value, line: usize) -> Result<Locator, RuntimeError> {
    let raw = str_arg("resource locator", value, line)?;
    Locator::parse(raw).map_err(|e| e.at_line(line))
}

/// Program-visible rendering of a value for printed output.
pub fn render(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Num(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        Value::Num(n) => format!("{}", n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Void => String::new(),
        Value::List(_) | Value::Map(_) | Value::Object(_) => {
            serde_json::to_string(&to_native(value)).unwrap_or_default()
        }
        Value::Stream(s) => format!("<stream {} ({} bytes)>", s.content_type, s.bytes.len()),
        Value::Func(f) => format!("<function {}>", f.name),
        Value::Native(_) => "<builtin>".to_string(),
        Value::Break => "<break>".to_string(),
        Value::Suspend => "<suspend>".to_string(),
    }
}
