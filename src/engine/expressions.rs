//! Expression evaluation
//!
//! The suspend sentinel travels through expressions like any other value: a
//! sub-expression evaluating to `Value::Suspend` short-circuits the whole
//! expression to the sentinel, so operators, calls and containers never
//! compute over a half-suspended operand.
//!
//! The walker recurses natively per expression node, so each dispatch arm
//! lives in its own function to keep individual stack frames small.

use crate::engine::ast::{BinOp, Expr, Stmt, UnOp};
use crate::engine::builtins;
use crate::engine::statements::{exec_block, exec_stmt, Flow};
use crate::engine::EvalContext;
use crate::errors::RuntimeError;
use crate::function::Function;
use crate::scope::{self, ScopeRef};
use crate::value::Value;
use std::collections::HashMap;

pub fn eval(expr: &Expr, scope: &ScopeRef, ctx: &EvalContext) -> Result<Value, RuntimeError> {
    match expr {
        Expr::Literal { value, .. } => Ok(value.clone()),

        Expr::Var { name, .. } => Ok(lookup(scope, name)),

        Expr::Binary {
            op, left, right, line,
        } => eval_binary(*op, left, right, scope, ctx, *line),

        Expr::Unary { op, expr, line } => eval_unary(*op, expr, scope, ctx, *line),

        Expr::Call { name, args, line } => eval_call(name, args, scope, ctx, *line),

        Expr::List { items, .. } => eval_list(items, scope, ctx),

        Expr::Map { entries, .. } => eval_map(entries, scope, ctx),

        Expr::Index {
            target, index, line,
        } => eval_index(target, index, scope, ctx, *line),
    }
}

fn eval_unary(
    op: UnOp,
    expr: &Expr,
    scope: &ScopeRef,
    ctx: &EvalContext,
    line: usize,
) -> Result<Value, RuntimeError> {
    let value = eval(expr, scope, ctx)?;
    if value == Value::Suspend {
        return Ok(Value::Suspend);
    }
    match op {
        UnOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnOp::Neg => match value.as_num() {
            Some(n) => Ok(Value::Num(-n)),
            None => Err(RuntimeError::type_error(
                format!("cannot negate {}", value.type_name()),
                line,
            )),
        },
    }
}

fn eval_call(
    name: &str,
    args: &[Expr],
    scope: &ScopeRef,
    ctx: &EvalContext,
    line: usize,
) -> Result<Value, RuntimeError> {
    let mut evaluated = Vec::with_capacity(args.len());
    for arg in args {
        let value = eval(arg, scope, ctx)?;
        if value == Value::Suspend {
            return Ok(Value::Suspend);
        }
        evaluated.push(value);
    }

    match lookup(scope, name) {
        Value::Func(f) => {
            ctx.handlers.debug().on_call(name, line);
            invoke(&f, evaluated, ctx, line)
        }
        Value::Native(b) => {
            ctx.handlers.debug().on_call(name, line);
            builtins::call(b, evaluated, scope, ctx, line)
        }
        other => Err(RuntimeError::type_error(
            format!("'{}' is not callable ({})", name, other.type_name()),
            line,
        )),
    }
}

fn eval_list(items: &[Expr], scope: &ScopeRef, ctx: &EvalContext) -> Result<Value, RuntimeError> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let value = eval(item, scope, ctx)?;
        if value == Value::Suspend {
            return Ok(Value::Suspend);
        }
        out.push(value);
    }
    Ok(Value::List(out))
}

fn eval_map(
    entries: &[(String, Expr)],
    scope: &ScopeRef,
    ctx: &EvalContext,
) -> Result<Value, RuntimeError> {
    let mut out = HashMap::with_capacity(entries.len());
    for (key, expr) in entries {
        let value = eval(expr, scope, ctx)?;
        if value == Value::Suspend {
            return Ok(Value::Suspend);
        }
        out.insert(key.clone(), value);
    }
    Ok(Value::Map(out))
}

fn eval_index(
    target: &Expr,
    index: &Expr,
    scope: &ScopeRef,
    ctx: &EvalContext,
    line: usize,
) -> Result<Value, RuntimeError> {
    let target = eval(target, scope, ctx)?;
    if target == Value::Suspend {
        return Ok(Value::Suspend);
    }
    let index = eval(index, scope, ctx)?;
    if index == Value::Suspend {
        return Ok(Value::Suspend);
    }
    match (&target, &index) {
        (Value::List(items), Value::Num(n)) => {
            let idx = *n as usize;
            Ok(items.get(idx).cloned().unwrap_or(Value::Null))
        }
        (Value::Map(fields), Value::Str(key)) => {
            Ok(fields.get(key).cloned().unwrap_or(Value::Null))
        }
        (Value::Object(obj), Value::Str(key)) => {
            Ok(obj.fields.get(key).cloned().unwrap_or(Value::Null))
        }
        _ => Err(RuntimeError::type_error(
            format!(
                "cannot index {} with {}",
                target.type_name(),
                index.type_name()
            ),
            line,
        )),
    }
}

/// Resolve a possibly-dotted name: resolve the root in the scope chain, then
/// descend map/object fields. Any miss yields explicit null, never an error.
pub fn lookup(scope: &ScopeRef, name: &str) -> Value {
    let mut segments = name.split('.');
    let root = match segments.next() {
        Some(r) => r,
        None => return Value::Null,
    };

    let mut current = match scope::resolve(scope, root) {
        Some(v) => v,
        None => return Value::Null,
    };

    for segment in segments {
        current = match &current {
            Value::Map(fields) => fields.get(segment).cloned().unwrap_or(Value::Null),
            Value::Object(obj) => obj.fields.get(segment).cloned().unwrap_or(Value::Null),
            _ => return Value::Null,
        };
    }
    current
}

/* ===================== Function Invocation ===================== */

/// Invoke a user function: arity check, recursion guard, then the body
/// against a freshly isolated scope seeded with the bound arguments.
pub fn invoke(
    f: &Function,
    args: Vec<Value>,
    ctx: &EvalContext,
    line: usize,
) -> Result<Value, RuntimeError> {
    f.check_arity(args.len(), line)?;
    let _guard = f.enter(ctx.config, line)?;

    // Closure: the definition-site scope, not the caller's. The capture is
    // copied per invocation so concurrently in-flight recursive calls cannot
    // see each other's rebindings.
    let captured = f
        .captured
        .as_ref()
        .ok_or_else(|| RuntimeError::unsupported(format!("function '{}' has no captured scope", f.name), line))?;
    let call_scope = scope::isolated(&scope::shallow_copy(captured));

    for (param, arg) in f.params.iter().zip(args) {
        call_scope.borrow_mut().define(param.clone(), arg);
    }

    // A block body runs directly in the call scope, skipping the wrapper
    // statement frame.
    let flow = match f.body.as_ref() {
        Stmt::Block { body, .. } => exec_block(body, &call_scope, ctx)?,
        other => exec_stmt(other, &call_scope, ctx)?,
    };
    match flow {
        Flow::Return(v) => Ok(v),
        Flow::Suspend => Ok(Value::Suspend),
        _ => Ok(Value::Void),
    }
}

fn eval_binary(
    op: BinOp,
    left: &Expr,
    right: &Expr,
    scope: &ScopeRef,
    ctx: &EvalContext,
    line: usize,
) -> Result<Value, RuntimeError> {
    // Short-circuit forms first
    match op {
        BinOp::And => {
            let l = eval(left, scope, ctx)?;
            if l == Value::Suspend {
                return Ok(Value::Suspend);
            }
            if !l.is_truthy() {
                return Ok(Value::Bool(false));
            }
            let r = eval(right, scope, ctx)?;
            if r == Value::Suspend {
                return Ok(Value::Suspend);
            }
            return Ok(Value::Bool(r.is_truthy()));
        }
        BinOp::Or => {
            let l = eval(left, scope, ctx)?;
            if l == Value::Suspend {
                return Ok(Value::Suspend);
            }
            if l.is_truthy() {
                return Ok(Value::Bool(true));
            }
            let r = eval(right, scope, ctx)?;
            if r == Value::Suspend {
                return Ok(Value::Suspend);
            }
            return Ok(Value::Bool(r.is_truthy()));
        }
        _ => {}
    }

    let l = eval(left, scope, ctx)?;
    let r = eval(right, scope, ctx)?;
    // A suspended operand makes the whole expression the sentinel; the
    // operator re-runs on resume.
    if l == Value::Suspend || r == Value::Suspend {
        return Ok(Value::Suspend);
    }

    match op {
        BinOp::Eq => Ok(Value::Bool(l == r)),
        BinOp::Ne => Ok(Value::Bool(l != r)),

        BinOp::Add => match (&l, &r) {
            (Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
            (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::Str(format!(
                "{}{}",
                builtins::render(&l),
                builtins::render(&r)
            ))),
            (Value::List(a), Value::List(b)) => {
                let mut out = a.clone();
                out.extend(b.iter().cloned());
                Ok(Value::List(out))
            }
            _ => Err(type_mismatch("+", &l, &r, line)),
        },

        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
            let (a, b) = match (l.as_num(), r.as_num()) {
                (Some(a), Some(b)) => (a, b),
                _ => return Err(type_mismatch(op_symbol(op), &l, &r, line)),
            };
            match op {
                BinOp::Sub => Ok(Value::Num(a - b)),
                BinOp::Mul => Ok(Value::Num(a * b)),
                BinOp::Div => {
                    if b == 0.0 {
                        return Err(RuntimeError::unsupported("division by zero", line));
                    }
                    Ok(Value::Num(a / b))
                }
                BinOp::Mod => {
                    if b == 0.0 {
                        return Err(RuntimeError::unsupported("division by zero", line));
                    }
                    Ok(Value::Num(a % b))
                }
                _ => unreachable!(),
            }
        }

        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = match (&l, &r) {
                (Value::Num(a), Value::Num(b)) => a.partial_cmp(b),
                (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                _ => None,
            };
            let Some(ordering) = ordering else {
                return Err(type_mismatch(op_symbol(op), &l, &r, line));
            };
            let result = match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                BinOp::Ge => ordering.is_ge(),
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }

        BinOp::And | BinOp::Or => unreachable!(),
    }
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "and",
        BinOp::Or => "or",
    }
}

fn type_mismatch(op: &str, l: &Value, r: &Value, line: usize) -> RuntimeError {
    RuntimeError::type_error(
        format!("cannot apply '{}' to {} and {}", op, l.type_name(), r.type_name()),
        line,
    )
}
