//! Statement execution and control flow
//!
//! Statements yield a `Flow`: normal fall-through, loop control, an early
//! return carrying a value, or a suspension. The suspend sentinel also
//! travels through expression results (a call whose body suspended evaluates
//! to `Value::Suspend`), so assignment, conditions and expression statements
//! check for it before committing side effects or picking a branch.
//!
//! Resume model: on re-entry the whole program re-executes from the top.
//! A suspend node whose id matches the pending resume point consumes the
//! point and falls through; a suspend node reached while a different point
//! is pending also falls through, because its own suspension already
//! happened in an earlier pass. Only with no pending point does a suspend
//! node suspend afresh. Loops save their iteration counter and a snapshot
//! of the bindings visible at iteration entry under their node id, restore
//! both on re-entry, and skip the iterations completed before suspension.

use crate::engine::ast::{Expr, Stmt};
use crate::engine::expressions::eval;
use crate::engine::EvalContext;
use crate::errors::RuntimeError;
use crate::function::Function;
use crate::scope::{self, Scope, ScopeRef};
use crate::value::Value;
use std::collections::HashMap;

/* ===================== Flow ===================== */

#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
    Suspend,
}

/* ===================== Execution ===================== */

pub fn exec_block(
    stmts: &[Stmt],
    scope: &ScopeRef,
    ctx: &EvalContext,
) -> Result<Flow, RuntimeError> {
    for stmt in stmts {
        match exec_stmt(stmt, scope, ctx)? {
            Flow::Normal => {}
            other => return Ok(other),
        }
    }
    Ok(Flow::Normal)
}

pub fn exec_stmt(stmt: &Stmt, scope: &ScopeRef, ctx: &EvalContext) -> Result<Flow, RuntimeError> {
    ctx.handlers.debug().on_statement(stmt.kind(), stmt.line());
    // An error raised below a node bound without a line inherits the line of
    // the statement it surfaced from.
    dispatch(stmt, scope, ctx).map_err(|e| e.at_line(stmt.line()))
}

fn dispatch(stmt: &Stmt, scope: &ScopeRef, ctx: &EvalContext) -> Result<Flow, RuntimeError> {
    match stmt {
        Stmt::Expr { expr, .. } => {
            let value = eval(expr, scope, ctx)?;
            match value {
                Value::Suspend => Ok(Flow::Suspend),
                Value::Break => Ok(Flow::Break),
                _ => Ok(Flow::Normal),
            }
        }

        Stmt::Assign { target, expr, line } => {
            let value = eval(expr, scope, ctx)?;
            if value == Value::Suspend {
                // Nothing is bound; the whole statement re-runs on resume
                return Ok(Flow::Suspend);
            }
            scope::assign(scope, target, value, *line)?;
            Ok(Flow::Normal)
        }

        Stmt::If {
            cond,
            then_body,
            else_body,
            ..
        } => {
            let test = eval(cond, scope, ctx)?;
            if test == Value::Suspend {
                return Ok(Flow::Suspend);
            }
            let branch = if test.is_truthy() { then_body } else { else_body };
            exec_block(branch, &Scope::block(scope.clone()), ctx)
        }

        Stmt::While {
            cond,
            body,
            node_id,
            ..
        } => exec_while(cond, body, node_id, scope, ctx),

        Stmt::For {
            var,
            iter,
            body,
            node_id,
            line,
        } => exec_for(var, iter, body, node_id, *line, scope, ctx),

        Stmt::FuncDef {
            name, params, body, line,
        } => {
            let f = Function::new(
                name.clone(),
                params.clone(),
                Stmt::Block {
                    body: body.clone(),
                    line: *line,
                },
                scope.clone(),
            );
            scope
                .borrow_mut()
                .define(name.clone(), Value::Func(Box::new(f)));
            Ok(Flow::Normal)
        }

        Stmt::Return { value, .. } => {
            let value = match value {
                Some(expr) => eval(expr, scope, ctx)?,
                None => Value::Void,
            };
            if value == Value::Suspend {
                return Ok(Flow::Suspend);
            }
            Ok(Flow::Return(value))
        }

        Stmt::Break { .. } => Ok(Flow::Break),
        Stmt::Continue { .. } => Ok(Flow::Continue),

        Stmt::Try {
            body,
            catch_var,
            catch_body,
            ..
        } => {
            match exec_block(body, &Scope::block(scope.clone()), ctx) {
                Ok(flow) => Ok(flow),
                // Only values the program itself raised are catchable
                Err(RuntimeError::Thrown { value, .. }) => {
                    let catch_scope = Scope::block(scope.clone());
                    catch_scope.borrow_mut().define(catch_var.clone(), value);
                    exec_block(catch_body, &catch_scope, ctx)
                }
                Err(other) => Err(other),
            }
        }

        Stmt::Suspend {
            seconds,
            node_id,
            line,
        } => {
            let api = ctx.handlers.suspend();

            match api.current_resume_point() {
                // We are the node being resumed: consume the point.
                Some(point) if point == *node_id => {
                    api.clear_resume_point();
                    Ok(Flow::Normal)
                }
                // Replaying toward a different pending point: this node
                // already suspended in an earlier pass, fall through.
                Some(_) => Ok(Flow::Normal),
                None => {
                    if !api.is_available() {
                        return Err(RuntimeError::CannotSuspend { line: *line });
                    }

                    let value = eval(seconds, scope, ctx)?;
                    if value == Value::Suspend {
                        return Ok(Flow::Suspend);
                    }
                    let secs = value.as_num().ok_or_else(|| {
                        RuntimeError::type_error(
                            format!(
                                "suspend expects a number of seconds, got {}",
                                value.type_name()
                            ),
                            *line,
                        )
                    })?;

                    api.declare_wait(secs).map_err(|e| e.at_line(*line))?;
                    api.mark_resume_point(node_id).map_err(|e| e.at_line(*line))?;
                    ctx.handlers.debug().on_suspend(node_id);
                    Ok(Flow::Suspend)
                }
            }
        }

        Stmt::Block { body, .. } => exec_block(body, &Scope::block(scope.clone()), ctx),
    }
}

/* ===================== Loops ===================== */

fn exec_while(
    cond: &Expr,
    body: &[Stmt],
    node_id: &str,
    scope: &ScopeRef,
    ctx: &EvalContext,
) -> Result<Flow, RuntimeError> {
    let skip = restore_loop_state(node_id, scope, ctx)?;
    let mut iteration: usize = 0;

    loop {
        let test = eval(cond, scope, ctx)?;
        if test == Value::Suspend {
            return suspend_loop(node_id, iteration, scope::flatten(scope), ctx);
        }
        if !test.is_truthy() {
            break;
        }
        if iteration < skip {
            iteration += 1;
            continue;
        }

        let entry_state = scope::flatten(scope);
        match exec_block(body, &Scope::block(scope.clone()), ctx)? {
            Flow::Normal | Flow::Continue => {}
            Flow::Break => break,
            Flow::Return(v) => return Ok(Flow::Return(v)),
            Flow::Suspend => {
                return suspend_loop(node_id, iteration, entry_state, ctx);
            }
        }
        iteration += 1;
    }

    ctx.handlers.suspend().clear_context(node_id);
    Ok(Flow::Normal)
}

fn exec_for(
    var: &str,
    iter: &Expr,
    body: &[Stmt],
    node_id: &str,
    line: usize,
    scope: &ScopeRef,
    ctx: &EvalContext,
) -> Result<Flow, RuntimeError> {
    let items = match eval(iter, scope, ctx)? {
        Value::Suspend => return Ok(Flow::Suspend),
        Value::List(items) => items,
        other => {
            return Err(RuntimeError::type_error(
                format!("for expects a list, got {}", other.type_name()),
                line,
            ))
        }
    };

    let start = restore_loop_state(node_id, scope, ctx)?;
    for (index, item) in items.into_iter().enumerate().skip(start) {
        let entry_state = scope::flatten(scope);
        let body_scope = Scope::block(scope.clone());
        body_scope.borrow_mut().define(var.to_string(), item);

        match exec_block(body, &body_scope, ctx)? {
            Flow::Normal | Flow::Continue => {}
            Flow::Break => break,
            Flow::Return(v) => return Ok(Flow::Return(v)),
            Flow::Suspend => {
                return suspend_loop(node_id, index, entry_state, ctx);
            }
        }
    }

    ctx.handlers.suspend().clear_context(node_id);
    Ok(Flow::Normal)
}

/* ===================== Loop Resume Contexts ===================== */

/// With a pending resume point, put the loop's saved bindings back and
/// report how many iterations to skip. Replay from the program top reset
/// every binding, so the snapshot undoes the reset before the loop runs.
fn restore_loop_state(
    node_id: &str,
    scope: &ScopeRef,
    ctx: &EvalContext,
) -> Result<usize, RuntimeError> {
    let api = ctx.handlers.suspend();
    if api.current_resume_point().is_none() {
        return Ok(0);
    }

    if let Some(Value::Map(saved)) = api.load_context(node_id, "state") {
        for (name, value) in saved {
            scope::assign(scope, &name, value, 0)?;
        }
    }

    Ok(api
        .load_context(node_id, "index")
        .and_then(|v| v.as_num())
        .map(|n| n as usize)
        .unwrap_or(0))
}

/// Record the suspended iteration and its entry-time bindings under the
/// loop's node id and propagate the suspension.
fn suspend_loop(
    node_id: &str,
    iteration: usize,
    entry_state: HashMap<String, Value>,
    ctx: &EvalContext,
) -> Result<Flow, RuntimeError> {
    let api = ctx.handlers.suspend();
    api.save_context(node_id, "index", Value::Num(iteration as f64))?;
    api.save_context(node_id, "state", Value::Map(entry_state))?;
    Ok(Flow::Suspend)
}
