//! Evaluation engine
//!
//! `bind` turns the external parser's JSON tree into typed statements;
//! `Engine` evaluates them against a scope chain and a handler set. A run
//! that yields the suspend sentinel is re-entered by `run`'s poll loop: wait
//! the declared duration (racing a cancellation token), then re-evaluate
//! from the stored resume point until a non-suspend value results.

pub mod ast;
pub mod bind;
pub mod builtins;
pub mod expressions;
pub mod statements;

#[cfg(test)]
mod tests;

pub use bind::bind;

use crate::config::RuntimeConfig;
use crate::engine::ast::Stmt;
use crate::engine::statements::{exec_block, Flow};
use crate::errors::RuntimeError;
use crate::handlers::HandlerSet;
use crate::scope::{Scope, ScopeRef};
use crate::value::{from_native, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/* ===================== Context ===================== */

/// Everything evaluation needs besides the scope chain.
pub struct EvalContext<'a> {
    pub handlers: &'a HandlerSet,
    pub config: &'a RuntimeConfig,
}

/* ===================== Engine ===================== */

pub struct Engine {
    config: RuntimeConfig,
    handlers: HandlerSet,
    /// Shared assign-once scope holding the builtin surface
    constant: ScopeRef,
}

impl Engine {
    pub fn new(config: RuntimeConfig, handlers: HandlerSet) -> Self {
        let constant = Scope::constant();
        builtins::inject_builtins(&constant);
        Self {
            config,
            handlers,
            constant,
        }
    }

    pub fn defaults() -> Self {
        Self::new(RuntimeConfig::default(), HandlerSet::defaults())
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn handlers(&self) -> &HandlerSet {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerSet {
        &mut self.handlers
    }

    /// Fresh per-run global scope chained under the shared constant scope,
    /// seeded with the ENV and PROPS maps.
    pub fn initial_scope(&self) -> ScopeRef {
        let global = Scope::global(self.constant.clone());
        {
            let mut scope = global.borrow_mut();

            let env: HashMap<String, Value> = std::env::vars()
                .map(|(k, v)| (k, Value::Str(v)))
                .collect();
            scope.define("ENV", Value::Map(env));

            let props: HashMap<String, Value> = self
                .config
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), Value::Str(v.clone())))
                .collect();
            scope.define("PROPS", Value::Map(props));
        }
        global
    }

    /// One evaluation pass: inject host inputs, execute, convert flow to the
    /// single result value. A suspended pass yields `Value::Suspend`.
    pub fn evaluate(
        &self,
        program: &[Stmt],
        scope: &ScopeRef,
        inputs: &HashMap<String, serde_json::Value>,
    ) -> Result<Value, RuntimeError> {
        {
            let mut borrowed = scope.borrow_mut();
            for (name, native) in inputs {
                // Native null maps to the explicit null value
                borrowed.define(name.clone(), from_native(native));
            }
        }

        let ctx = EvalContext {
            handlers: &self.handlers,
            config: &self.config,
        };

        let result = match exec_block(program, scope, &ctx)? {
            Flow::Return(v) => v,
            Flow::Suspend => Value::Suspend,
            Flow::Normal | Flow::Break | Flow::Continue => Value::Void,
        };
        self.handlers.debug().on_complete(&result);
        Ok(result)
    }

    /// Run to completion, re-entering suspended evaluations after the
    /// declared wait. The wait races the cancellation token, so a host can
    /// interrupt a suspended run instead of sleeping it out.
    pub async fn run(
        &self,
        program: &[Stmt],
        inputs: &HashMap<String, serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<Value, RuntimeError> {
        let run_id = Uuid::new_v4();
        debug!(%run_id, started = %chrono::Utc::now().to_rfc3339(), "run started");

        let scope = self.initial_scope();
        loop {
            let value = self.evaluate(program, &scope, inputs)?;
            if value != Value::Suspend {
                debug!(%run_id, "run complete");
                return Ok(value);
            }

            let wait = self
                .handlers
                .suspend()
                .wait_seconds()
                .clamp(0.0, self.config.max_poll_seconds);
            debug!(%run_id, wait_seconds = wait, "run suspended");

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(%run_id, "run cancelled while suspended");
                    return Err(RuntimeError::unsupported("run cancelled", 0));
                }
                _ = tokio::time::sleep(Duration::from_secs_f64(wait)) => {}
            }
        }
    }
}
