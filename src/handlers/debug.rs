//! Debug hook: passive observation of evaluation
//!
//! Unlike the eight capabilities this hook has no availability check and no
//! deny variant; it observes, it cannot fail, and it cannot affect the
//! program.

use crate::value::Value;

pub trait DebugHook {
    /// Called before each statement node is evaluated.
    fn on_statement(&self, kind: &str, line: usize);

    /// Called when a function is about to be invoked.
    fn on_call(&self, name: &str, line: usize) {
        let _ = (name, line);
    }

    /// Called when evaluation yields the suspend sentinel at `node_id`.
    fn on_suspend(&self, node_id: &str) {
        let _ = node_id;
    }

    /// Called when the top-level evaluation completes.
    fn on_complete(&self, result: &Value) {
        let _ = result;
    }
}

pub struct NoopDebugHook;

impl DebugHook for NoopDebugHook {
    fn on_statement(&self, _kind: &str, _line: usize) {}
}

/// Emits every observation as a tracing event.
pub struct TracingDebugHook;

impl DebugHook for TracingDebugHook {
    fn on_statement(&self, kind: &str, line: usize) {
        tracing::debug!(kind, line, "statement");
    }

    fn on_call(&self, name: &str, line: usize) {
        tracing::debug!(name, line, "call");
    }

    fn on_suspend(&self, node_id: &str) {
        tracing::debug!(node_id, "suspend");
    }

    fn on_complete(&self, result: &Value) {
        tracing::debug!(result = ?result, "complete");
    }
}
