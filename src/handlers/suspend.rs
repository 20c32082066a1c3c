//! Suspend capability: resume points, resume contexts, and wait duration
//!
//! Two policies exist. The memory policy backs all operations with an
//! in-memory `ResumeStore` (serializable so a host can persist a suspended
//! run itself). The deny policy fails every mutation with "cannot suspend";
//! reads report absence, so probing code behaves the same under both.
//!
//! A context lookup miss means no prior suspension was recorded at that
//! path, never an error.

use crate::errors::RuntimeError;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;

/* ===================== Resume Store ===================== */

/// Everything a suspended run needs to continue: the node to resume from,
/// the declared wait, and per-node named context snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResumeStore {
    pub resume_point: Option<String>,
    pub wait_seconds: f64,
    /// node id -> context name -> captured value
    pub contexts: HashMap<String, HashMap<String, Value>>,
}

/* ===================== Trait ===================== */

pub trait SuspendApi {
    fn is_available(&self) -> bool;

    /// How long the host should wait before the next resume attempt.
    fn declare_wait(&self, seconds: f64) -> Result<(), RuntimeError>;
    fn wait_seconds(&self) -> f64;

    fn mark_resume_point(&self, node_id: &str) -> Result<(), RuntimeError>;
    fn current_resume_point(&self) -> Option<String>;
    fn clear_resume_point(&self);

    fn save_context(&self, node_id: &str, name: &str, value: Value) -> Result<(), RuntimeError>;
    fn load_context(&self, node_id: &str, name: &str) -> Option<Value>;
    fn has_context(&self, node_id: &str, name: &str) -> bool;
    fn clear_context(&self, node_id: &str);
}

/* ===================== Memory policy ===================== */

pub struct MemorySuspendApi {
    store: RefCell<ResumeStore>,
}

impl MemorySuspendApi {
    pub fn new() -> Self {
        Self {
            store: RefCell::new(ResumeStore::default()),
        }
    }

    /// Rehydrate from a store a host persisted across a suspend.
    pub fn from_store(store: ResumeStore) -> Self {
        Self {
            store: RefCell::new(store),
        }
    }

    /// Snapshot the current store, e.g. for host-side persistence.
    pub fn snapshot(&self) -> ResumeStore {
        self.store.borrow().clone()
    }
}

impl Default for MemorySuspendApi {
    fn default() -> Self {
        Self::new()
    }
}

impl SuspendApi for MemorySuspendApi {
    fn is_available(&self) -> bool {
        true
    }

    fn declare_wait(&self, seconds: f64) -> Result<(), RuntimeError> {
        self.store.borrow_mut().wait_seconds = seconds;
        Ok(())
    }

    fn wait_seconds(&self) -> f64 {
        self.store.borrow().wait_seconds
    }

    fn mark_resume_point(&self, node_id: &str) -> Result<(), RuntimeError> {
        self.store.borrow_mut().resume_point = Some(node_id.to_string());
        Ok(())
    }

    fn current_resume_point(&self) -> Option<String> {
        self.store.borrow().resume_point.clone()
    }

    fn clear_resume_point(&self) {
        self.store.borrow_mut().resume_point = None;
    }

    fn save_context(&self, node_id: &str, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.store
            .borrow_mut()
            .contexts
            .entry(node_id.to_string())
            .or_default()
            .insert(name.to_string(), value);
        Ok(())
    }

    fn load_context(&self, node_id: &str, name: &str) -> Option<Value> {
        self.store
            .borrow()
            .contexts
            .get(node_id)
            .and_then(|ctx| ctx.get(name))
            .cloned()
    }

    fn has_context(&self, node_id: &str, name: &str) -> bool {
        self.store
            .borrow()
            .contexts
            .get(node_id)
            .map(|ctx| ctx.contains_key(name))
            .unwrap_or(false)
    }

    fn clear_context(&self, node_id: &str) {
        self.store.borrow_mut().contexts.remove(node_id);
    }
}

/* ===================== Deny policy ===================== */

pub struct DenySuspendApi;

impl SuspendApi for DenySuspendApi {
    fn is_available(&self) -> bool {
        false
    }

    fn declare_wait(&self, _seconds: f64) -> Result<(), RuntimeError> {
        Err(RuntimeError::CannotSuspend { line: 0 })
    }

    fn wait_seconds(&self) -> f64 {
        0.0
    }

    fn mark_resume_point(&self, _node_id: &str) -> Result<(), RuntimeError> {
        Err(RuntimeError::CannotSuspend { line: 0 })
    }

    fn current_resume_point(&self) -> Option<String> {
        None
    }

    fn clear_resume_point(&self) {}

    fn save_context(&self, _node_id: &str, _name: &str, _value: Value) -> Result<(), RuntimeError> {
        Err(RuntimeError::CannotSuspend { line: 0 })
    }

    fn load_context(&self, _node_id: &str, _name: &str) -> Option<Value> {
        None
    }

    fn has_context(&self, _node_id: &str, _name: &str) -> bool {
        false
    }

    fn clear_context(&self, _node_id: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_resume_point_round_trip() {
        let api = MemorySuspendApi::new();
        assert_eq!(api.current_resume_point(), None);

        api.mark_resume_point("suspend:2").unwrap();
        assert_eq!(api.current_resume_point().as_deref(), Some("suspend:2"));

        api.clear_resume_point();
        assert_eq!(api.current_resume_point(), None);
    }

    #[test]
    fn test_context_keyed_by_node_and_name() {
        let api = MemorySuspendApi::new();
        api.save_context("while:0", "index", Value::Num(3.0)).unwrap();

        assert!(api.has_context("while:0", "index"));
        assert!(!api.has_context("while:0", "other"));
        assert!(!api.has_context("while:1", "index"));
        assert_eq!(api.load_context("while:0", "index"), Some(Value::Num(3.0)));

        // Miss means "nothing recorded", not an error
        assert_eq!(api.load_context("for:9", "index"), None);
    }

    #[test]
    fn test_clear_context_drops_whole_node() {
        let api = MemorySuspendApi::new();
        api.save_context("while:0", "index", Value::Num(1.0)).unwrap();
        api.save_context("while:0", "acc", Value::Num(2.0)).unwrap();

        api.clear_context("while:0");
        assert!(!api.has_context("while:0", "index"));
        assert!(!api.has_context("while:0", "acc"));
    }

    #[test]
    fn test_store_snapshot_serializes() {
        let api = MemorySuspendApi::new();
        api.declare_wait(30.0).unwrap();
        api.mark_resume_point("suspend:1").unwrap();
        api.save_context("suspend:1", "state", Value::Str("mid".into()))
            .unwrap();

        let text = serde_json::to_string(&api.snapshot()).unwrap();
        let restored: ResumeStore = serde_json::from_str(&text).unwrap();
        let rehydrated = MemorySuspendApi::from_store(restored);

        assert_eq!(rehydrated.wait_seconds(), 30.0);
        assert_eq!(rehydrated.current_resume_point().as_deref(), Some("suspend:1"));
        assert_eq!(
            rehydrated.load_context("suspend:1", "state"),
            Some(Value::Str("mid".into()))
        );
    }

    #[test]
    fn test_deny_fails_mutations_and_reads_report_absence() {
        let api = DenySuspendApi;
        assert!(!api.is_available());

        assert!(matches!(
            api.mark_resume_point("x"),
            Err(RuntimeError::CannotSuspend { .. })
        ));
        assert!(matches!(
            api.declare_wait(1.0),
            Err(RuntimeError::CannotSuspend { .. })
        ));
        assert!(matches!(
            api.save_context("x", "y", Value::Null),
            Err(RuntimeError::CannotSuspend { .. })
        ));

        assert_eq!(api.current_resume_point(), None);
        assert!(!api.has_context("x", "y"));
    }
}
