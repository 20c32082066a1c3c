//! Script capability: fetching stored programs by name
//!
//! Programs arrive as the external parser's bound JSON trees plus their
//! metadata; the engine binds and runs them. Where scripts actually live
//! (database, plugin archive) is the host's concern.

use crate::errors::RuntimeError;
use crate::metadata::ScriptMeta;
use std::cell::RefCell;
use std::collections::HashMap;

/// A stored program: its metadata and the parser's JSON tree.
#[derive(Debug, Clone)]
pub struct StoredScript {
    pub name: String,
    pub meta: ScriptMeta,
    pub program: serde_json::Value,
}

pub trait ScriptApi {
    fn is_available(&self) -> bool;
    fn fetch(&self, name: &str) -> Result<StoredScript, RuntimeError>;
}

/* ===================== Default (registry) ===================== */

pub struct RegistryScriptApi {
    scripts: RefCell<HashMap<String, StoredScript>>,
}

impl RegistryScriptApi {
    pub fn new() -> Self {
        Self {
            scripts: RefCell::new(HashMap::new()),
        }
    }

    pub fn register(&self, script: StoredScript) {
        self.scripts
            .borrow_mut()
            .insert(script.name.clone(), script);
    }
}

impl Default for RegistryScriptApi {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptApi for RegistryScriptApi {
    fn is_available(&self) -> bool {
        true
    }

    fn fetch(&self, name: &str) -> Result<StoredScript, RuntimeError> {
        self.scripts
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::unsupported(format!("no script named '{}'", name), 0))
    }
}

/* ===================== Deny ===================== */

pub struct DenyScriptApi;

impl ScriptApi for DenyScriptApi {
    fn is_available(&self) -> bool {
        false
    }
    fn fetch(&self, _name: &str) -> Result<StoredScript, RuntimeError> {
        Err(RuntimeError::NotAllowed { line: 0 })
    }
}

/* ===================== Null / Test ===================== */

/// Every fetch yields an empty program.
pub struct NullScriptApi;

impl ScriptApi for NullScriptApi {
    fn is_available(&self) -> bool {
        true
    }
    fn fetch(&self, name: &str) -> Result<StoredScript, RuntimeError> {
        Ok(StoredScript {
            name: name.to_string(),
            meta: ScriptMeta::default(),
            program: serde_json::json!([]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_round_trip() {
        let api = RegistryScriptApi::new();
        api.register(StoredScript {
            name: "greet".to_string(),
            meta: ScriptMeta::default(),
            program: json!([{"type": "return", "line": 1}]),
        });

        let fetched = api.fetch("greet").unwrap();
        assert_eq!(fetched.name, "greet");
        assert!(fetched.program.is_array());
    }

    #[test]
    fn test_registry_missing_fails() {
        assert!(RegistryScriptApi::new().fetch("nope").is_err());
    }

    #[test]
    fn test_null_yields_empty_program() {
        let script = NullScriptApi.fetch("anything").unwrap();
        assert_eq!(script.program, json!([]));
    }
}
