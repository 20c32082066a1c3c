//! Cache capability: keyed value store scoped to the handler set

use crate::errors::RuntimeError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;

pub trait CacheApi {
    fn is_available(&self) -> bool;
    fn get(&self, key: &str) -> Result<Option<Value>, RuntimeError>;
    fn put(&self, key: &str, value: Value) -> Result<(), RuntimeError>;
    fn remove(&self, key: &str) -> Result<(), RuntimeError>;
}

/* ===================== Default (in-memory) ===================== */

pub struct DefaultCacheApi {
    entries: RefCell<HashMap<String, Value>>,
}

impl DefaultCacheApi {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
        }
    }
}

impl Default for DefaultCacheApi {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheApi for DefaultCacheApi {
    fn is_available(&self) -> bool {
        true
    }
    fn get(&self, key: &str) -> Result<Option<Value>, RuntimeError> {
        Ok(self.entries.borrow().get(key).cloned())
    }
    fn put(&self, key: &str, value: Value) -> Result<(), RuntimeError> {
        self.entries.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }
    fn remove(&self, key: &str) -> Result<(), RuntimeError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/* ===================== Deny ===================== */

pub struct DenyCacheApi;

impl CacheApi for DenyCacheApi {
    fn is_available(&self) -> bool {
        false
    }
    fn get(&self, _key: &str) -> Result<Option<Value>, RuntimeError> {
        Err(RuntimeError::NotAllowed { line: 0 })
    }
    fn put(&self, _key: &str, _value: Value) -> Result<(), RuntimeError> {
        Err(RuntimeError::NotAllowed { line: 0 })
    }
    fn remove(&self, _key: &str) -> Result<(), RuntimeError> {
        Err(RuntimeError::NotAllowed { line: 0 })
    }
}

/* ===================== Null / Test ===================== */

/// Accepts every put and remembers nothing.
pub struct NullCacheApi;

impl CacheApi for NullCacheApi {
    fn is_available(&self) -> bool {
        true
    }
    fn get(&self, _key: &str) -> Result<Option<Value>, RuntimeError> {
        Ok(None)
    }
    fn put(&self, _key: &str, _value: Value) -> Result<(), RuntimeError> {
        Ok(())
    }
    fn remove(&self, _key: &str) -> Result<(), RuntimeError> {
        Ok(())
    }
}
