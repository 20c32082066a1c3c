//! Port capability: named outbound endpoints
//!
//! A port is a host-registered callback reachable from a program by name.
//! The registry keeps the runtime ignorant of what sits behind the name
//! (message queue, webhook, another process).

use crate::errors::RuntimeError;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;

type PortFn = Box<dyn Fn(&Value) -> Result<Value, RuntimeError>>;

pub trait PortApi {
    fn is_available(&self) -> bool;
    fn send(&self, port: &str, payload: &Value) -> Result<Value, RuntimeError>;
}

/* ===================== Default (callback registry) ===================== */

pub struct DefaultPortApi {
    ports: RefCell<HashMap<String, PortFn>>,
}

impl DefaultPortApi {
    pub fn new() -> Self {
        Self {
            ports: RefCell::new(HashMap::new()),
        }
    }

    pub fn register(
        &self,
        name: impl Into<String>,
        f: impl Fn(&Value) -> Result<Value, RuntimeError> + 'static,
    ) {
        self.ports.borrow_mut().insert(name.into(), Box::new(f));
    }
}

impl Default for DefaultPortApi {
    fn default() -> Self {
        Self::new()
    }
}

impl PortApi for DefaultPortApi {
    fn is_available(&self) -> bool {
        true
    }

    fn send(&self, port: &str, payload: &Value) -> Result<Value, RuntimeError> {
        let ports = self.ports.borrow();
        let f = ports
            .get(port)
            .ok_or_else(|| RuntimeError::unsupported(format!("no port named '{}'", port), 0))?;
        f(payload)
    }
}

/* ===================== Deny ===================== */

pub struct DenyPortApi;

impl PortApi for DenyPortApi {
    fn is_available(&self) -> bool {
        false
    }
    fn send(&self, _port: &str, _payload: &Value) -> Result<Value, RuntimeError> {
        Err(RuntimeError::NotAllowed { line: 0 })
    }
}

/* ===================== Null / Test ===================== */

pub struct NullPortApi;

impl PortApi for NullPortApi {
    fn is_available(&self) -> bool {
        true
    }
    fn send(&self, _port: &str, _payload: &Value) -> Result<Value, RuntimeError> {
        Ok(Value::Null)
    }
}
