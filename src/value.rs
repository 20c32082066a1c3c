//! Runtime value model
//!
//! Every evaluation yields exactly one `Value`. The union covers the
//! primitives, the two container shapes (string-keyed maps and ordered
//! lists), structured objects, byte streams, callables, and the two control
//! sentinels (`Break`, `Suspend`) that travel through evaluation as ordinary
//! values so loops and the engine can observe them.

use crate::engine::builtins::Builtin;
use crate::function::Function;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/* ===================== Value ===================== */

/// Runtime value type
///
/// The wide variants (object, stream, function) are boxed so a `Value` on
/// the native stack stays small; the tree walker holds one per frame while
/// recursing through deeply nested programs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Value {
    /// Explicit null (host-side native null maps here)
    Null,
    /// Absence of a result (statements with nothing to say)
    Void,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Structured object: a type name plus named fields
    Object(Box<StructObject>),
    /// Byte stream with a content-type hint
    Stream(Box<ByteStream>),
    /// User-defined function (closure over its definition site)
    Func(Box<Function>),
    /// Builtin function backed by a capability handler
    Native(Builtin),
    /// Control sentinel: abort the innermost loop
    Break,
    /// Control sentinel: execution wants to pause and be re-entered later
    Suspend,
}

/// Structured object value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructObject {
    pub type_name: String,
    pub fields: HashMap<String, Value>,
}

/// Byte stream value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByteStream {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Value {
    /// Truthiness for conditionals
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null | Value::Void => false,
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Void => "void",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Stream(_) => "stream",
            Value::Func(_) => "function",
            Value::Native(_) => "function",
            Value::Break => "break",
            Value::Suspend => "suspend",
        }
    }

    /// True for the control sentinels that must propagate out of statements
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Value::Break | Value::Suspend)
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/* ===================== Native Conversions ===================== */

/// Convert a host-native JSON value into a runtime Value.
///
/// Native null becomes the explicit `Value::Null`; numbers collapse to f64.
pub fn from_native(native: &serde_json::Value) -> Value {
    match native {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => Value::Num(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(from_native).collect()),
        serde_json::Value::Object(fields) => Value::Map(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), from_native(v)))
                .collect(),
        ),
    }
}

/// Convert a runtime Value back to the host-native JSON form.
///
/// Sentinels, streams and callables have no native shape and collapse to
/// null / descriptive strings; hosts never receive them from a completed run
/// in practice.
pub fn to_native(value: &Value) -> serde_json::Value {
    match value {
        Value::Null | Value::Void => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Num(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_native).collect()),
        Value::Map(fields) => serde_json::Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), to_native(v)))
                .collect(),
        ),
        Value::Object(obj) => serde_json::Value::Object(
            obj.fields
                .iter()
                .map(|(k, v)| (k.clone(), to_native(v)))
                .collect(),
        ),
        Value::Stream(s) => serde_json::Value::String(String::from_utf8_lossy(&s.bytes).to_string()),
        Value::Func(f) => serde_json::Value::String(format!("<function {}>", f.name)),
        Value::Native(b) => serde_json::Value::String(format!("<builtin {:?}>", b)),
        Value::Break | Value::Suspend => serde_json::Value::Null,
    }
}

/// Convert a map of host-native values into runtime values.
pub fn from_native_map(natives: &HashMap<String, serde_json::Value>) -> HashMap<String, Value> {
    natives
        .iter()
        .map(|(k, v)| (k.clone(), from_native(v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_native_null_is_explicit_null() {
        assert_eq!(from_native(&json!(null)), Value::Null);
    }

    #[test]
    fn test_native_round_trip() {
        let native = json!({
            "name": "alice",
            "age": 30.0,
            "tags": ["a", "b"],
            "meta": { "active": true, "score": null }
        });

        let value = from_native(&native);
        assert_eq!(to_native(&value), native);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Void.is_truthy());
        assert!(!Value::Num(0.0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(Value::Num(1.0).is_truthy());
        assert!(Value::List(vec![]).is_truthy());
    }

    #[test]
    fn test_sentinels() {
        assert!(Value::Break.is_sentinel());
        assert!(Value::Suspend.is_sentinel());
        assert!(!Value::Null.is_sentinel());
    }
}
