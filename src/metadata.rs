//! Script metadata
//!
//! A stored script declares its parameters (name, type, description), its
//! return type, and free-form string properties. The declared parameter
//! list validates and coerces host-supplied arguments before a run starts,
//! so a program never sees an argument of the wrong shape.

use crate::errors::RuntimeError;
use crate::value::{from_native, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/* ===================== Declarations ===================== */

/// Declared value type for parameters and returns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredType {
    String,
    Number,
    Boolean,
    Map,
    List,
    Any,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: DeclaredType,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnDecl {
    #[serde(rename = "type")]
    pub return_type: DeclaredType,
    #[serde(default)]
    pub description: String,
}

/// Metadata attached to a stored script
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptMeta {
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub returns: Option<ReturnDecl>,
    /// Arbitrary string properties (owner, category, ...)
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

impl ScriptMeta {
    /// Validate and coerce host-supplied arguments against the declared
    /// parameter list. Missing or uncoercible arguments fail fast; arguments
    /// not declared are passed through untouched.
    pub fn validate_args(
        &self,
        args: &HashMap<String, serde_json::Value>,
    ) -> Result<HashMap<String, Value>, RuntimeError> {
        let mut out: HashMap<String, Value> = args
            .iter()
            .map(|(k, v)| (k.clone(), from_native(v)))
            .collect();

        for decl in &self.params {
            let value = out.get(&decl.name).cloned().ok_or_else(|| {
                RuntimeError::type_error(
                    format!("missing required argument '{}'", decl.name),
                    0,
                )
            })?;
            let coerced = coerce(&decl.name, value, decl.param_type)?;
            out.insert(decl.name.clone(), coerced);
        }

        Ok(out)
    }
}

fn coerce(name: &str, value: Value, declared: DeclaredType) -> Result<Value, RuntimeError> {
    let mismatch = |value: &Value| {
        RuntimeError::type_error(
            format!(
                "argument '{}' declared {:?} but got {}",
                name,
                declared,
                value.type_name()
            ),
            0,
        )
    };

    match declared {
        DeclaredType::Any => Ok(value),
        DeclaredType::String => match value {
            Value::Str(_) => Ok(value),
            Value::Num(n) => Ok(Value::Str(n.to_string())),
            Value::Bool(b) => Ok(Value::Str(b.to_string())),
            other => Err(mismatch(&other)),
        },
        DeclaredType::Number => match value {
            Value::Num(_) => Ok(value),
            Value::Str(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Num)
                .map_err(|_| mismatch(&Value::Str(s.clone()))),
            other => Err(mismatch(&other)),
        },
        DeclaredType::Boolean => match value {
            Value::Bool(_) => Ok(value),
            Value::Str(s) => match s.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(mismatch(&Value::Str(s.clone()))),
            },
            other => Err(mismatch(&other)),
        },
        DeclaredType::Map => match value {
            Value::Map(_) => Ok(value),
            other => Err(mismatch(&other)),
        },
        DeclaredType::List => match value {
            Value::List(_) => Ok(value),
            other => Err(mismatch(&other)),
        },
    }
}
