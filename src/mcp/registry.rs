// Operation Registry
//
// Declarative argument schemas for every tool. A schema validates incoming
// arguments, fills in defaults, and renders itself as JSON Schema for
// `tools/list`.

use crate::errors::{Result, WorkflowError};
use serde_json::{json, Map, Value};

/// JSON type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// JSON string
    String,
    /// JSON integer
    Integer,
}

impl ParamKind {
    fn json_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
        }
    }
}

/// One declared parameter
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Argument key
    pub key: &'static str,
    /// Expected JSON type
    pub kind: ParamKind,
    /// Must the caller supply it
    pub required: bool,
    /// Value used when the caller omits it
    pub default: Option<Value>,
    /// Shown to the calling agent
    pub description: &'static str,
}

impl ParamSpec {
    /// Required parameter
    pub fn required(key: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            key,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    /// Optional parameter without a default
    pub fn optional(key: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            key,
            kind,
            required: false,
            default: None,
            description,
        }
    }

    /// Attach a default value
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Name, description and parameters of a tool
#[derive(Debug, Clone)]
pub struct OperationSchema {
    /// Tool name
    pub name: &'static str,
    /// Tool description
    pub description: &'static str,
    /// Declared parameters, in display order
    pub params: Vec<ParamSpec>,
}

impl OperationSchema {
    /// Render as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.params {
            let mut property = json!({
                "type": param.kind.json_type(),
                "description": param.description,
            });
            if let Some(default) = &param.default {
                property["default"] = default.clone();
            }
            properties.insert(param.key.to_string(), property);

            if param.required {
                required.push(Value::from(param.key));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check arguments and merge them over the declared defaults
    ///
    /// `Null` arguments are treated as an empty object. Keys not in the
    /// schema are dropped. Explicit `null` values count as omitted.
    pub fn validate(&self, arguments: &Value) -> Result<Arguments> {
        let supplied = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            other => {
                return Err(WorkflowError::validation_error(
                    self.name,
                    format!("arguments must be an object, got {}", json_kind(other)),
                ))
            }
        };

        let mut merged = Map::new();
        for param in &self.params {
            match supplied.get(param.key).filter(|v| !v.is_null()) {
                Some(value) if param.kind.accepts(value) => {
                    merged.insert(param.key.to_string(), value.clone());
                }
                Some(value) => {
                    return Err(WorkflowError::validation_error(
                        self.name,
                        format!(
                            "argument '{}' must be {}, got {}",
                            param.key,
                            param.kind.json_type(),
                            json_kind(value)
                        ),
                    ));
                }
                None if param.required => {
                    return Err(WorkflowError::validation_error(
                        self.name,
                        format!("missing required argument '{}'", param.key),
                    ));
                }
                None => {
                    if let Some(default) = &param.default {
                        merged.insert(param.key.to_string(), default.clone());
                    }
                }
            }
        }

        Ok(Arguments(merged))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Arguments that passed validation, with defaults applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// String argument, if present
    pub fn string(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Integer argument, if present
    pub fn integer(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    /// String argument the schema guarantees
    pub fn require_string(&self, operation: &str, key: &str) -> Result<&str> {
        self.string(key).ok_or_else(|| {
            WorkflowError::validation_error(operation, format!("missing required argument '{}'", key))
        })
    }
}
