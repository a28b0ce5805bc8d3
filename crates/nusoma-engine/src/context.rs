// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Run context: the data a block's input mappings resolve against.
//!
//! Reference paths have one of five roots:
//! - `input.*`      worker input
//! - `variables.*`  graph variables
//! - `blocks.<id>.output.*` prior block outputs
//! - `loop.*`       current loop scope (`index`, `item`)
//! - `parallel.*`   current parallel scope (`index`, `item`)

use crate::error::EngineError;
use nusoma_dsl::{CompositeInner, MappingValue, ValueType};
use serde_json::{Map, Value, json};
use std::collections::HashMap;

/// Mutable execution state for one graph run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// Worker input
    pub input: Value,

    /// Graph variables
    pub variables: HashMap<String, Value>,

    /// Outputs of completed blocks, keyed by block id. Each entry is
    /// `{"output": <value>}` so paths read `blocks.<id>.output.*`.
    pub blocks: HashMap<String, Value>,

    /// Scoped values for the innermost loop/parallel frame
    pub locals: HashMap<String, Value>,
}

impl RunContext {
    pub fn new(input: Value, variables: HashMap<String, Value>) -> Self {
        Self {
            input,
            variables,
            blocks: HashMap::new(),
            locals: HashMap::new(),
        }
    }

    /// Record a completed block's output
    pub fn set_block_output(&mut self, block_id: &str, output: Value) {
        self.blocks
            .insert(block_id.to_string(), json!({ "output": output }));
    }

    /// Output of a completed block, if any
    pub fn block_output(&self, block_id: &str) -> Option<&Value> {
        self.blocks.get(block_id).and_then(|v| v.get("output"))
    }

    /// Child context for a loop/parallel iteration: shares the surrounding
    /// data but gets its own `locals` frame and block-output namespace.
    pub fn iteration_scope(&self, scope_key: &str, index: usize, item: Value) -> Self {
        let mut scoped = self.clone();
        scoped
            .locals
            .insert(scope_key.to_string(), json!({ "index": index, "item": item }));
        scoped
    }

    /// Resolve a reference path. Returns `None` when any segment is missing.
    pub fn resolve_reference(&self, path: &str) -> Option<Value> {
        let segments = parse_path(path)?;
        let (root, rest) = segments.split_first()?;

        let root_value: Value = match root {
            PathSegment::Key(key) => match key.as_str() {
                "input" => self.input.clone(),
                "variables" => json!(self.variables),
                "blocks" => json!(self.blocks),
                "loop" | "parallel" => self.locals.get(key)?.clone(),
                _ => return None,
            },
            PathSegment::Index(_) => return None,
        };

        let mut current = root_value;
        for segment in rest {
            current = match segment {
                PathSegment::Key(key) => current.get(key)?.clone(),
                PathSegment::Index(idx) => current.get(idx)?.clone(),
            };
        }
        Some(current)
    }

    /// Resolve a mapping value, honoring defaults and type hints.
    pub fn resolve(&self, block_id: &str, value: &MappingValue) -> Result<Value, EngineError> {
        match value {
            MappingValue::Immediate(imm) => Ok(imm.value.clone()),
            MappingValue::Reference(r) => {
                let resolved = self.resolve_reference(&r.value).or_else(|| r.default.clone());
                match resolved {
                    Some(v) => coerce(v, r.type_hint).map_err(|message| {
                        EngineError::MappingError {
                            block_id: block_id.to_string(),
                            message: format!("'{}': {}", r.value, message),
                        }
                    }),
                    None => Err(EngineError::MappingError {
                        block_id: block_id.to_string(),
                        message: format!("reference '{}' did not resolve", r.value),
                    }),
                }
            }
            MappingValue::Composite(c) => match &c.value {
                CompositeInner::Object(map) => {
                    let mut out = Map::new();
                    for (key, nested) in map {
                        out.insert(key.clone(), self.resolve(block_id, nested)?);
                    }
                    Ok(Value::Object(out))
                }
                CompositeInner::Array(arr) => {
                    let mut out = Vec::with_capacity(arr.len());
                    for nested in arr {
                        out.push(self.resolve(block_id, nested)?);
                    }
                    Ok(Value::Array(out))
                }
            },
        }
    }

    /// Resolve a whole input mapping into a JSON object.
    pub fn resolve_mapping(
        &self,
        block_id: &str,
        mapping: Option<&HashMap<String, MappingValue>>,
    ) -> Result<Map<String, Value>, EngineError> {
        let mut out = Map::new();
        if let Some(mapping) = mapping {
            for (key, value) in mapping {
                out.insert(key.clone(), self.resolve(block_id, value)?);
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Parse a reference path into segments. Supports dot notation, bracketed
/// string keys (`blocks["my block"]`) and numeric indices (`items[0]`).
/// Returns `None` on malformed paths (unterminated bracket, empty segment).
pub fn parse_path(path: &str) -> Option<Vec<PathSegment>> {
    let mut segments = Vec::new();
    let mut rest = path;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('[') {
            let end = after.find(']')?;
            let inner = &after[..end];
            let segment = if let Some(quoted) = inner
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| inner.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
            {
                PathSegment::Key(quoted.to_string())
            } else {
                PathSegment::Index(inner.parse().ok()?)
            };
            segments.push(segment);
            rest = &after[end + 1..];
            rest = rest.strip_prefix('.').unwrap_or(rest);
        } else {
            let end = rest.find(|c| c == '.' || c == '[').unwrap_or(rest.len());
            let key = &rest[..end];
            if key.is_empty() {
                return None;
            }
            segments.push(PathSegment::Key(key.to_string()));
            rest = &rest[end..];
            rest = rest.strip_prefix('.').unwrap_or(rest);
        }
    }

    if segments.is_empty() {
        return None;
    }
    Some(segments)
}

/// Coerce a resolved value toward a declared type hint. Lossless coercions
/// only; a value that cannot be represented in the hinted type is an error.
pub fn coerce(value: Value, hint: Option<ValueType>) -> Result<Value, String> {
    let Some(hint) = hint else {
        return Ok(value);
    };

    match hint {
        ValueType::Json => Ok(value),
        ValueType::String => match value {
            Value::String(_) => Ok(value),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(format!("cannot coerce {} to string", type_name(&other))),
        },
        ValueType::Integer => match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
            Value::Number(n) => {
                let f = n.as_f64().unwrap_or(f64::NAN);
                if f.fract() == 0.0 && f.is_finite() {
                    Ok(json!(f as i64))
                } else {
                    Err(format!("'{}' is not an integer", n))
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|i| json!(i))
                .map_err(|_| format!("'{}' is not an integer", s)),
            other => Err(format!("cannot coerce {} to integer", type_name(other))),
        },
        ValueType::Number => match &value {
            Value::Number(_) => Ok(value),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(|f| json!(f))
                .map_err(|_| format!("'{}' is not a number", s)),
            other => Err(format!("cannot coerce {} to number", type_name(other))),
        },
        ValueType::Boolean => match &value {
            Value::Bool(_) => Ok(value),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(json!(true)),
                "false" => Ok(json!(false)),
                _ => Err(format!("'{}' is not a boolean", s)),
            },
            other => Err(format!("cannot coerce {} to boolean", type_name(other))),
        },
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
