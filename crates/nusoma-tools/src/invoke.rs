// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tool dispatch: builds an HTTP request from a descriptor and resolved
//! params, sends it, and normalizes the response.

use crate::config::{HttpMethod, ResponseTransform, ToolConfig, ToolOutput};
use crate::error::{self, ToolError};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const ERROR_BODY_SNIPPET_LEN: usize = 500;

/// Where internal tools resolve against.
#[derive(Debug, Clone)]
pub struct InvokeContext {
    /// Base URL of the nusoma API for `internal: true` tools
    pub base_url: String,

    /// Key forwarded as a bearer token on internal requests
    pub api_key: Option<String>,
}

impl Default for InvokeContext {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            api_key: None,
        }
    }
}

/// Invoke a tool. Never panics; every failure path returns a [`ToolError`].
pub async fn invoke(
    config: &ToolConfig,
    params: &Map<String, Value>,
    ctx: &InvokeContext,
) -> Result<ToolOutput, ToolError> {
    let params = merge_defaults(config, params);

    for name in config.required_params() {
        if !params.contains_key(name) {
            return Err(ToolError::permanent(
                "MISSING_PARAMETER",
                format!("Tool '{}' requires parameter '{}'", config.id, name),
            )
            .with_attr("tool_id", config.id.clone())
            .with_attr("parameter", name));
        }
    }

    let method = effective_method(config, &params)?;
    let url = build_url(config, &params, ctx)?;
    let timeout_ms = effective_timeout(config, &params);
    let fail_on_error = effective_fail_on_error(config, &params);

    debug!(tool_id = %config.id, method = %method, url = %url, "dispatching tool request");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| {
            ToolError::permanent("HTTP_CLIENT_ERROR", format!("Failed to build HTTP client: {}", e))
        })?;

    let mut request = match method {
        HttpMethod::Get => client.get(&url),
        HttpMethod::Post => client.post(&url),
        HttpMethod::Put => client.put(&url),
        HttpMethod::Patch => client.patch(&url),
        HttpMethod::Delete => client.delete(&url),
        HttpMethod::Head => client.head(&url),
    };

    let query_pairs = build_query(config, &params);
    if !query_pairs.is_empty() {
        request = request.query(&query_pairs);
    }

    for (name, value) in build_headers(config, &params, ctx) {
        request = request.header(name, value);
    }

    if let Some(body) = build_body(config, &params) {
        request = request.json(&body);
    }

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            error::timeout_error(format!("Request to '{}' timed out after {}ms", config.id, timeout_ms))
        } else {
            error::network_error(format!("Request failed: {}", e))
        }
        .with_attr("tool_id", config.id.clone())
    })?;

    let status = response.status().as_u16();
    let headers: HashMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
        .collect();

    let text = response.text().await.map_err(|e| {
        error::network_error(format!("Failed to read response body: {}", e))
            .with_attr("tool_id", config.id.clone())
    })?;

    let success = (200..300).contains(&status);
    if !success && fail_on_error {
        let snippet: String = text.chars().take(ERROR_BODY_SNIPPET_LEN).collect();
        return Err(error::http_error(status, snippet).with_attr("tool_id", config.id.clone()));
    }

    // JSON responses are parsed; anything else passes through as text
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
    let body = apply_transform(&config.transform, &params, body);

    Ok(ToolOutput {
        status,
        headers,
        body,
        success,
    })
}

/// Degrade a tool error to the string form blocks surface to users.
pub fn transform_error(err: &ToolError) -> String {
    err.to_json_string()
}

fn merge_defaults(config: &ToolConfig, params: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = params.clone();
    for p in &config.params {
        if !merged.contains_key(&p.name)
            && let Some(default) = &p.default
        {
            merged.insert(p.name.clone(), default.clone());
        }
    }
    merged
}

fn effective_method(
    config: &ToolConfig,
    params: &Map<String, Value>,
) -> Result<HttpMethod, ToolError> {
    let Some(param_name) = &config.request.method_param else {
        return Ok(config.request.method);
    };
    match params.get(param_name) {
        None => Ok(config.request.method),
        Some(Value::String(s)) => HttpMethod::parse(s).ok_or_else(|| {
            ToolError::permanent("INVALID_METHOD", format!("Unsupported HTTP method '{}'", s))
        }),
        Some(other) => Err(ToolError::permanent(
            "INVALID_METHOD",
            format!("Method must be a string, got {}", json_type_name(other)),
        )),
    }
}

fn effective_timeout(config: &ToolConfig, params: &Map<String, Value>) -> u64 {
    if config.param("timeout").is_some()
        && let Some(ms) = params.get("timeout").and_then(Value::as_u64)
    {
        return ms;
    }
    config.request.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)
}

fn effective_fail_on_error(config: &ToolConfig, params: &Map<String, Value>) -> bool {
    if config.param("failOnError").is_some()
        && let Some(flag) = params.get("failOnError").and_then(Value::as_bool)
    {
        return flag;
    }
    config.request.fail_on_error.unwrap_or(true)
}

fn build_url(
    config: &ToolConfig,
    params: &Map<String, Value>,
    ctx: &InvokeContext,
) -> Result<String, ToolError> {
    let template = &config.request.url;

    // A template that is one bare placeholder takes the param verbatim,
    // so full URLs are not percent-encoded.
    let path = match single_placeholder(template) {
        Some(name) => match params.get(name) {
            Some(value) => value_as_string(value),
            None => {
                return Err(missing_param_error(config, name));
            }
        },
        None => substitute(template, params, true)
            .map_err(|name| missing_param_error(config, &name))?,
    };

    if config.request.internal {
        Ok(format!(
            "{}{}",
            ctx.base_url.trim_end_matches('/'),
            path
        ))
    } else {
        Ok(path)
    }
}

fn build_query(config: &ToolConfig, params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for (key, template) in &config.request.query {
        // Pairs whose placeholder does not resolve are dropped, which is
        // how optional query params work.
        if let Ok(value) = substitute(template, params, false) {
            pairs.push((key.clone(), value));
        }
    }

    if let Some(param_name) = &config.request.query_param
        && let Some(Value::Object(extra)) = params.get(param_name)
    {
        for (key, value) in extra {
            pairs.push((key.clone(), value_as_string(value)));
        }
    }

    pairs
}

fn build_headers(
    config: &ToolConfig,
    params: &Map<String, Value>,
    ctx: &InvokeContext,
) -> Vec<(String, String)> {
    let mut headers = Vec::new();

    for (name, template) in &config.request.headers {
        if let Ok(value) = substitute(template, params, false) {
            headers.push((name.clone(), value));
        }
    }

    if let Some(param_name) = &config.request.headers_param
        && let Some(Value::Object(extra)) = params.get(param_name)
    {
        for (name, value) in extra {
            headers.push((name.clone(), value_as_string(value)));
        }
    }

    if config.request.internal
        && let Some(key) = &ctx.api_key
    {
        headers.push(("Authorization".to_string(), format!("Bearer {}", key)));
    }

    headers
}

fn build_body(config: &ToolConfig, params: &Map<String, Value>) -> Option<Value> {
    if let Some(param_name) = &config.request.body_param
        && let Some(value) = params.get(param_name)
    {
        return Some(value.clone());
    }
    config
        .request
        .body
        .as_ref()
        .map(|template| substitute_body(template, params))
}

/// Recursively substitute placeholders in a JSON body template. A string
/// that is exactly one placeholder is replaced by the raw param value, so
/// objects and arrays survive intact.
fn substitute_body(template: &Value, params: &Map<String, Value>) -> Value {
    match template {
        Value::String(s) => {
            if let Some(name) = single_placeholder(s)
                && let Some(value) = params.get(name)
            {
                return value.clone();
            }
            match substitute(s, params, false) {
                Ok(substituted) => Value::String(substituted),
                Err(_) => Value::Null,
            }
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_body(v, params)))
                .collect(),
        ),
        Value::Array(arr) => {
            Value::Array(arr.iter().map(|v| substitute_body(v, params)).collect())
        }
        other => other.clone(),
    }
}

fn apply_transform(
    transform: &ResponseTransform,
    params: &Map<String, Value>,
    body: Value,
) -> Value {
    match transform {
        ResponseTransform::Identity => body,
        ResponseTransform::Unwrap { field } => match body.get(field) {
            Some(inner) => inner.clone(),
            None => body,
        },
        ResponseTransform::WorkerResult => {
            let success = body
                .get("success")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let duration_ms = body
                .pointer("/metadata/durationMs")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let child_id = body
                .pointer("/metadata/workerId")
                .cloned()
                .or_else(|| params.get("workerId").cloned())
                .unwrap_or(Value::Null);
            let child_name = body
                .pointer("/metadata/workerName")
                .cloned()
                .unwrap_or(Value::Null);

            let mut result = json!({
                "success": success,
                "durationMs": duration_ms,
                "childWorkerId": child_id,
                "childWorkerName": child_name,
                "output": body.get("output").cloned().unwrap_or(Value::Null),
            });
            if let Some(error) = body.get("error")
                && !error.is_null()
                && let Some(obj) = result.as_object_mut()
            {
                obj.insert("error".to_string(), error.clone());
            }
            result
        }
    }
}

/// Returns the placeholder name when `s` is exactly `{name}`
fn single_placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() || inner.contains('{') || inner.contains('}') {
        return None;
    }
    Some(inner)
}

/// Substitute `{name}` placeholders. Returns the name of the first missing
/// param as the error.
fn substitute(
    template: &str,
    params: &Map<String, Value>,
    encode: bool,
) -> Result<String, String> {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        result.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            result.push_str(&rest[open..]);
            return Ok(result);
        };
        let name = &after[..close];
        match params.get(name) {
            Some(value) => {
                let s = value_as_string(value);
                if encode {
                    result.push_str(&urlencoding::encode(&s));
                } else {
                    result.push_str(&s);
                }
            }
            None => return Err(name.to_string()),
        }
        rest = &after[close + 1..];
    }
    result.push_str(rest);
    Ok(result)
}

fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn missing_param_error(config: &ToolConfig, name: &str) -> ToolError {
    ToolError::permanent(
        "MISSING_PARAMETER",
        format!("Tool '{}' requires parameter '{}'", config.id, name),
    )
    .with_attr("tool_id", config.id.clone())
    .with_attr("parameter", name)
}
