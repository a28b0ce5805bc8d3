// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Declarative tool descriptors.
//!
//! A [`ToolConfig`] fully describes one tool as an HTTP contract: typed
//! params, how to build the request (URL template, method, headers, body)
//! and how to normalize the response. Descriptors are stateless between
//! invocations; all per-call data arrives through params.

use nusoma_dsl::ValueType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use strum::VariantNames;

/// HTTP method of a tool request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, VariantNames)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            _ => None,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed parameter a tool accepts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolParam {
    pub name: String,

    #[serde(rename = "type")]
    pub param_type: ValueType,

    #[serde(default)]
    pub required: bool,

    pub description: String,

    /// Used when the caller omits the param
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// How to build the outgoing HTTP request from resolved params.
///
/// String fields support `{param}` placeholder substitution. The `*_param`
/// fields name a param whose value replaces or extends the corresponding
/// static part; this is what lets the generic `http_request` tool take its
/// method, headers and body from caller input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    pub method: HttpMethod,

    /// Param holding a method override (e.g. "method" on `http_request`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_param: Option<String>,

    /// URL template. For internal tools this is a path appended to the
    /// server base URL.
    pub url: String,

    /// Static headers; values may contain `{param}` placeholders
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// Param holding an object of extra headers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers_param: Option<String>,

    /// Static query params; values may contain `{param}` placeholders.
    /// A pair whose placeholder does not resolve is dropped.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub query: HashMap<String, String>,

    /// Param holding an object of extra query params
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_param: Option<String>,

    /// JSON body template. Strings that are exactly `{param}` are replaced
    /// with the raw param value; strings containing placeholders are
    /// substituted textually.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Param holding the whole request body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_param: Option<String>,

    /// Request timeout in milliseconds (default 30000)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Treat non-2xx responses as errors (default true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_error: Option<bool>,

    /// Internal tools target the nusoma API itself: the URL is resolved
    /// against the server base URL and the caller's key is forwarded.
    #[serde(default)]
    pub internal: bool,
}

impl RequestConfig {
    /// Bare config for the given method and URL template
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            method_param: None,
            url: url.into(),
            headers: HashMap::new(),
            headers_param: None,
            query: HashMap::new(),
            query_param: None,
            body: None,
            body_param: None,
            timeout_ms: None,
            fail_on_error: None,
            internal: false,
        }
    }
}

/// How to normalize the response body before it becomes block output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResponseTransform {
    /// Pass the parsed body through unchanged
    #[default]
    Identity,

    /// Extract a single field from an object body
    Unwrap { field: String },

    /// Reshape a worker execution result into
    /// `{success, durationMs, childWorkerId, childWorkerName, output, error?}`
    WorkerResult,
}

/// Complete declarative description of one tool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
    /// Stable tool id referenced by Tool blocks
    pub id: String,

    pub name: String,

    pub description: String,

    pub params: Vec<ToolParam>,

    pub request: RequestConfig,

    #[serde(default)]
    pub transform: ResponseTransform,
}

impl ToolConfig {
    /// Names of params marked required
    pub fn required_params(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Look up a param by name
    pub fn param(&self, name: &str) -> Option<&ToolParam> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Normalized result of a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    /// HTTP status of the underlying request
    pub status: u16,

    /// Response headers
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// Parsed (and transformed) response body
    pub body: Value,

    /// False when a non-2xx response was tolerated via `fail_on_error: false`
    pub success: bool,
}
