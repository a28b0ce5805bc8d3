// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Built-in tool descriptors.
//!
//! These are the tools every registry starts with: the generic outbound
//! `http_request`, the memory tools targeting the internal memory API, and
//! `worker_executor`, which runs another worker through the internal
//! execute endpoint.

use crate::config::{
    HttpMethod, RequestConfig, ResponseTransform, ToolConfig, ToolParam,
};
use nusoma_dsl::ValueType;
use serde_json::json;

fn param(
    name: &str,
    param_type: ValueType,
    required: bool,
    description: &str,
) -> ToolParam {
    ToolParam {
        name: name.to_string(),
        param_type,
        required,
        description: description.to_string(),
        default: None,
    }
}

fn http_request() -> ToolConfig {
    ToolConfig {
        id: "http_request".to_string(),
        name: "HTTP Request".to_string(),
        description: "Make an HTTP request to any URL".to_string(),
        params: vec![
            param("url", ValueType::String, true, "Request URL"),
            param(
                "method",
                ValueType::String,
                false,
                "HTTP method (default GET)",
            ),
            param("headers", ValueType::Json, false, "Extra request headers"),
            param("query", ValueType::Json, false, "Extra query parameters"),
            param("body", ValueType::Json, false, "Request body"),
            param(
                "timeout",
                ValueType::Integer,
                false,
                "Request timeout in milliseconds (default 30000)",
            ),
            param(
                "failOnError",
                ValueType::Boolean,
                false,
                "Treat non-2xx responses as errors (default true)",
            ),
        ],
        request: RequestConfig {
            method_param: Some("method".to_string()),
            headers_param: Some("headers".to_string()),
            query_param: Some("query".to_string()),
            body_param: Some("body".to_string()),
            ..RequestConfig::new(HttpMethod::Get, "{url}")
        },
        transform: ResponseTransform::Identity,
    }
}

fn memory_add() -> ToolConfig {
    ToolConfig {
        id: "memory_add".to_string(),
        name: "Memory Add".to_string(),
        description: "Store a value under a key in worker memory".to_string(),
        params: vec![
            param("key", ValueType::String, true, "Memory key"),
            param("value", ValueType::Json, true, "Value to store"),
        ],
        request: RequestConfig {
            body: Some(json!({"key": "{key}", "value": "{value}"})),
            internal: true,
            ..RequestConfig::new(HttpMethod::Post, "/api/memory")
        },
        transform: ResponseTransform::Identity,
    }
}

fn memory_get() -> ToolConfig {
    ToolConfig {
        id: "memory_get".to_string(),
        name: "Memory Get".to_string(),
        description: "Read a value from worker memory".to_string(),
        params: vec![param("key", ValueType::String, true, "Memory key")],
        request: RequestConfig {
            internal: true,
            ..RequestConfig::new(HttpMethod::Get, "/api/memory/{key}")
        },
        transform: ResponseTransform::Unwrap {
            field: "value".to_string(),
        },
    }
}

fn memory_delete() -> ToolConfig {
    ToolConfig {
        id: "memory_delete".to_string(),
        name: "Memory Delete".to_string(),
        description: "Delete a key from worker memory".to_string(),
        params: vec![param("key", ValueType::String, true, "Memory key")],
        request: RequestConfig {
            internal: true,
            ..RequestConfig::new(HttpMethod::Delete, "/api/memory/{key}")
        },
        transform: ResponseTransform::Identity,
    }
}

fn worker_executor() -> ToolConfig {
    ToolConfig {
        id: "worker_executor".to_string(),
        name: "Worker Executor".to_string(),
        description: "Run another worker and wait for its result".to_string(),
        params: vec![
            param("workerId", ValueType::String, true, "Child worker id"),
            param("input", ValueType::Json, false, "Input for the child worker"),
        ],
        request: RequestConfig {
            body: Some(json!({"input": "{input}"})),
            internal: true,
            ..RequestConfig::new(HttpMethod::Post, "/api/workers/{workerId}/execute")
        },
        transform: ResponseTransform::WorkerResult,
    }
}

/// All built-in tool descriptors
pub fn builtin_tools() -> Vec<ToolConfig> {
    vec![
        http_request(),
        memory_add(),
        memory_get(),
        memory_delete(),
        worker_executor(),
    ]
}
