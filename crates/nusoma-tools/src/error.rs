// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Structured errors for tool invocation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Error category for retry/routing decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Temporary failure (network, timeout, rate limit) - retry may succeed
    Transient,
    /// Non-recoverable failure (404, validation, business rules)
    Permanent,
}

/// Error severity for logging/alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Structured error for tool invocations.
///
/// Every failure path in the tool layer degrades to one of these; callers
/// that need a plain string use [`ToolError::to_json_string`], which keeps
/// the full structure available to anything that parses it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolError {
    /// Machine-readable error code (e.g., "HTTP_TIMEOUT", "MISSING_PARAMETER")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Error category for retry decisions
    pub category: ErrorCategory,

    /// Error severity for logging/alerting
    pub severity: ErrorSeverity,

    /// Optional retry delay hint in milliseconds (for rate limits, etc.)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,

    /// Additional context attributes
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

impl ToolError {
    /// Create a transient error (retry likely to succeed).
    ///
    /// Use for: network failures, timeouts, rate limits, temporary unavailability.
    pub fn transient(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            category: ErrorCategory::Transient,
            severity: ErrorSeverity::Warning,
            retry_after_ms: None,
            attributes: HashMap::new(),
        }
    }

    /// Create a permanent error (don't auto-retry, human fix may help).
    ///
    /// Use for: 404 not found, validation errors, authentication failures.
    pub fn permanent(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            category: ErrorCategory::Permanent,
            severity: ErrorSeverity::Error,
            retry_after_ms: None,
            attributes: HashMap::new(),
        }
    }

    /// Set the error severity.
    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Set a retry delay hint (for rate limits).
    pub fn with_retry_after(mut self, ms: u64) -> Self {
        self.retry_after_ms = Some(ms);
        self
    }

    /// Add a context attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Should the executor retry this invocation?
    pub fn should_retry(&self) -> bool {
        self.category == ErrorCategory::Transient
    }

    /// Serialize to a JSON string, falling back to `[code] message` when
    /// serialization fails.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("[{}] {}", self.code, self.message))
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ToolError {}

impl From<ToolError> for String {
    fn from(err: ToolError) -> Self {
        err.to_json_string()
    }
}

/// Classify an HTTP status code into an error category.
///
/// Classification logic:
/// - 408 Request Timeout → Transient (retry)
/// - 429 Too Many Requests → Transient (retry with backoff)
/// - 5xx Server Errors → Transient (retry)
/// - 4xx Client Errors → Permanent (don't auto-retry)
pub fn classify_http_status(status: u16) -> ErrorCategory {
    match status {
        408 => ErrorCategory::Transient,
        429 => ErrorCategory::Transient,
        500..=599 => ErrorCategory::Transient,
        400..=499 => ErrorCategory::Permanent,
        _ => ErrorCategory::Permanent,
    }
}

/// Create a ToolError from an HTTP response status.
pub fn http_error(status: u16, body: impl Into<String>) -> ToolError {
    let category = classify_http_status(status);
    let body_text = body.into();

    let code = match status {
        400 => "HTTP_BAD_REQUEST",
        401 => "HTTP_UNAUTHORIZED",
        403 => "HTTP_FORBIDDEN",
        404 => "HTTP_NOT_FOUND",
        408 => "HTTP_TIMEOUT",
        429 => "HTTP_RATE_LIMITED",
        500 => "HTTP_INTERNAL_ERROR",
        502 => "HTTP_BAD_GATEWAY",
        503 => "HTTP_SERVICE_UNAVAILABLE",
        504 => "HTTP_GATEWAY_TIMEOUT",
        _ => "HTTP_ERROR",
    };

    let message = if body_text.is_empty() {
        format!("HTTP request failed with status {}", status)
    } else {
        format!("HTTP {} error: {}", status, body_text)
    };

    ToolError {
        code: code.to_string(),
        message,
        category,
        severity: if category == ErrorCategory::Transient {
            ErrorSeverity::Warning
        } else {
            ErrorSeverity::Error
        },
        retry_after_ms: None,
        attributes: {
            let mut attrs = HashMap::new();
            attrs.insert("status_code".to_string(), status.to_string());
            attrs
        },
    }
}

/// Create a ToolError from a network/connection failure.
pub fn network_error(message: impl Into<String>) -> ToolError {
    ToolError::transient("NETWORK_ERROR", message)
}

/// Create a ToolError from a timeout.
pub fn timeout_error(message: impl Into<String>) -> ToolError {
    ToolError::transient("TIMEOUT", message)
}
