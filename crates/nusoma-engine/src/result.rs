// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Execution result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of one worker execution. Always produced, success or not;
/// `Executor::execute` never fails outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,

    /// Worker output, keyed by `response`
    pub output: Value,

    /// Error description when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Per-block trace in execution order
    pub logs: Vec<BlockLog>,

    pub metadata: ExecutionMetadata,
}

/// One entry in the execution trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockLog {
    pub block_id: String,

    /// Block type tag, e.g. `Tool` or `Condition`
    pub block_type: String,

    pub success: bool,

    pub duration_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Timing and identity metadata for one execution. `worker_id` and
/// `worker_name` also feed the worker-call tool's result transform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetadata {
    pub duration_ms: u64,

    pub started_at: DateTime<Utc>,

    pub ended_at: DateTime<Utc>,

    pub worker_id: String,

    pub worker_name: String,
}
