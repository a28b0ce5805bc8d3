// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Engine error types

use std::fmt;

/// Errors raised while executing a worker. The executor boundary converts
/// these into the `error` field of an execution result; they never escape
/// `Executor::execute`.
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Worker id not present in the store
    WorkerNotFound { worker_id: String },

    /// Pre-execution validation reported errors
    ValidationFailed {
        worker_id: String,
        error_count: usize,
        first_error: String,
    },

    /// A block failed during execution
    BlockFailed { block_id: String, message: String },

    /// A tool invocation failed after exhausting retries
    ToolFailed {
        block_id: String,
        tool_id: String,
        message: String,
    },

    /// A worker invoked itself, directly or transitively
    WorkerCycle { chain: Vec<String> },

    /// Worker call stack exceeded the configured depth
    RecursionLimit { worker_id: String, max_depth: usize },

    /// A block exceeded its timeout
    Timeout { block_id: String, timeout_ms: u64 },

    /// A reference or mapping could not be resolved
    MappingError { block_id: String, message: String },

    /// Graph traversal exceeded the per-run block execution budget
    ExecutionBudgetExceeded { limit: u64 },
}

impl EngineError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::WorkerNotFound { .. } => "WORKER_NOT_FOUND",
            EngineError::ValidationFailed { .. } => "VALIDATION_FAILED",
            EngineError::BlockFailed { .. } => "BLOCK_FAILED",
            EngineError::ToolFailed { .. } => "TOOL_FAILED",
            EngineError::WorkerCycle { .. } => "WORKER_CYCLE",
            EngineError::RecursionLimit { .. } => "RECURSION_LIMIT",
            EngineError::Timeout { .. } => "TIMEOUT",
            EngineError::MappingError { .. } => "MAPPING_ERROR",
            EngineError::ExecutionBudgetExceeded { .. } => "EXECUTION_BUDGET_EXCEEDED",
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::WorkerNotFound { worker_id } => {
                write!(f, "Worker '{}' not found", worker_id)
            }
            EngineError::ValidationFailed {
                worker_id,
                error_count,
                first_error,
            } => {
                write!(
                    f,
                    "Worker '{}' failed validation with {} error(s): {}",
                    worker_id, error_count, first_error
                )
            }
            EngineError::BlockFailed { block_id, message } => {
                write!(f, "Block '{}' failed: {}", block_id, message)
            }
            EngineError::ToolFailed {
                block_id,
                tool_id,
                message,
            } => {
                write!(
                    f,
                    "Block '{}': tool '{}' failed: {}",
                    block_id, tool_id, message
                )
            }
            EngineError::WorkerCycle { chain } => {
                write!(f, "Worker cycle detected: {}", chain.join(" -> "))
            }
            EngineError::RecursionLimit {
                worker_id,
                max_depth,
            } => {
                write!(
                    f,
                    "Worker '{}' exceeded the maximum call depth of {}",
                    worker_id, max_depth
                )
            }
            EngineError::Timeout {
                block_id,
                timeout_ms,
            } => {
                write!(f, "Block '{}' timed out after {}ms", block_id, timeout_ms)
            }
            EngineError::MappingError { block_id, message } => {
                write!(f, "Block '{}': mapping error: {}", block_id, message)
            }
            EngineError::ExecutionBudgetExceeded { limit } => {
                write!(
                    f,
                    "Execution exceeded the budget of {} block runs (possible edge cycle)",
                    limit
                )
            }
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let cases: Vec<(EngineError, &str)> = vec![
            (
                EngineError::WorkerNotFound {
                    worker_id: "w".to_string(),
                },
                "WORKER_NOT_FOUND",
            ),
            (
                EngineError::WorkerCycle {
                    chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
                },
                "WORKER_CYCLE",
            ),
            (
                EngineError::Timeout {
                    block_id: "b".to_string(),
                    timeout_ms: 100,
                },
                "TIMEOUT",
            ),
            (
                EngineError::ExecutionBudgetExceeded { limit: 10 },
                "EXECUTION_BUDGET_EXCEEDED",
            ),
        ];

        for (err, code) in cases {
            assert_eq!(err.error_code(), code);
        }
    }

    #[test]
    fn test_cycle_display_shows_chain() {
        let err = EngineError::WorkerCycle {
            chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        };
        assert_eq!(err.to_string(), "Worker cycle detected: a -> b -> a");
    }
}
