// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker executor.
//!
//! [`Executor::execute`] runs a stored worker against an input and always
//! produces an [`ExecutionResult`]; failures surface in the result's `error`
//! field rather than as an `Err`. Graph traversal follows edges from the
//! entry point, Condition blocks pick the edge whose label matches the
//! evaluated branch, and the first Response block reached shapes the output.

use crate::conditions;
use crate::context::RunContext;
use crate::error::EngineError;
use crate::result::{BlockLog, ExecutionMetadata, ExecutionResult};
use crate::store::WorkerStore;
use crate::validation::validate_worker;
use chrono::Utc;
use futures::future::{BoxFuture, join_all, try_join_all};
use nusoma_dsl::{Block, ExecutionGraph, LoopConfig, ParallelConfig};
use nusoma_tools::{InvokeContext, ToolRegistry, invoke};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Tuning knobs for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Maximum worker call depth, counting the root worker
    pub max_worker_depth: usize,

    /// Per-attempt tool timeout when the block doesn't set one
    pub default_timeout_ms: u64,

    /// Iteration cap for Loop blocks that don't set `maxIterations`
    pub max_loop_iterations: u64,

    /// Total block runs allowed per execution. Guards against edge cycles
    /// the reachability check can't see.
    pub max_block_runs: u64,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            max_worker_depth: 10,
            default_timeout_ms: 30_000,
            max_loop_iterations: 10_000,
            max_block_runs: 10_000,
        }
    }
}

/// Executes workers from a store against a tool registry.
pub struct Executor {
    store: Arc<dyn WorkerStore>,
    tools: Arc<ToolRegistry>,
    tool_ctx: InvokeContext,
    options: ExecutorOptions,
}

/// Per-execution shared state.
struct RunState {
    remaining_block_runs: AtomicU64,
}

impl Executor {
    pub fn new(store: Arc<dyn WorkerStore>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            store,
            tools,
            tool_ctx: InvokeContext::default(),
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_tool_context(mut self, tool_ctx: InvokeContext) -> Self {
        self.tool_ctx = tool_ctx;
        self
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// Execute a stored worker. Never fails: validation errors, block
    /// failures, and cycles all land in the result's `error` field.
    pub async fn execute(&self, worker_id: &str, input: Value) -> ExecutionResult {
        let started_at = Utc::now();
        let timer = Instant::now();

        let worker_name = self
            .store
            .get(worker_id)
            .await
            .map(|w| w.name)
            .unwrap_or_else(|| worker_id.to_string());

        let state = RunState {
            remaining_block_runs: AtomicU64::new(self.options.max_block_runs),
        };
        let mut logs = Vec::new();

        let outcome = self
            .run_worker(worker_id, input, &[], &mut logs, &state)
            .await;

        let duration_ms = timer.elapsed().as_millis() as u64;
        let metadata = ExecutionMetadata {
            duration_ms,
            started_at,
            ended_at: Utc::now(),
            worker_id: worker_id.to_string(),
            worker_name,
        };

        match outcome {
            Ok(output) => {
                info!(worker_id, duration_ms, "worker execution succeeded");
                ExecutionResult {
                    success: true,
                    output: json!({ "response": output }),
                    error: None,
                    logs,
                    metadata,
                }
            }
            Err(err) => {
                warn!(worker_id, duration_ms, error = %err, "worker execution failed");
                ExecutionResult {
                    success: false,
                    output: json!({ "response": null }),
                    error: Some(err.to_string()),
                    logs,
                    metadata,
                }
            }
        }
    }

    /// Run one worker as part of an execution. `stack` holds the ids of
    /// callers; the recursion guard lives here.
    fn run_worker<'a>(
        &'a self,
        worker_id: &'a str,
        input: Value,
        stack: &'a [String],
        logs: &'a mut Vec<BlockLog>,
        state: &'a RunState,
    ) -> BoxFuture<'a, Result<Value, EngineError>> {
        Box::pin(async move {
            if stack.iter().any(|id| id == worker_id) {
                let mut chain: Vec<String> = stack.to_vec();
                chain.push(worker_id.to_string());
                return Err(EngineError::WorkerCycle { chain });
            }
            if stack.len() >= self.options.max_worker_depth {
                return Err(EngineError::RecursionLimit {
                    worker_id: worker_id.to_string(),
                    max_depth: self.options.max_worker_depth,
                });
            }

            let worker = self
                .store
                .get(worker_id)
                .await
                .ok_or_else(|| EngineError::WorkerNotFound {
                    worker_id: worker_id.to_string(),
                })?;

            let validation = validate_worker(&worker, &self.tools, self.store.as_ref()).await;
            if validation.has_errors() {
                return Err(EngineError::ValidationFailed {
                    worker_id: worker_id.to_string(),
                    error_count: validation.errors.len(),
                    first_error: validation.errors[0].to_string(),
                });
            }

            let mut chain: Vec<String> = stack.to_vec();
            chain.push(worker_id.to_string());

            let mut ctx = RunContext::new(input, worker.graph.variables.clone());
            self.run_graph(&worker.graph, &mut ctx, &chain, logs, state)
                .await
        })
    }

    /// Traverse a graph from its entry point. Returns the value of the first
    /// Response block reached, or the last block output when traversal ends
    /// without one.
    fn run_graph<'a>(
        &'a self,
        graph: &'a ExecutionGraph,
        ctx: &'a mut RunContext,
        stack: &'a [String],
        logs: &'a mut Vec<BlockLog>,
        state: &'a RunState,
    ) -> BoxFuture<'a, Result<Value, EngineError>> {
        Box::pin(async move {
            let mut current = graph.entry_point.clone();
            let mut last_output = Value::Null;

            loop {
                // Checked decrement: once the budget hits zero it stays
                // there, so concurrent branches cannot race past it.
                let charged = state
                    .remaining_block_runs
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
                if charged.is_err() {
                    return Err(EngineError::ExecutionBudgetExceeded {
                        limit: self.options.max_block_runs,
                    });
                }

                let block = graph.blocks.get(&current).ok_or_else(|| {
                    EngineError::BlockFailed {
                        block_id: current.clone(),
                        message: "block not found in graph".to_string(),
                    }
                })?;

                let block_timer = Instant::now();
                let outcome = self
                    .run_block(block, ctx, &last_output, stack, logs, state)
                    .await;
                let duration_ms = block_timer.elapsed().as_millis() as u64;

                logs.push(BlockLog {
                    block_id: current.clone(),
                    block_type: block.block_type().to_string(),
                    success: outcome.is_ok(),
                    duration_ms,
                    error: outcome.as_ref().err().map(|e| e.to_string()),
                });

                let output = outcome?;
                debug!(block_id = %current, block_type = block.block_type(), duration_ms, "block completed");

                // A Response block terminates the graph
                if matches!(block, Block::Response(_)) {
                    return Ok(output);
                }

                ctx.set_block_output(&current, output.clone());
                last_output = output;

                let next = match block {
                    Block::Condition(_) => {
                        let branch = last_output
                            .get("result")
                            .and_then(Value::as_bool)
                            .unwrap_or(false);
                        let label = if branch { "true" } else { "false" };
                        graph
                            .outgoing_edges(&current)
                            .into_iter()
                            .find(|e| e.label.as_deref() == Some(label))
                            .map(|e| e.to_block.clone())
                    }
                    _ => graph
                        .outgoing_edges(&current)
                        .first()
                        .map(|e| e.to_block.clone()),
                };

                match next {
                    Some(next_id) => current = next_id,
                    None => return Ok(last_output),
                }
            }
        })
    }

    fn run_block<'a>(
        &'a self,
        block: &'a Block,
        ctx: &'a mut RunContext,
        last_output: &'a Value,
        stack: &'a [String],
        logs: &'a mut Vec<BlockLog>,
        state: &'a RunState,
    ) -> BoxFuture<'a, Result<Value, EngineError>> {
        Box::pin(async move {
            match block {
                Block::Start(_) => Ok(ctx.input.clone()),

                Block::Function(function_block) => {
                    let inputs =
                        ctx.resolve_mapping(&function_block.id, function_block.input_mapping.as_ref())?;
                    let env = minijinja::Environment::new();
                    let rendered = env
                        .render_str(&function_block.template, Value::Object(inputs))
                        .map_err(|e| EngineError::BlockFailed {
                            block_id: function_block.id.clone(),
                            message: format!("template error: {}", e),
                        })?;
                    // Rendered output is JSON when possible, string otherwise
                    Ok(serde_json::from_str(&rendered)
                        .unwrap_or(Value::String(rendered)))
                }

                Block::Condition(condition_block) => {
                    let branch =
                        conditions::evaluate(&condition_block.id, &condition_block.condition, ctx)?;
                    Ok(json!({ "result": branch }))
                }

                Block::Tool(tool_block) => self.run_tool_block(tool_block, ctx).await,

                Block::Loop(loop_block) => {
                    let items =
                        self.iteration_items(&loop_block.id, &loop_block.config, ctx)?;
                    let mut results = Vec::with_capacity(items.len());
                    for (index, item) in items.into_iter().enumerate() {
                        let mut scoped = ctx.iteration_scope("loop", index, item);
                        let result = self
                            .run_graph(&loop_block.subgraph, &mut scoped, stack, logs, state)
                            .await?;
                        results.push(result);
                    }
                    Ok(Value::Array(results))
                }

                Block::Parallel(parallel_block) => {
                    self.run_parallel_block(parallel_block, ctx, stack, logs, state)
                        .await
                }

                Block::Worker(worker_block) => {
                    let inputs =
                        ctx.resolve_mapping(&worker_block.id, worker_block.input_mapping.as_ref())?;
                    self.run_worker(
                        &worker_block.worker_id,
                        Value::Object(inputs),
                        stack,
                        logs,
                        state,
                    )
                    .await
                }

                Block::Response(response_block) => {
                    match &response_block.input_mapping {
                        Some(mapping) => Ok(Value::Object(
                            ctx.resolve_mapping(&response_block.id, Some(mapping))?,
                        )),
                        // Bare Response passes the previous block's output through
                        None => Ok(last_output.clone()),
                    }
                }
            }
        })
    }

    async fn run_tool_block(
        &self,
        tool_block: &nusoma_dsl::ToolBlock,
        ctx: &RunContext,
    ) -> Result<Value, EngineError> {
        let params = ctx.resolve_mapping(&tool_block.id, tool_block.input_mapping.as_ref())?;

        let config = self.tools.get(&tool_block.tool_id).ok_or_else(|| {
            EngineError::ToolFailed {
                block_id: tool_block.id.clone(),
                tool_id: tool_block.tool_id.clone(),
                message: "tool not registered".to_string(),
            }
        })?;

        let block_config = tool_block.config.clone().unwrap_or_default();
        let max_retries = block_config.max_retries.unwrap_or(0);
        let retry_delay = block_config.retry_delay.unwrap_or(1_000);
        let timeout_ms = block_config
            .timeout
            .unwrap_or(self.options.default_timeout_ms);
        let timeout = std::time::Duration::from_millis(timeout_ms);

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let error = match tokio::time::timeout(
                timeout,
                invoke(config, &params, &self.tool_ctx),
            )
            .await
            {
                Ok(Ok(output)) => return Ok(output.body),
                Ok(Err(tool_error)) => {
                    if !tool_error.should_retry() || attempt > max_retries {
                        return Err(EngineError::ToolFailed {
                            block_id: tool_block.id.clone(),
                            tool_id: tool_block.tool_id.clone(),
                            message: tool_error.to_string(),
                        });
                    }
                    tool_error.to_string()
                }
                Err(_) => {
                    if attempt > max_retries {
                        return Err(EngineError::Timeout {
                            block_id: tool_block.id.clone(),
                            timeout_ms,
                        });
                    }
                    format!("attempt timed out after {}ms", timeout_ms)
                }
            };

            debug!(
                block_id = %tool_block.id,
                tool_id = %tool_block.tool_id,
                attempt,
                error = %error,
                "retrying tool invocation"
            );
            tokio::time::sleep(std::time::Duration::from_millis(retry_delay)).await;
        }
    }

    async fn run_parallel_block(
        &self,
        parallel_block: &nusoma_dsl::ParallelBlock,
        ctx: &RunContext,
        stack: &[String],
        logs: &mut Vec<BlockLog>,
        state: &RunState,
    ) -> Result<Value, EngineError> {
        let items =
            self.parallel_items(&parallel_block.id, &parallel_block.config, ctx)?;
        let fail_fast = parallel_block.config.fail_fast.unwrap_or(true);

        // 0 or absent means unbounded
        let semaphore = match parallel_block.config.max_concurrency {
            Some(n) if n > 0 => Some(Arc::new(Semaphore::new(n))),
            _ => None,
        };

        let branches = items.into_iter().enumerate().map(|(index, item)| {
            let scoped = ctx.iteration_scope("parallel", index, item);
            let semaphore = semaphore.clone();
            let subgraph = &parallel_block.subgraph;
            let block_id = &parallel_block.id;
            async move {
                let _permit = match &semaphore {
                    Some(s) => Some(s.acquire().await.map_err(|_| {
                        EngineError::BlockFailed {
                            block_id: block_id.clone(),
                            message: "concurrency semaphore closed".to_string(),
                        }
                    })?),
                    None => None,
                };
                let mut branch_ctx = scoped;
                let mut branch_logs = Vec::new();
                let result = self
                    .run_graph(subgraph, &mut branch_ctx, stack, &mut branch_logs, state)
                    .await?;
                Ok::<(Value, Vec<BlockLog>), EngineError>((result, branch_logs))
            }
        });

        let outcomes = if fail_fast {
            try_join_all(branches).await?
        } else {
            // Let every branch finish, then surface the first failure
            let results = join_all(branches).await;
            let mut outcomes = Vec::with_capacity(results.len());
            let mut first_error = None;
            for result in results {
                match result {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(err) if first_error.is_none() => first_error = Some(err),
                    Err(_) => {}
                }
            }
            if let Some(err) = first_error {
                return Err(err);
            }
            outcomes
        };

        // Results stay in input order; branch traces merge in order too
        let mut results = Vec::with_capacity(outcomes.len());
        for (result, branch_logs) in outcomes {
            results.push(result);
            logs.extend(branch_logs);
        }
        Ok(Value::Array(results))
    }

    /// Items for a Loop block, capped by `maxIterations` and the engine's
    /// own iteration limit.
    fn iteration_items(
        &self,
        block_id: &str,
        config: &LoopConfig,
        ctx: &RunContext,
    ) -> Result<Vec<Value>, EngineError> {
        let mut items = if let Some(collection) = &config.collection {
            let resolved = ctx.resolve(block_id, collection)?;
            match resolved {
                Value::Array(items) => items,
                other => {
                    return Err(EngineError::MappingError {
                        block_id: block_id.to_string(),
                        message: format!(
                            "loop collection must be an array, got {}",
                            json_type_name(&other)
                        ),
                    });
                }
            }
        } else {
            let count = config.iterations.unwrap_or(0);
            (0..count).map(|i| json!(i)).collect()
        };

        let cap = config
            .max_iterations
            .unwrap_or(self.options.max_loop_iterations)
            .min(self.options.max_loop_iterations) as usize;
        items.truncate(cap);
        Ok(items)
    }

    /// Items for a Parallel block: the collection's elements, or branch
    /// indices when only `count` is given.
    fn parallel_items(
        &self,
        block_id: &str,
        config: &ParallelConfig,
        ctx: &RunContext,
    ) -> Result<Vec<Value>, EngineError> {
        if let Some(collection) = &config.collection {
            let resolved = ctx.resolve(block_id, collection)?;
            match resolved {
                Value::Array(items) => Ok(items),
                other => Err(EngineError::MappingError {
                    block_id: block_id.to_string(),
                    message: format!(
                        "parallel collection must be an array, got {}",
                        json_type_name(&other)
                    ),
                }),
            }
        } else {
            let count = config.count.unwrap_or(0);
            Ok((0..count).map(|i| json!(i)).collect())
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryWorkerStore;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn executor_with(workers: Vec<Value>) -> Executor {
        let store = InMemoryWorkerStore::new();
        for worker in workers {
            store
                .put(serde_json::from_value(worker).unwrap())
                .await;
        }
        Executor::new(Arc::new(store), Arc::new(ToolRegistry::new()))
    }

    /// start -> fn -> response, echoing the input value through a template
    fn echo_worker(id: &str) -> Value {
        json!({
            "id": id,
            "name": format!("Echo {}", id),
            "graph": {
                "blocks": {
                    "start": { "blockType": "Start", "id": "start" },
                    "fn": {
                        "blockType": "Function",
                        "id": "fn",
                        "template": "{\"echoed\": {{ value }}}",
                        "inputMapping": {
                            "value": { "valueType": "reference", "value": "input.value" }
                        }
                    },
                    "response": {
                        "blockType": "Response",
                        "id": "response",
                        "inputMapping": {
                            "result": {
                                "valueType": "reference",
                                "value": "blocks.fn.output.echoed"
                            }
                        }
                    }
                },
                "entryPoint": "start",
                "edges": [
                    { "fromBlock": "start", "toBlock": "fn" },
                    { "fromBlock": "fn", "toBlock": "response" }
                ]
            }
        })
    }

    #[tokio::test]
    async fn test_execute_simple_worker() {
        let executor = executor_with(vec![echo_worker("echo")]).await;
        let result = executor.execute("echo", json!({"value": 7})).await;

        assert!(result.success, "error: {:?}", result.error);
        assert_eq!(result.output, json!({"response": {"result": 7}}));
        assert_eq!(result.metadata.worker_id, "echo");
        assert_eq!(result.metadata.worker_name, "Echo echo");
        let block_ids: Vec<&str> = result.logs.iter().map(|l| l.block_id.as_str()).collect();
        assert_eq!(block_ids, vec!["start", "fn", "response"]);
    }

    #[tokio::test]
    async fn test_execute_unknown_worker_fails_softly() {
        let executor = executor_with(vec![]).await;
        let result = executor.execute("ghost", json!({})).await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap_or("").contains("not found"));
        assert_eq!(result.output, json!({"response": null}));
        assert_eq!(result.metadata.worker_name, "ghost");
    }

    #[tokio::test]
    async fn test_execute_invalid_worker_reports_validation() {
        let executor = executor_with(vec![json!({
            "id": "broken",
            "name": "Broken",
            "graph": {
                "blocks": {
                    "start": { "blockType": "Start", "id": "start" }
                },
                "entryPoint": "missing"
            }
        })])
        .await;
        let result = executor.execute("broken", json!({})).await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap_or("").contains("validation"));
    }

    #[tokio::test]
    async fn test_condition_picks_labeled_edge() {
        let worker = json!({
            "id": "branching",
            "name": "Branching",
            "graph": {
                "blocks": {
                    "start": { "blockType": "Start", "id": "start" },
                    "check": {
                        "blockType": "Condition",
                        "id": "check",
                        "condition": {
                            "type": "operation",
                            "op": "GT",
                            "arguments": [
                                { "valueType": "reference", "value": "input.n" },
                                { "valueType": "immediate", "value": 10 }
                            ]
                        }
                    },
                    "big": {
                        "blockType": "Response",
                        "id": "big",
                        "inputMapping": { "size": { "valueType": "immediate", "value": "big" } }
                    },
                    "small": {
                        "blockType": "Response",
                        "id": "small",
                        "inputMapping": { "size": { "valueType": "immediate", "value": "small" } }
                    }
                },
                "entryPoint": "start",
                "edges": [
                    { "fromBlock": "start", "toBlock": "check" },
                    { "fromBlock": "check", "toBlock": "big", "label": "true" },
                    { "fromBlock": "check", "toBlock": "small", "label": "false" }
                ]
            }
        });
        let executor = executor_with(vec![worker]).await;

        let result = executor.execute("branching", json!({"n": 42})).await;
        assert!(result.success, "error: {:?}", result.error);
        assert_eq!(result.output, json!({"response": {"size": "big"}}));

        let result = executor.execute("branching", json!({"n": 3})).await;
        assert_eq!(result.output, json!({"response": {"size": "small"}}));
    }

    fn subgraph_double() -> Value {
        json!({
            "blocks": {
                "inner": {
                    "blockType": "Function",
                    "id": "inner",
                    "template": "{{ item * 2 }}",
                    "inputMapping": {
                        "item": { "valueType": "reference", "value": "loop.item" }
                    }
                }
            },
            "entryPoint": "inner"
        })
    }

    #[tokio::test]
    async fn test_loop_over_collection() {
        let worker = json!({
            "id": "looper",
            "name": "Looper",
            "graph": {
                "blocks": {
                    "start": { "blockType": "Start", "id": "start" },
                    "loop": {
                        "blockType": "Loop",
                        "id": "loop",
                        "config": {
                            "collection": { "valueType": "reference", "value": "input.items" }
                        },
                        "subgraph": subgraph_double()
                    },
                    "response": { "blockType": "Response", "id": "response" }
                },
                "entryPoint": "start",
                "edges": [
                    { "fromBlock": "start", "toBlock": "loop" },
                    { "fromBlock": "loop", "toBlock": "response" }
                ]
            }
        });
        let executor = executor_with(vec![worker]).await;
        let result = executor
            .execute("looper", json!({"items": [1, 2, 3]}))
            .await;

        assert!(result.success, "error: {:?}", result.error);
        assert_eq!(result.output, json!({"response": [2, 4, 6]}));
    }

    #[tokio::test]
    async fn test_loop_respects_max_iterations() {
        let worker = json!({
            "id": "capped",
            "name": "Capped",
            "graph": {
                "blocks": {
                    "start": { "blockType": "Start", "id": "start" },
                    "loop": {
                        "blockType": "Loop",
                        "id": "loop",
                        "config": { "iterations": 100, "maxIterations": 2 },
                        "subgraph": {
                            "blocks": {
                                "inner": {
                                    "blockType": "Function",
                                    "id": "inner",
                                    "template": "{{ i }}",
                                    "inputMapping": {
                                        "i": { "valueType": "reference", "value": "loop.index" }
                                    }
                                }
                            },
                            "entryPoint": "inner"
                        }
                    },
                    "response": { "blockType": "Response", "id": "response" }
                },
                "entryPoint": "start",
                "edges": [
                    { "fromBlock": "start", "toBlock": "loop" },
                    { "fromBlock": "loop", "toBlock": "response" }
                ]
            }
        });
        let executor = executor_with(vec![worker]).await;
        let result = executor.execute("capped", json!({})).await;

        assert!(result.success, "error: {:?}", result.error);
        assert_eq!(result.output, json!({"response": [0, 1]}));
    }

    #[tokio::test]
    async fn test_parallel_preserves_input_order() {
        let worker = json!({
            "id": "fanout",
            "name": "Fanout",
            "graph": {
                "blocks": {
                    "start": { "blockType": "Start", "id": "start" },
                    "par": {
                        "blockType": "Parallel",
                        "id": "par",
                        "config": {
                            "collection": { "valueType": "reference", "value": "input.items" },
                            "maxConcurrency": 2
                        },
                        "subgraph": {
                            "blocks": {
                                "inner": {
                                    "blockType": "Function",
                                    "id": "inner",
                                    "template": "{{ item * 10 }}",
                                    "inputMapping": {
                                        "item": { "valueType": "reference", "value": "parallel.item" }
                                    }
                                }
                            },
                            "entryPoint": "inner"
                        }
                    },
                    "response": { "blockType": "Response", "id": "response" }
                },
                "entryPoint": "start",
                "edges": [
                    { "fromBlock": "start", "toBlock": "par" },
                    { "fromBlock": "par", "toBlock": "response" }
                ]
            }
        });
        let executor = executor_with(vec![worker]).await;
        let result = executor
            .execute("fanout", json!({"items": [1, 2, 3, 4]}))
            .await;

        assert!(result.success, "error: {:?}", result.error);
        assert_eq!(result.output, json!({"response": [10, 20, 30, 40]}));
    }

    /// start -> tool (http_request against `url`) -> bare response
    fn http_worker(id: &str, url: &str, config: Value) -> Value {
        json!({
            "id": id,
            "name": format!("Http {}", id),
            "graph": {
                "blocks": {
                    "start": { "blockType": "Start", "id": "start" },
                    "fetch": {
                        "blockType": "Tool",
                        "id": "fetch",
                        "toolId": "http_request",
                        "inputMapping": {
                            "url": { "valueType": "immediate", "value": url }
                        },
                        "config": config
                    },
                    "response": { "blockType": "Response", "id": "response" }
                },
                "entryPoint": "start",
                "edges": [
                    { "fromBlock": "start", "toBlock": "fetch" },
                    { "fromBlock": "fetch", "toBlock": "response" }
                ]
            }
        })
    }

    #[tokio::test]
    async fn test_tool_block_retries_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let worker = http_worker(
            "fetcher",
            &server.uri(),
            json!({"maxRetries": 2, "retryDelay": 10}),
        );
        let executor = executor_with(vec![worker]).await;
        let result = executor.execute("fetcher", json!({})).await;

        assert!(result.success, "error: {:?}", result.error);
        assert_eq!(result.output, json!({"response": {"ok": true}}));
    }

    #[tokio::test]
    async fn test_tool_block_times_out_per_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(std::time::Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let worker = http_worker("slow", &server.uri(), json!({"timeout": 50}));
        let executor = executor_with(vec![worker]).await;
        let result = executor.execute("slow", json!({})).await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap_or("").contains("timed out"));
    }

    #[tokio::test]
    async fn test_exhausted_budget_stops_parallel_branches() {
        // With failFast off, sibling branches must not race the counter past
        // zero and keep running; the run has to come back with the budget
        // error instead of hanging.
        let worker = json!({
            "id": "greedy",
            "name": "Greedy",
            "graph": {
                "blocks": {
                    "start": { "blockType": "Start", "id": "start" },
                    "par": {
                        "blockType": "Parallel",
                        "id": "par",
                        "config": { "count": 8, "failFast": false },
                        "subgraph": {
                            "blocks": {
                                "inner": {
                                    "blockType": "Function",
                                    "id": "inner",
                                    "template": "{{ i }}",
                                    "inputMapping": {
                                        "i": { "valueType": "reference", "value": "parallel.index" }
                                    }
                                }
                            },
                            "entryPoint": "inner"
                        }
                    },
                    "response": { "blockType": "Response", "id": "response" }
                },
                "entryPoint": "start",
                "edges": [
                    { "fromBlock": "start", "toBlock": "par" },
                    { "fromBlock": "par", "toBlock": "response" }
                ]
            }
        });
        let executor = executor_with(vec![worker]).await.with_options(ExecutorOptions {
            max_block_runs: 4,
            ..Default::default()
        });
        let result = executor.execute("greedy", json!({})).await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap_or("").contains("budget"));
    }

    #[tokio::test]
    async fn test_worker_block_calls_child() {
        let parent = json!({
            "id": "parent",
            "name": "Parent",
            "graph": {
                "blocks": {
                    "start": { "blockType": "Start", "id": "start" },
                    "call": {
                        "blockType": "Worker",
                        "id": "call",
                        "workerId": "echo",
                        "inputMapping": {
                            "value": { "valueType": "reference", "value": "input.n" }
                        }
                    },
                    "response": {
                        "blockType": "Response",
                        "id": "response",
                        "inputMapping": {
                            "child": { "valueType": "reference", "value": "blocks.call.output.result" }
                        }
                    }
                },
                "entryPoint": "start",
                "edges": [
                    { "fromBlock": "start", "toBlock": "call" },
                    { "fromBlock": "call", "toBlock": "response" }
                ]
            }
        });
        let executor = executor_with(vec![parent, echo_worker("echo")]).await;
        let result = executor.execute("parent", json!({"n": 9})).await;

        assert!(result.success, "error: {:?}", result.error);
        assert_eq!(result.output, json!({"response": {"child": 9}}));
    }

    #[tokio::test]
    async fn test_self_calling_worker_is_rejected() {
        let worker = json!({
            "id": "ouroboros",
            "name": "Ouroboros",
            "graph": {
                "blocks": {
                    "start": { "blockType": "Start", "id": "start" },
                    "call": {
                        "blockType": "Worker",
                        "id": "call",
                        "workerId": "ouroboros"
                    },
                    "response": { "blockType": "Response", "id": "response" }
                },
                "entryPoint": "start",
                "edges": [
                    { "fromBlock": "start", "toBlock": "call" },
                    { "fromBlock": "call", "toBlock": "response" }
                ]
            }
        });
        let executor = executor_with(vec![worker]).await;
        let result = executor.execute("ouroboros", json!({})).await;

        assert!(!result.success);
        assert!(result.error.as_deref().unwrap_or("").contains("cycle"));
    }

    #[tokio::test]
    async fn test_bare_response_passes_through_last_output() {
        let worker = json!({
            "id": "tail",
            "name": "Tail",
            "graph": {
                "blocks": {
                    "start": { "blockType": "Start", "id": "start" },
                    "fn": {
                        "blockType": "Function",
                        "id": "fn",
                        "template": "{\"done\": true}"
                    },
                    "response": { "blockType": "Response", "id": "response" }
                },
                "entryPoint": "start",
                "edges": [
                    { "fromBlock": "start", "toBlock": "fn" },
                    { "fromBlock": "fn", "toBlock": "response" }
                ]
            }
        });
        let executor = executor_with(vec![worker]).await;
        let result = executor.execute("tail", json!({})).await;

        assert!(result.success, "error: {:?}", result.error);
        assert_eq!(result.output, json!({"response": {"done": true}}));
    }
}
