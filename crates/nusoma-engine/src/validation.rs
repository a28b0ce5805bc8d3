// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker validation for correctness before execution.
//!
//! This module validates workers before the executor runs them to ensure:
//! - Graph structure is valid (entry point exists, no unreachable blocks)
//! - References point to valid blocks and known roots
//! - Tool blocks use registered tools with their required params
//! - Configuration values are reasonable
//! - Worker-call blocks don't form cycles

use crate::store::WorkerStore;
use futures::future::BoxFuture;
use nusoma_dsl::{Block, ExecutionGraph, MappingValue, Worker, block_id_from_reference};
use nusoma_tools::ToolRegistry;
use std::collections::{HashMap, HashSet};

// ============================================================================
// Validation Result Types
// ============================================================================

/// Result of worker validation containing errors and warnings.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// Hard errors that prevent execution.
    pub errors: Vec<ValidationError>,
    /// Soft warnings that don't prevent execution but indicate potential issues.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are allowed).
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns true if there are any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns true if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Merge another validation result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

// ============================================================================
// Validation Errors
// ============================================================================

/// Errors that can occur during validation.
#[derive(Debug, Clone)]
#[allow(missing_docs)] // Fields are self-documenting from variant docs
pub enum ValidationError {
    // === Graph Structure Errors ===
    /// Entry point block does not exist in the graph.
    EntryPointNotFound {
        entry_point: String,
        available_blocks: Vec<String>,
    },
    /// A block is not reachable from the entry point.
    UnreachableBlock { block_id: String },
    /// A non-Response block has no outgoing edges.
    DanglingBlock {
        block_id: String,
        block_type: String,
    },
    /// Worker graph has no blocks defined.
    EmptyWorker,
    /// A Condition block is missing a labeled branch edge.
    ConditionMissingBranch {
        block_id: String,
        missing_label: String,
    },
    /// A Loop block sets neither `iterations` nor `collection`.
    LoopWithoutSource { block_id: String },
    /// A Parallel block sets neither `collection` nor `count`.
    ParallelWithoutSource { block_id: String },

    // === Reference Errors ===
    /// A block reference points to a non-existent block.
    InvalidBlockReference {
        block_id: String,
        reference_path: String,
        referenced_block_id: String,
        available_blocks: Vec<String>,
    },
    /// A reference path has invalid syntax or an unknown root.
    InvalidReferencePath {
        block_id: String,
        reference_path: String,
        reason: String,
    },

    // === Tool Errors ===
    /// Tool does not exist in the registry.
    UnknownTool {
        block_id: String,
        tool_id: String,
        available_tools: Vec<String>,
    },
    /// Required tool param is missing from the input mapping.
    MissingRequiredParam {
        block_id: String,
        tool_id: String,
        param_name: String,
    },

    // === Worker Call Errors ===
    /// Worker-call block targets a worker that is not in the store.
    UnknownWorker { block_id: String, worker_id: String },
    /// Worker-call blocks form a cycle.
    WorkerCycle { chain: Vec<String> },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Graph Structure Errors
            ValidationError::EntryPointNotFound {
                entry_point,
                available_blocks,
            } => {
                write!(
                    f,
                    "[E001] Entry point '{}' not found in blocks. Available blocks: {}",
                    entry_point,
                    if available_blocks.is_empty() {
                        "(none)".to_string()
                    } else {
                        available_blocks.join(", ")
                    }
                )
            }
            ValidationError::UnreachableBlock { block_id } => {
                write!(
                    f,
                    "[E002] Block '{}' is unreachable from the entry point",
                    block_id
                )
            }
            ValidationError::DanglingBlock {
                block_id,
                block_type,
            } => {
                write!(
                    f,
                    "[E003] Block '{}' ({}) has no outgoing edges but is not a Response block",
                    block_id, block_type
                )
            }
            ValidationError::EmptyWorker => {
                write!(f, "[E004] Worker graph has no blocks defined")
            }
            ValidationError::ConditionMissingBranch {
                block_id,
                missing_label,
            } => {
                write!(
                    f,
                    "[E005] Condition block '{}' has no outgoing edge labeled '{}'",
                    block_id, missing_label
                )
            }
            ValidationError::LoopWithoutSource { block_id } => {
                write!(
                    f,
                    "[E006] Loop block '{}' sets neither 'iterations' nor 'collection'",
                    block_id
                )
            }
            ValidationError::ParallelWithoutSource { block_id } => {
                write!(
                    f,
                    "[E007] Parallel block '{}' sets neither 'collection' nor 'count'",
                    block_id
                )
            }

            // Reference Errors
            ValidationError::InvalidBlockReference {
                block_id,
                reference_path,
                referenced_block_id,
                available_blocks,
            } => {
                let suggestion = find_similar_name(referenced_block_id, available_blocks);
                let suggestion_text = suggestion
                    .map(|s| format!(". Did you mean '{}'?", s))
                    .unwrap_or_default();
                write!(
                    f,
                    "[E010] Block '{}' references '{}' but block '{}' does not exist{}",
                    block_id, reference_path, referenced_block_id, suggestion_text
                )
            }
            ValidationError::InvalidReferencePath {
                block_id,
                reference_path,
                reason,
            } => {
                write!(
                    f,
                    "[E011] Block '{}' has invalid reference path '{}': {}",
                    block_id, reference_path, reason
                )
            }

            // Tool Errors
            ValidationError::UnknownTool {
                block_id,
                tool_id,
                available_tools,
            } => {
                let suggestion = find_similar_name(tool_id, available_tools);
                let suggestion_text = suggestion
                    .map(|s| format!(". Did you mean '{}'?", s))
                    .unwrap_or_default();
                write!(
                    f,
                    "[E020] Block '{}' uses unknown tool '{}'{}\n       Available tools: {}",
                    block_id,
                    tool_id,
                    suggestion_text,
                    available_tools.join(", ")
                )
            }
            ValidationError::MissingRequiredParam {
                block_id,
                tool_id,
                param_name,
            } => {
                write!(
                    f,
                    "[E021] Block '{}': tool '{}' requires param '{}' but it is not provided",
                    block_id, tool_id, param_name
                )
            }

            // Worker Call Errors
            ValidationError::UnknownWorker {
                block_id,
                worker_id,
            } => {
                write!(
                    f,
                    "[E030] Block '{}' calls unknown worker '{}'",
                    block_id, worker_id
                )
            }
            ValidationError::WorkerCycle { chain } => {
                write!(f, "[E031] Worker call cycle: {}", chain.join(" -> "))
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// ============================================================================
// Validation Warnings
// ============================================================================

/// Warnings that indicate potential issues but don't prevent execution.
#[derive(Debug, Clone)]
#[allow(missing_docs)] // Fields are self-documenting from variant docs
pub enum ValidationWarning {
    /// Unknown param in a tool block's input mapping.
    UnknownToolParam {
        block_id: String,
        tool_id: String,
        param_name: String,
        available_params: Vec<String>,
    },
    /// High retry count may cause long execution times.
    HighRetryCount {
        block_id: String,
        max_retries: u32,
        recommended_max: u32,
    },
    /// Long retry delay may cause long execution times.
    LongRetryDelay {
        block_id: String,
        retry_delay_ms: u64,
        recommended_max_ms: u64,
    },
    /// High concurrency bound may cause resource issues.
    HighMaxConcurrency {
        block_id: String,
        max_concurrency: usize,
        recommended_max: usize,
    },
    /// High iteration cap may indicate infinite loop risk.
    HighIterationCount {
        block_id: String,
        iterations: u64,
        recommended_max: u64,
    },
    /// Long timeout configured.
    LongTimeout {
        block_id: String,
        timeout_ms: u64,
        recommended_max_ms: u64,
    },
    /// Parallel block fans out over a collection with no concurrency bound.
    UnboundedConcurrency { block_id: String },
    /// Block references its own outputs.
    SelfReference {
        block_id: String,
        reference_path: String,
    },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::UnknownToolParam {
                block_id,
                tool_id,
                param_name,
                available_params,
            } => {
                let suggestion = find_similar_name(param_name, available_params);
                let suggestion_text = suggestion
                    .map(|s| format!(". Did you mean '{}'?", s))
                    .unwrap_or_default();
                write!(
                    f,
                    "[W020] Block '{}': param '{}' is not a known param of tool '{}'{}\n       Available params: {}",
                    block_id,
                    param_name,
                    tool_id,
                    suggestion_text,
                    if available_params.is_empty() {
                        "(none)".to_string()
                    } else {
                        available_params.join(", ")
                    }
                )
            }
            ValidationWarning::HighRetryCount {
                block_id,
                max_retries,
                recommended_max,
            } => {
                write!(
                    f,
                    "[W030] Block '{}' has maxRetries={}. Consider reducing to {} or less to avoid long execution times.",
                    block_id, max_retries, recommended_max
                )
            }
            ValidationWarning::LongRetryDelay {
                block_id,
                retry_delay_ms,
                recommended_max_ms,
            } => {
                write!(
                    f,
                    "[W031] Block '{}' has retryDelay={}ms ({}). Consider reducing to {}ms or less.",
                    block_id,
                    retry_delay_ms,
                    format_duration(*retry_delay_ms),
                    recommended_max_ms
                )
            }
            ValidationWarning::HighMaxConcurrency {
                block_id,
                max_concurrency,
                recommended_max,
            } => {
                write!(
                    f,
                    "[W032] Parallel block '{}' has maxConcurrency={}. Consider reducing to {} or less for resource efficiency.",
                    block_id, max_concurrency, recommended_max
                )
            }
            ValidationWarning::HighIterationCount {
                block_id,
                iterations,
                recommended_max,
            } => {
                write!(
                    f,
                    "[W033] Loop block '{}' allows {} iterations. This may indicate an infinite loop risk. Consider {} or less.",
                    block_id, iterations, recommended_max
                )
            }
            ValidationWarning::LongTimeout {
                block_id,
                timeout_ms,
                recommended_max_ms,
            } => {
                write!(
                    f,
                    "[W034] Block '{}' has timeout={}ms ({}). Consider {} or less, or breaking into smaller blocks.",
                    block_id,
                    timeout_ms,
                    format_duration(*timeout_ms),
                    format_duration(*recommended_max_ms)
                )
            }
            ValidationWarning::UnboundedConcurrency { block_id } => {
                write!(
                    f,
                    "[W035] Parallel block '{}' fans out over a collection with no maxConcurrency bound",
                    block_id
                )
            }
            ValidationWarning::SelfReference {
                block_id,
                reference_path,
            } => {
                write!(
                    f,
                    "[W050] Block '{}' references its own outputs via '{}'",
                    block_id, reference_path
                )
            }
        }
    }
}

// ============================================================================
// Main Validation Functions
// ============================================================================

/// Validate a worker, including cross-worker call cycles.
///
/// Runs all graph-level phases on the worker's graph, then walks worker-call
/// blocks through the store looking for unknown workers and cycles.
pub async fn validate_worker(
    worker: &Worker,
    tools: &ToolRegistry,
    store: &dyn WorkerStore,
) -> ValidationResult {
    let mut result = validate_graph(&worker.graph, tools);

    let mut chain = vec![worker.id.clone()];
    walk_worker_calls(&worker.graph, store, &mut chain, &mut result).await;

    result
}

/// Validate an execution graph in isolation (no store access).
///
/// Returns a `ValidationResult` containing errors and warnings. Execution
/// should be refused if there are any errors.
pub fn validate_graph(graph: &ExecutionGraph, tools: &ToolRegistry) -> ValidationResult {
    let mut result = ValidationResult::default();
    validate_graph_inner(graph, tools, &HashSet::new(), true, &mut result);
    result
}

fn validate_graph_inner(
    graph: &ExecutionGraph,
    tools: &ToolRegistry,
    enclosing_blocks: &HashSet<String>,
    top_level: bool,
    result: &mut ValidationResult,
) {
    // Phase 1: Graph structure
    if !validate_graph_structure(graph, top_level, result) {
        return;
    }

    // Phase 2: References
    validate_references(graph, enclosing_blocks, result);

    // Phase 3: Tools
    validate_tools(graph, tools, result);

    // Phase 4: Configuration warnings
    validate_configuration(graph, result);

    // Recurse into Loop/Parallel subgraphs. Subgraph references may point at
    // blocks of any enclosing graph, so the valid id set accumulates.
    let mut visible: HashSet<String> = enclosing_blocks.clone();
    visible.extend(graph.blocks.keys().cloned());
    for block in graph.blocks.values() {
        if let Some(subgraph) = block.subgraph() {
            validate_graph_inner(subgraph, tools, &visible, false, result);
        }
    }
}

// ============================================================================
// Phase 1: Graph Structure Validation
// ============================================================================

/// Returns false when the graph is too broken for further phases.
fn validate_graph_structure(
    graph: &ExecutionGraph,
    top_level: bool,
    result: &mut ValidationResult,
) -> bool {
    if graph.blocks.is_empty() {
        result.errors.push(ValidationError::EmptyWorker);
        return false;
    }

    if !graph.blocks.contains_key(&graph.entry_point) {
        let available_blocks: Vec<String> = graph.blocks.keys().cloned().collect();
        result.errors.push(ValidationError::EntryPointNotFound {
            entry_point: graph.entry_point.clone(),
            available_blocks,
        });
        return false;
    }

    // Reachability from the entry point
    let reachable = compute_reachable_blocks(graph);
    for block_id in graph.blocks.keys() {
        if !reachable.contains(block_id) {
            result.errors.push(ValidationError::UnreachableBlock {
                block_id: block_id.clone(),
            });
        }
    }

    // Dangling blocks (non-Response blocks with no outgoing edges). Only at
    // the top level: loop/parallel subgraphs may terminate anywhere, the
    // last block's output becomes the iteration result.
    if top_level {
        let blocks_with_outgoing = graph.blocks_with_outgoing();
        for (block_id, block) in &graph.blocks {
            if matches!(block, Block::Response(_)) {
                continue;
            }
            if !blocks_with_outgoing.contains(block_id.as_str()) {
                result.errors.push(ValidationError::DanglingBlock {
                    block_id: block_id.clone(),
                    block_type: block.block_type().to_string(),
                });
            }
        }
    }

    // Condition blocks need both labeled branches
    for (block_id, block) in &graph.blocks {
        if matches!(block, Block::Condition(_)) {
            let labels: HashSet<&str> = graph
                .outgoing_edges(block_id)
                .iter()
                .filter_map(|e| e.label.as_deref())
                .collect();
            for branch in ["true", "false"] {
                if !labels.contains(branch) {
                    result.errors.push(ValidationError::ConditionMissingBranch {
                        block_id: block_id.clone(),
                        missing_label: branch.to_string(),
                    });
                }
            }
        }
    }

    // Loop/Parallel blocks need an iteration source
    for (block_id, block) in &graph.blocks {
        match block {
            Block::Loop(loop_block) => {
                let config = &loop_block.config;
                if config.iterations.is_none() && config.collection.is_none() {
                    result.errors.push(ValidationError::LoopWithoutSource {
                        block_id: block_id.clone(),
                    });
                }
            }
            Block::Parallel(parallel_block) => {
                let config = &parallel_block.config;
                if config.collection.is_none() && config.count.is_none() {
                    result.errors.push(ValidationError::ParallelWithoutSource {
                        block_id: block_id.clone(),
                    });
                }
            }
            _ => {}
        }
    }

    true
}

/// Compute the set of blocks reachable from the entry point.
fn compute_reachable_blocks(graph: &ExecutionGraph) -> HashSet<String> {
    let mut reachable = HashSet::new();
    let mut queue = vec![graph.entry_point.clone()];

    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    for edge in &graph.edges {
        adjacency
            .entry(edge.from_block.clone())
            .or_default()
            .push(edge.to_block.clone());
    }

    while let Some(block_id) = queue.pop() {
        if reachable.contains(&block_id) {
            continue;
        }
        reachable.insert(block_id.clone());

        if let Some(neighbors) = adjacency.get(&block_id) {
            for neighbor in neighbors {
                if !reachable.contains(neighbor) {
                    queue.push(neighbor.clone());
                }
            }
        }
    }

    reachable
}

// ============================================================================
// Phase 2: Reference Validation
// ============================================================================

const VALID_REFERENCE_ROOTS: &[&str] = &["input", "variables", "blocks", "loop", "parallel"];

fn validate_references(
    graph: &ExecutionGraph,
    enclosing_blocks: &HashSet<String>,
    result: &mut ValidationResult,
) {
    let mut valid_block_ids: HashSet<String> = enclosing_blocks.clone();
    valid_block_ids.extend(graph.blocks.keys().cloned());

    for (block_id, block) in &graph.blocks {
        for ref_path in collect_block_references(block) {
            validate_reference(block_id, ref_path, &valid_block_ids, result);
        }
    }
}

fn validate_reference(
    block_id: &str,
    ref_path: &str,
    valid_block_ids: &HashSet<String>,
    result: &mut ValidationResult,
) {
    // Check for empty path segments
    if ref_path.contains("..") {
        result.errors.push(ValidationError::InvalidReferencePath {
            block_id: block_id.to_string(),
            reference_path: ref_path.to_string(),
            reason: "empty path segment (consecutive dots)".to_string(),
        });
        return;
    }

    let root = nusoma_dsl::reference_root(ref_path);
    if !VALID_REFERENCE_ROOTS.contains(&root) {
        result.errors.push(ValidationError::InvalidReferencePath {
            block_id: block_id.to_string(),
            reference_path: ref_path.to_string(),
            reason: format!(
                "unknown root '{}' (expected one of: {})",
                root,
                VALID_REFERENCE_ROOTS.join(", ")
            ),
        });
        return;
    }

    if let Some(referenced_block_id) = block_id_from_reference(ref_path) {
        // Self reference is a warning, not an error
        if referenced_block_id == block_id {
            result.warnings.push(ValidationWarning::SelfReference {
                block_id: block_id.to_string(),
                reference_path: ref_path.to_string(),
            });
        }

        if !valid_block_ids.contains(&referenced_block_id) {
            result.errors.push(ValidationError::InvalidBlockReference {
                block_id: block_id.to_string(),
                reference_path: ref_path.to_string(),
                referenced_block_id: referenced_block_id.clone(),
                available_blocks: valid_block_ids.iter().cloned().collect(),
            });
        }
    }
}

/// Collect all reference paths a block can resolve at runtime: its input
/// mapping, plus condition leaves and loop/parallel collection sources.
fn collect_block_references(block: &Block) -> Vec<&str> {
    let mut refs = Vec::new();

    if let Some(mapping) = block.input_mapping() {
        for value in mapping.values() {
            refs.extend(value.collect_references());
        }
    }

    match block {
        Block::Condition(condition_block) => {
            collect_condition_references(&condition_block.condition, &mut refs);
        }
        Block::Loop(loop_block) => {
            if let Some(collection) = &loop_block.config.collection {
                refs.extend(collection.collect_references());
            }
        }
        Block::Parallel(parallel_block) => {
            if let Some(collection) = &parallel_block.config.collection {
                refs.extend(collection.collect_references());
            }
        }
        _ => {}
    }

    refs
}

fn collect_condition_references<'a>(
    expr: &'a nusoma_dsl::ConditionExpression,
    refs: &mut Vec<&'a str>,
) {
    match expr {
        nusoma_dsl::ConditionExpression::Value(mapping) => {
            refs.extend(mapping.collect_references());
        }
        nusoma_dsl::ConditionExpression::Operation(op) => {
            for arg in &op.arguments {
                match arg {
                    nusoma_dsl::ConditionArgument::Expression(nested) => {
                        collect_condition_references(nested, refs);
                    }
                    nusoma_dsl::ConditionArgument::Value(mapping) => {
                        refs.extend(mapping.collect_references());
                    }
                }
            }
        }
    }
}

// ============================================================================
// Phase 3: Tool Validation
// ============================================================================

fn validate_tools(graph: &ExecutionGraph, tools: &ToolRegistry, result: &mut ValidationResult) {
    for (block_id, block) in &graph.blocks {
        let Block::Tool(tool_block) = block else {
            continue;
        };

        let Some(config) = tools.get(&tool_block.tool_id) else {
            result.errors.push(ValidationError::UnknownTool {
                block_id: block_id.clone(),
                tool_id: tool_block.tool_id.clone(),
                available_tools: tools.ids().into_iter().map(String::from).collect(),
            });
            continue;
        };

        let provided_keys: HashSet<String> = tool_block
            .input_mapping
            .as_ref()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();

        let available_params: Vec<String> =
            config.params.iter().map(|p| p.name.clone()).collect();

        // Missing required params. Params with a declared default are
        // filled in at invoke time.
        for param in &config.params {
            if param.required
                && param.default.is_none()
                && !provided_keys.contains(&param.name)
            {
                result.errors.push(ValidationError::MissingRequiredParam {
                    block_id: block_id.clone(),
                    tool_id: tool_block.tool_id.clone(),
                    param_name: param.name.clone(),
                });
            }
        }

        // Unknown params (warning)
        for key in &provided_keys {
            if key.starts_with('_') {
                continue;
            }
            if !available_params.contains(key) {
                result.warnings.push(ValidationWarning::UnknownToolParam {
                    block_id: block_id.clone(),
                    tool_id: tool_block.tool_id.clone(),
                    param_name: key.clone(),
                    available_params: available_params.clone(),
                });
            }
        }
    }
}

// ============================================================================
// Phase 4: Configuration Validation
// ============================================================================

// Thresholds for configuration warnings
const MAX_RETRY_RECOMMENDED: u32 = 50;
const MAX_RETRY_DELAY_MS: u64 = 3_600_000; // 1 hour
const MAX_CONCURRENCY_RECOMMENDED: usize = 100;
const MAX_ITERATIONS_RECOMMENDED: u64 = 10_000;
const MAX_TIMEOUT_MS: u64 = 3_600_000; // 1 hour

fn validate_configuration(graph: &ExecutionGraph, result: &mut ValidationResult) {
    for (block_id, block) in &graph.blocks {
        match block {
            Block::Tool(tool_block) => {
                let Some(config) = &tool_block.config else {
                    continue;
                };

                if let Some(max_retries) = config.max_retries
                    && max_retries > MAX_RETRY_RECOMMENDED
                {
                    result.warnings.push(ValidationWarning::HighRetryCount {
                        block_id: block_id.clone(),
                        max_retries,
                        recommended_max: MAX_RETRY_RECOMMENDED,
                    });
                }

                if let Some(retry_delay) = config.retry_delay
                    && retry_delay > MAX_RETRY_DELAY_MS
                {
                    result.warnings.push(ValidationWarning::LongRetryDelay {
                        block_id: block_id.clone(),
                        retry_delay_ms: retry_delay,
                        recommended_max_ms: MAX_RETRY_DELAY_MS,
                    });
                }

                if let Some(timeout) = config.timeout
                    && timeout > MAX_TIMEOUT_MS
                {
                    result.warnings.push(ValidationWarning::LongTimeout {
                        block_id: block_id.clone(),
                        timeout_ms: timeout,
                        recommended_max_ms: MAX_TIMEOUT_MS,
                    });
                }
            }

            Block::Loop(loop_block) => {
                let config = &loop_block.config;
                let cap = config.max_iterations.or(config.iterations);
                if let Some(iterations) = cap
                    && iterations > MAX_ITERATIONS_RECOMMENDED
                {
                    result.warnings.push(ValidationWarning::HighIterationCount {
                        block_id: block_id.clone(),
                        iterations,
                        recommended_max: MAX_ITERATIONS_RECOMMENDED,
                    });
                }
            }

            Block::Parallel(parallel_block) => {
                let config = &parallel_block.config;
                match config.max_concurrency {
                    Some(max_concurrency) if max_concurrency > MAX_CONCURRENCY_RECOMMENDED => {
                        result.warnings.push(ValidationWarning::HighMaxConcurrency {
                            block_id: block_id.clone(),
                            max_concurrency,
                            recommended_max: MAX_CONCURRENCY_RECOMMENDED,
                        });
                    }
                    Some(0) | None if config.collection.is_some() => {
                        result.warnings.push(ValidationWarning::UnboundedConcurrency {
                            block_id: block_id.clone(),
                        });
                    }
                    _ => {}
                }
            }

            _ => {}
        }
    }
}

// ============================================================================
// Phase 5: Worker Call Validation
// ============================================================================

/// Walk worker-call blocks through the store, flagging unknown workers and
/// call cycles. `chain` carries the worker ids on the current path.
fn walk_worker_calls<'a>(
    graph: &'a ExecutionGraph,
    store: &'a dyn WorkerStore,
    chain: &'a mut Vec<String>,
    result: &'a mut ValidationResult,
) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        for (block_id, block) in &graph.blocks {
            match block {
                Block::Worker(worker_block) => {
                    let callee_id = &worker_block.worker_id;

                    if chain.contains(callee_id) {
                        let mut cycle = chain.clone();
                        cycle.push(callee_id.clone());
                        result.errors.push(ValidationError::WorkerCycle { chain: cycle });
                        continue;
                    }

                    let Some(callee) = store.get(callee_id).await else {
                        result.errors.push(ValidationError::UnknownWorker {
                            block_id: block_id.clone(),
                            worker_id: callee_id.clone(),
                        });
                        continue;
                    };

                    chain.push(callee_id.clone());
                    walk_worker_calls(&callee.graph, store, chain, result).await;
                    chain.pop();
                }
                Block::Loop(_) | Block::Parallel(_) => {
                    if let Some(subgraph) = block.subgraph() {
                        walk_worker_calls(subgraph, store, chain, result).await;
                    }
                }
                _ => {}
            }
        }
    })
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Find the most similar name using Levenshtein distance.
fn find_similar_name(target: &str, candidates: &[String]) -> Option<String> {
    let target_lower = target.to_lowercase();

    candidates
        .iter()
        .filter_map(|candidate| {
            let distance = levenshtein_distance(&target_lower, &candidate.to_lowercase());
            // Only suggest if distance is reasonable (less than half the target length + 2)
            if distance <= target.len() / 2 + 2 {
                Some((candidate.clone(), distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, d)| *d)
        .map(|(name, _)| name)
}

/// Simple Levenshtein distance implementation.
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };
            curr[j] = (prev[j] + 1).min((curr[j - 1] + 1).min(prev[j - 1] + cost));
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Format milliseconds as human-readable duration.
fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else if ms < 3_600_000 {
        format!("{:.1}min", ms as f64 / 60_000.0)
    } else {
        format!("{:.1}h", ms as f64 / 3_600_000.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
