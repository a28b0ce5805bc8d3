// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker DSL Type Definitions - Single Source of Truth
//!
//! This crate defines the worker graph types used throughout the codebase:
//! - Runtime deserialization of worker JSON coming from the canvas editor
//! - Type-safe access to the graph structure for validation and execution
//! - JSON Schema generation via schemars
//!
//! It also hosts the block catalog: the static registry of block types the
//! editor can place on the canvas.

// Provide imports needed by graph_types.rs
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// Include the graph types
include!("graph_types.rs");

// Block catalog (static block registry)
pub mod catalog;

// ============================================================================
// Parsing Functions
// ============================================================================

/// Parse a complete worker from JSON Value
pub fn parse_worker(json: &serde_json::Value) -> Result<Worker, String> {
    serde_json::from_value(json.clone()).map_err(|e| format!("Failed to parse worker: {}", e))
}

/// Parse an execution graph from JSON Value
pub fn parse_execution_graph(json: &serde_json::Value) -> Result<ExecutionGraph, String> {
    serde_json::from_value(json.clone())
        .map_err(|e| format!("Failed to parse execution graph: {}", e))
}

// ============================================================================
// Block Helper Methods
// ============================================================================

impl Block {
    /// The block's id
    pub fn id(&self) -> &str {
        match self {
            Block::Start(b) => &b.id,
            Block::Function(b) => &b.id,
            Block::Condition(b) => &b.id,
            Block::Tool(b) => &b.id,
            Block::Loop(b) => &b.id,
            Block::Parallel(b) => &b.id,
            Block::Worker(b) => &b.id,
            Block::Response(b) => &b.id,
        }
    }

    /// The discriminant used on the wire (`blockType`)
    pub fn block_type(&self) -> &'static str {
        match self {
            Block::Start(_) => "Start",
            Block::Function(_) => "Function",
            Block::Condition(_) => "Condition",
            Block::Tool(_) => "Tool",
            Block::Loop(_) => "Loop",
            Block::Parallel(_) => "Parallel",
            Block::Worker(_) => "Worker",
            Block::Response(_) => "Response",
        }
    }

    /// Input mapping, for block types that carry one
    pub fn input_mapping(&self) -> Option<&HashMap<String, MappingValue>> {
        match self {
            Block::Function(b) => b.input_mapping.as_ref(),
            Block::Tool(b) => b.input_mapping.as_ref(),
            Block::Worker(b) => b.input_mapping.as_ref(),
            Block::Response(b) => b.input_mapping.as_ref(),
            _ => None,
        }
    }

    /// Nested subgraph, for container blocks
    pub fn subgraph(&self) -> Option<&ExecutionGraph> {
        match self {
            Block::Loop(b) => Some(&b.subgraph),
            Block::Parallel(b) => Some(&b.subgraph),
            _ => None,
        }
    }
}

// ============================================================================
// ExecutionGraph Helper Methods
// ============================================================================

impl ExecutionGraph {
    /// Edges leaving the given block, in declaration order
    pub fn outgoing_edges(&self, block_id: &str) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.from_block == block_id)
            .collect()
    }

    /// Block ids that have at least one outgoing edge
    pub fn blocks_with_outgoing(&self) -> std::collections::HashSet<&str> {
        self.edges.iter().map(|e| e.from_block.as_str()).collect()
    }
}

// ============================================================================
// MappingValue Helper Methods
// ============================================================================

impl MappingValue {
    /// Check if this is a reference (dynamic data lookup)
    pub fn is_reference(&self) -> bool {
        matches!(self, MappingValue::Reference(_))
    }

    /// Check if this is an immediate (static/literal) value
    pub fn is_immediate(&self) -> bool {
        matches!(self, MappingValue::Immediate(_))
    }

    /// Check if this is a composite (structured object/array with nested values)
    pub fn is_composite(&self) -> bool {
        matches!(self, MappingValue::Composite(_))
    }

    /// Get the path if this is a reference
    pub fn as_reference_str(&self) -> Option<&str> {
        match self {
            MappingValue::Reference(r) => Some(&r.value),
            _ => None,
        }
    }

    /// Get the value if this is an immediate
    pub fn as_immediate_value(&self) -> Option<&serde_json::Value> {
        match self {
            MappingValue::Immediate(i) => Some(&i.value),
            _ => None,
        }
    }

    /// Get the inner composite value if this is a composite
    pub fn as_composite(&self) -> Option<&CompositeInner> {
        match self {
            MappingValue::Composite(c) => Some(&c.value),
            _ => None,
        }
    }

    /// Recursively collect all reference paths used in this value
    pub fn collect_references(&self) -> Vec<&str> {
        match self {
            MappingValue::Reference(r) => vec![r.value.as_str()],
            MappingValue::Immediate(_) => vec![],
            MappingValue::Composite(c) => c.value.collect_references(),
        }
    }

    /// Returns true if this value or any nested value contains references
    pub fn has_references(&self) -> bool {
        match self {
            MappingValue::Reference(_) => true,
            MappingValue::Immediate(_) => false,
            MappingValue::Composite(c) => c.value.has_references(),
        }
    }
}

impl CompositeInner {
    pub fn is_object(&self) -> bool {
        matches!(self, CompositeInner::Object(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, CompositeInner::Array(_))
    }

    pub fn as_object(&self) -> Option<&HashMap<String, MappingValue>> {
        match self {
            CompositeInner::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<MappingValue>> {
        match self {
            CompositeInner::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Recursively collect all reference paths in this composite
    pub fn collect_references(&self) -> Vec<&str> {
        match self {
            CompositeInner::Object(map) => {
                map.values().flat_map(|v| v.collect_references()).collect()
            }
            CompositeInner::Array(arr) => arr.iter().flat_map(|v| v.collect_references()).collect(),
        }
    }

    /// Returns true if any nested value contains references
    pub fn has_references(&self) -> bool {
        match self {
            CompositeInner::Object(map) => map.values().any(|v| v.has_references()),
            CompositeInner::Array(arr) => arr.iter().any(|v| v.has_references()),
        }
    }
}

// ============================================================================
// Reference Paths
// ============================================================================

/// Extract the block id from a `blocks.*` reference path.
///
/// Handles both dot notation (`blocks.my_block.output.total`) and bracket
/// notation for ids with special characters (`blocks["my block"].output`).
/// Returns `None` for paths rooted elsewhere (`input.*`, `variables.*`,
/// `loop.*`, `parallel.*`).
pub fn block_id_from_reference(path: &str) -> Option<String> {
    let rest = path.strip_prefix("blocks")?;

    if let Some(bracketed) = rest.strip_prefix('[') {
        let end = bracketed.find(']')?;
        let inner = &bracketed[..end];
        let id = inner
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .or_else(|| inner.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
            .unwrap_or(inner);
        if id.is_empty() {
            return None;
        }
        return Some(id.to_string());
    }

    let rest = rest.strip_prefix('.')?;
    let id = rest.split('.').next().unwrap_or("");
    if id.is_empty() {
        return None;
    }
    Some(id.to_string())
}

/// Root segment of a reference path (`input`, `variables`, `blocks`, `loop`,
/// `parallel`)
pub fn reference_root(path: &str) -> &str {
    let end = path
        .find(|c| c == '.' || c == '[')
        .unwrap_or(path.len());
    &path[..end]
}

// ============================================================================
// SchemaFieldType Helper Methods
// ============================================================================

impl SchemaFieldType {
    /// Get as string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaFieldType::String => "string",
            SchemaFieldType::Integer => "integer",
            SchemaFieldType::Number => "number",
            SchemaFieldType::Boolean => "boolean",
            SchemaFieldType::Array => "array",
            SchemaFieldType::Object => "object",
        }
    }
}

impl std::fmt::Display for SchemaFieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_execution_graph_minimal() {
        let json = serde_json::json!({
            "entryPoint": "start",
            "blocks": {},
            "edges": [],
            "variables": {},
            "inputSchema": {},
            "outputSchema": {}
        });

        let graph = parse_execution_graph(&json).expect("Should parse minimal graph");
        assert_eq!(graph.entry_point, "start");
        assert!(graph.blocks.is_empty());
    }

    #[test]
    fn test_parse_execution_graph_with_blocks() {
        // Block enum uses #[serde(tag = "blockType")] - internally tagged representation
        let json = serde_json::json!({
            "entryPoint": "start",
            "blocks": {
                "start": {
                    "blockType": "Start",
                    "id": "start"
                },
                "done": {
                    "blockType": "Response",
                    "id": "done",
                    "name": "Done"
                }
            },
            "edges": [
                { "fromBlock": "start", "toBlock": "done" }
            ]
        });

        let graph = parse_execution_graph(&json).expect("Should parse graph with blocks");
        assert_eq!(graph.blocks.len(), 2);
        assert!(graph.blocks.contains_key("done"));
        assert_eq!(graph.blocks["done"].block_type(), "Response");
    }

    #[test]
    fn test_parse_execution_graph_invalid_json() {
        let json = serde_json::json!({
            "wrong_field": "value"
        });

        let result = parse_execution_graph(&json);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to parse"));
    }

    #[test]
    fn test_parse_worker_minimal() {
        let json = serde_json::json!({
            "id": "w1",
            "name": "Order Sync",
            "graph": {
                "entryPoint": "start",
                "blocks": {},
                "edges": []
            }
        });

        let worker = parse_worker(&json).expect("Should parse minimal worker");
        assert_eq!(worker.id, "w1");
        assert_eq!(worker.name, "Order Sync");
        assert!(worker.owner.is_none());
    }

    #[test]
    fn test_parse_worker_invalid() {
        let json = serde_json::json!({ "not_a_worker": true });

        let result = parse_worker(&json);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to parse worker"));
    }

    #[test]
    fn test_block_id_and_type() {
        let block = Block::Tool(ToolBlock {
            id: "fetch".to_string(),
            name: Some("Fetch orders".to_string()),
            tool_id: "http_request".to_string(),
            input_mapping: None,
            config: None,
        });

        assert_eq!(block.id(), "fetch");
        assert_eq!(block.block_type(), "Tool");
    }

    #[test]
    fn test_tool_block_serialization_tag() {
        let block = Block::Tool(ToolBlock {
            id: "t1".to_string(),
            name: None,
            tool_id: "memory_delete".to_string(),
            input_mapping: None,
            config: Some(ToolBlockConfig {
                max_retries: Some(3),
                retry_delay: Some(250),
                timeout: Some(5000),
            }),
        });

        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json.get("blockType").unwrap(), "Tool");
        assert_eq!(json.get("toolId").unwrap(), "memory_delete");
        let config = json.get("config").unwrap();
        assert_eq!(config.get("maxRetries").unwrap(), 3);
        assert_eq!(config.get("retryDelay").unwrap(), 250);
    }

    #[test]
    fn test_parallel_config_serialization() {
        let config = ParallelConfig {
            collection: Some(MappingValue::Reference(ReferenceValue {
                value: "input.items".to_string(),
                type_hint: None,
                default: None,
            })),
            count: None,
            max_concurrency: Some(5),
            fail_fast: Some(true),
        };

        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("collection").is_some());
        assert_eq!(json.get("maxConcurrency").unwrap(), 5);
        assert_eq!(json.get("failFast").unwrap(), true);
        assert!(json.get("count").is_none());
    }

    #[test]
    fn test_loop_block_with_subgraph() {
        let block = LoopBlock {
            id: "loop1".to_string(),
            name: None,
            config: LoopConfig {
                iterations: Some(3),
                collection: None,
                max_iterations: None,
            },
            subgraph: Box::new(ExecutionGraph {
                name: None,
                description: None,
                blocks: HashMap::new(),
                entry_point: "start".to_string(),
                edges: vec![],
                variables: HashMap::new(),
                input_schema: HashMap::new(),
                output_schema: HashMap::new(),
            }),
        };

        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json.get("id").unwrap(), "loop1");
        assert!(json.get("subgraph").is_some());
        assert_eq!(json.get("config").unwrap().get("iterations").unwrap(), 3);
    }

    #[test]
    fn test_value_type_serialization() {
        assert_eq!(
            serde_json::to_string(&ValueType::Integer).unwrap(),
            "\"integer\""
        );
        assert_eq!(
            serde_json::to_string(&ValueType::Number).unwrap(),
            "\"number\""
        );
        assert_eq!(
            serde_json::to_string(&ValueType::Boolean).unwrap(),
            "\"boolean\""
        );
        assert_eq!(serde_json::to_string(&ValueType::Json).unwrap(), "\"json\"");
    }

    #[test]
    fn test_mapping_value_round_trip() {
        // Reference
        let original = MappingValue::Reference(ReferenceValue {
            value: "input.path".to_string(),
            type_hint: None,
            default: None,
        });
        let json = serde_json::to_string(&original).unwrap();
        let parsed: MappingValue = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_reference());
        assert_eq!(parsed.as_reference_str(), Some("input.path"));

        // Immediate
        let original_imm = MappingValue::Immediate(ImmediateValue {
            value: serde_json::json!(42),
        });
        let json_imm = serde_json::to_string(&original_imm).unwrap();
        let parsed_imm: MappingValue = serde_json::from_str(&json_imm).unwrap();
        assert!(parsed_imm.is_immediate());
        assert_eq!(
            parsed_imm.as_immediate_value(),
            Some(&serde_json::json!(42))
        );
    }

    #[test]
    fn test_reference_value_serialization() {
        let ref_val = ReferenceValue {
            value: "blocks.fetch.output.total".to_string(),
            type_hint: Some(ValueType::Integer),
            default: Some(serde_json::json!(0)),
        };

        let json = serde_json::to_value(&ref_val).unwrap();
        assert_eq!(json.get("value").unwrap(), "blocks.fetch.output.total");
        // type_hint is serialized as "type" (not "typeHint")
        assert_eq!(json.get("type").unwrap(), "integer");
        assert_eq!(json.get("default").unwrap(), 0);
    }

    #[test]
    fn test_composite_value_object_deserialization() {
        let json = r#"{
            "valueType": "composite",
            "value": {
                "userId": {"valueType": "reference", "value": "input.user.id"},
                "timestamp": {"valueType": "immediate", "value": 1234567890}
            }
        }"#;

        let parsed: MappingValue = serde_json::from_str(json).unwrap();
        assert!(parsed.is_composite());

        let inner = parsed.as_composite().unwrap();
        assert!(inner.is_object());

        let fields = inner.as_object().unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields.get("userId").unwrap().is_reference());
        assert!(fields.get("timestamp").unwrap().is_immediate());
    }

    #[test]
    fn test_composite_value_array_deserialization() {
        let json = r#"{
            "valueType": "composite",
            "value": [
                {"valueType": "reference", "value": "input.items[0]"},
                {"valueType": "immediate", "value": "fallback"}
            ]
        }"#;

        let parsed: MappingValue = serde_json::from_str(json).unwrap();
        let inner = parsed.as_composite().unwrap();
        assert!(inner.is_array());

        let elements = inner.as_array().unwrap();
        assert_eq!(elements.len(), 2);
        assert!(elements[0].is_reference());
        assert!(elements[1].is_immediate());
    }

    #[test]
    fn test_mapping_value_collect_references() {
        let mut inner = HashMap::new();
        inner.insert(
            "nested".to_string(),
            MappingValue::Reference(ReferenceValue {
                value: "input.nested".to_string(),
                type_hint: None,
                default: None,
            }),
        );

        let mut outer = HashMap::new();
        outer.insert(
            "top".to_string(),
            MappingValue::Reference(ReferenceValue {
                value: "blocks.prev.output".to_string(),
                type_hint: None,
                default: None,
            }),
        );
        outer.insert(
            "inner".to_string(),
            MappingValue::Composite(CompositeValue {
                value: CompositeInner::Object(inner),
            }),
        );

        let composite = MappingValue::Composite(CompositeValue {
            value: CompositeInner::Object(outer),
        });
        let refs = composite.collect_references();

        assert_eq!(refs.len(), 2);
        assert!(refs.contains(&"blocks.prev.output"));
        assert!(refs.contains(&"input.nested"));
    }

    #[test]
    fn test_mapping_value_has_references() {
        let imm_val = MappingValue::Immediate(ImmediateValue {
            value: serde_json::json!("test"),
        });
        assert!(!imm_val.has_references());

        let mut fields = HashMap::new();
        fields.insert(
            "a".to_string(),
            MappingValue::Reference(ReferenceValue {
                value: "input.a".to_string(),
                type_hint: None,
                default: None,
            }),
        );
        let comp = MappingValue::Composite(CompositeValue {
            value: CompositeInner::Object(fields),
        });
        assert!(comp.has_references());
    }

    #[test]
    fn test_condition_expression_deserialization() {
        let json = r#"{
            "type": "operation",
            "op": "GT",
            "arguments": [
                {"valueType": "reference", "value": "input.total"},
                {"valueType": "immediate", "value": 100}
            ]
        }"#;

        let parsed: ConditionExpression = serde_json::from_str(json).unwrap();
        match parsed {
            ConditionExpression::Operation(op) => {
                assert_eq!(op.op, ConditionOperator::Gt);
                assert_eq!(op.arguments.len(), 2);
            }
            _ => panic!("Expected operation"),
        }
    }

    #[test]
    fn test_nested_condition_expression() {
        let json = r#"{
            "type": "operation",
            "op": "AND",
            "arguments": [
                {
                    "type": "operation",
                    "op": "EQ",
                    "arguments": [
                        {"valueType": "reference", "value": "input.status"},
                        {"valueType": "immediate", "value": "active"}
                    ]
                },
                {"valueType": "reference", "value": "input.enabled"}
            ]
        }"#;

        let parsed: ConditionExpression = serde_json::from_str(json).unwrap();
        match parsed {
            ConditionExpression::Operation(op) => {
                assert_eq!(op.op, ConditionOperator::And);
                assert!(matches!(
                    op.arguments[0],
                    ConditionArgument::Expression(_)
                ));
                assert!(matches!(op.arguments[1], ConditionArgument::Value(_)));
            }
            _ => panic!("Expected operation"),
        }
    }

    #[test]
    fn test_block_id_from_reference_dot_notation() {
        assert_eq!(
            block_id_from_reference("blocks.fetch.output.total"),
            Some("fetch".to_string())
        );
        assert_eq!(
            block_id_from_reference("blocks.a"),
            Some("a".to_string())
        );
    }

    #[test]
    fn test_block_id_from_reference_bracket_notation() {
        assert_eq!(
            block_id_from_reference("blocks[\"my block\"].output"),
            Some("my block".to_string())
        );
        assert_eq!(
            block_id_from_reference("blocks['other block'].output.x"),
            Some("other block".to_string())
        );
    }

    #[test]
    fn test_block_id_from_reference_other_roots() {
        assert_eq!(block_id_from_reference("input.field"), None);
        assert_eq!(block_id_from_reference("variables.x"), None);
        assert_eq!(block_id_from_reference("loop.item"), None);
        assert_eq!(block_id_from_reference("blocks."), None);
        assert_eq!(block_id_from_reference("blocks[]"), None);
    }

    #[test]
    fn test_reference_root() {
        assert_eq!(reference_root("input.field.x"), "input");
        assert_eq!(reference_root("blocks[\"a\"].output"), "blocks");
        assert_eq!(reference_root("parallel"), "parallel");
    }

    #[test]
    fn test_outgoing_edges_order() {
        let graph = ExecutionGraph {
            name: None,
            description: None,
            blocks: HashMap::new(),
            entry_point: "a".to_string(),
            edges: vec![
                Edge {
                    from_block: "a".to_string(),
                    to_block: "b".to_string(),
                    label: Some("true".to_string()),
                },
                Edge {
                    from_block: "a".to_string(),
                    to_block: "c".to_string(),
                    label: Some("false".to_string()),
                },
                Edge {
                    from_block: "b".to_string(),
                    to_block: "c".to_string(),
                    label: None,
                },
            ],
            variables: HashMap::new(),
            input_schema: HashMap::new(),
            output_schema: HashMap::new(),
        };

        let out = graph.outgoing_edges("a");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].to_block, "b");
        assert_eq!(out[1].to_block, "c");

        let with_outgoing = graph.blocks_with_outgoing();
        assert!(with_outgoing.contains("a"));
        assert!(with_outgoing.contains("b"));
        assert!(!with_outgoing.contains("c"));
    }

    #[test]
    fn test_dsl_version() {
        assert_eq!(DSL_VERSION, "1.0.0");
    }
}
