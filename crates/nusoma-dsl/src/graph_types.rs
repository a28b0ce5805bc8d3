// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
// Worker graph type definitions. Included from lib.rs so that serde/schemars
// imports are shared with the rest of the crate.

/// Version of the worker DSL these types describe
pub const DSL_VERSION: &str = "1.0.0";

// ============================================================================
// Worker
// ============================================================================

/// A persisted worker: a named execution graph plus ownership metadata.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    /// Stable worker identifier
    pub id: String,

    /// Human-readable name shown in the canvas editor
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Principal that registered the worker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// The executable graph
    pub graph: ExecutionGraph,
}

// ============================================================================
// Execution Graph
// ============================================================================

/// A directed graph of blocks. Traversal starts at `entry_point` and follows
/// `edges`; condition blocks pick the edge whose label matches the evaluated
/// branch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionGraph {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// All blocks in the graph, keyed by block id
    pub blocks: HashMap<String, Block>,

    /// Id of the block where execution starts
    pub entry_point: String,

    /// Directed edges between blocks
    #[serde(default)]
    pub edges: Vec<Edge>,

    /// Static variables available under the `variables.*` reference root
    #[serde(default)]
    pub variables: HashMap<String, serde_json::Value>,

    /// Declared shape of the worker input
    #[serde(default)]
    pub input_schema: HashMap<String, SchemaField>,

    /// Declared shape of the worker output
    #[serde(default)]
    pub output_schema: HashMap<String, SchemaField>,
}

/// An edge in the execution graph. `label` carries the branch name for edges
/// leaving a Condition block (`"true"` / `"false"`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from_block: String,
    pub to_block: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

// ============================================================================
// Blocks
// ============================================================================

/// A block in a worker graph, discriminated by `blockType`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "blockType")]
pub enum Block {
    /// Entry point - receives the worker input
    Start(StartBlock),

    /// Renders a template over resolved inputs
    Function(FunctionBlock),

    /// Branches on a condition expression (edge labels "true"/"false")
    Condition(ConditionBlock),

    /// Invokes a tool from the tool registry
    Tool(ToolBlock),

    /// Sequentially runs a subgraph per iteration
    Loop(LoopBlock),

    /// Fans a subgraph out over a collection with bounded concurrency
    Parallel(ParallelBlock),

    /// Invokes another worker as a single block
    Worker(WorkerBlock),

    /// Terminal block - shapes the worker output
    Response(ResponseBlock),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartBlock {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FunctionBlock {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Template rendered over the resolved inputs. The rendered text is
    /// parsed as JSON when possible, otherwise kept as a string.
    pub template: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_mapping: Option<HashMap<String, MappingValue>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionBlock {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub condition: ConditionExpression,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolBlock {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Id of the tool descriptor to invoke
    pub tool_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_mapping: Option<HashMap<String, MappingValue>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ToolBlockConfig>,
}

/// Retry and timeout tuning for a Tool block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolBlockConfig {
    /// Extra attempts after the first, applied to transient failures only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Delay between attempts in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<u64>,

    /// Per-attempt timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoopBlock {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub config: LoopConfig,

    pub subgraph: Box<ExecutionGraph>,
}

/// Iteration source for a Loop block. Exactly one of `iterations` or
/// `collection` must be set; validation rejects graphs that set neither.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoopConfig {
    /// Fixed iteration count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,

    /// Collection to iterate; each element is exposed as `loop.item`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<MappingValue>,

    /// Hard cap on iterations regardless of source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParallelBlock {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub config: ParallelConfig,

    pub subgraph: Box<ExecutionGraph>,
}

/// Fan-out configuration for a Parallel block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParallelConfig {
    /// Collection to distribute; each element is exposed as `parallel.item`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<MappingValue>,

    /// Fixed branch count, used when no collection is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,

    /// Upper bound on concurrently running branches. 0 or absent means
    /// unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,

    /// Abort remaining branches as soon as one fails
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkerBlock {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Id of the child worker to invoke
    pub worker_id: String,

    /// Input passed to the child worker (resolved against this worker's
    /// context). Absent means the child receives an empty object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_mapping: Option<HashMap<String, MappingValue>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBlock {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_mapping: Option<HashMap<String, MappingValue>>,
}

// ============================================================================
// Mapping Values
// ============================================================================

/// Expected runtime type of a resolved value, used for coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Number,
    Boolean,
    Json,
}

/// A value in an input mapping, discriminated by `valueType`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "valueType", rename_all = "lowercase")]
pub enum MappingValue {
    /// Dynamic lookup against the run context (`input.*`, `variables.*`,
    /// `blocks.<id>.output.*`, `loop.*`, `parallel.*`)
    Reference(ReferenceValue),

    /// Literal value
    Immediate(ImmediateValue),

    /// Object or array whose leaves are themselves mapping values
    Composite(CompositeValue),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReferenceValue {
    /// Reference path, dot notation with optional brackets for ids that
    /// contain special characters (`blocks["my block"].output.total`)
    pub value: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<ValueType>,

    /// Fallback when the path does not resolve
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ImmediateValue {
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompositeValue {
    pub value: CompositeInner,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CompositeInner {
    Object(HashMap<String, MappingValue>),
    Array(Vec<MappingValue>),
}

// ============================================================================
// Conditions
// ============================================================================

/// Condition expression operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, strum::VariantNames)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionOperator {
    // Logical operators
    And,
    Or,
    Not,

    // Comparison operators
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Ne,

    // String operators
    StartsWith,
    EndsWith,

    // Array operators
    Contains,
    In,
    NotIn,

    // Utility operators
    IsDefined,
    IsEmpty,
    IsNotEmpty,
}

/// A condition expression for Condition blocks and operator arguments.
/// Either an operation or a direct value evaluated as truthy/falsy.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConditionExpression {
    Operation(ConditionOperation),
    Value(MappingValue),
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionOperation {
    pub op: ConditionOperator,

    /// Arguments to the operator; arity depends on the operator
    pub arguments: Vec<ConditionArgument>,
}

/// An argument to a condition operation. Untagged: the deserializer picks
/// the variant by structure (a `type` tag means a nested expression, a
/// `valueType` tag means a mapping value).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ConditionArgument {
    Expression(Box<ConditionExpression>),
    Value(MappingValue),
}

// ============================================================================
// Schema Fields
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SchemaFieldType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

/// A field in a worker's declared input or output schema.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    #[serde(rename = "type")]
    pub field_type: SchemaFieldType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    /// Element shape for array fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaField>>,
}
