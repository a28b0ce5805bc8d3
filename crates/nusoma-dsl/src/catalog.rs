// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Block catalog: the static registry of block types available to the
//! canvas editor.
//!
//! Each entry describes one block type: its typed inputs and outputs, the
//! sub-block UI controls the editor renders for it (some gated on the value
//! of a sibling control), and the tool ids the block is allowed to invoke.
//! The catalog is plain static data; lookups have no side effects and the
//! table never changes at runtime.

use serde::Serialize;

/// Category a block belongs to in the editor palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockCategory {
    Control,
    Execution,
    Output,
}

/// Primitive type of a catalog input/output field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Json,
}

/// A typed input or output field of a block type
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogField {
    pub id: &'static str,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

/// UI control rendered for a sub-block in the editor
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SubBlockControl {
    Dropdown { options: &'static [&'static str] },
    Slider { min: i64, max: i64 },
    ShortInput,
    LongInput,
    Code,
}

/// Visibility condition on a sub-block: shown only when the sibling
/// sub-block `field` currently holds `equals`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubBlockCondition {
    pub field: &'static str,
    pub equals: &'static str,
}

/// One editor control inside a block's configuration panel
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubBlock {
    pub id: &'static str,
    pub title: &'static str,
    pub control: SubBlockControl,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<SubBlockCondition>,
}

/// Static description of a block type
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockConfig {
    /// Wire discriminant (`blockType`)
    pub block_type: &'static str,
    pub name: &'static str,
    pub category: BlockCategory,
    pub description: &'static str,
    pub inputs: &'static [CatalogField],
    pub outputs: &'static [CatalogField],
    pub sub_blocks: &'static [SubBlock],
    /// Tool ids this block type may invoke
    pub tool_access: &'static [&'static str],
}

/// All built-in block types
pub static BLOCK_CATALOG: &[BlockConfig] = &[
    BlockConfig {
        block_type: "Start",
        name: "Start",
        category: BlockCategory::Control,
        description: "Entry point - receives the worker input",
        inputs: &[],
        outputs: &[CatalogField {
            id: "input",
            kind: FieldKind::Json,
            required: true,
            description: "The worker input as received",
        }],
        sub_blocks: &[],
        tool_access: &[],
    },
    BlockConfig {
        block_type: "Function",
        name: "Function",
        category: BlockCategory::Execution,
        description: "Transform data with a template over resolved inputs",
        inputs: &[CatalogField {
            id: "template",
            kind: FieldKind::String,
            required: true,
            description: "Template rendered over the resolved inputs",
        }],
        outputs: &[CatalogField {
            id: "result",
            kind: FieldKind::Json,
            required: true,
            description: "Rendered output, parsed as JSON when possible",
        }],
        sub_blocks: &[SubBlock {
            id: "template",
            title: "Template",
            control: SubBlockControl::Code,
            condition: None,
        }],
        tool_access: &[],
    },
    BlockConfig {
        block_type: "Condition",
        name: "Condition",
        category: BlockCategory::Control,
        description: "Branch on a condition expression (true/false edges)",
        inputs: &[CatalogField {
            id: "condition",
            kind: FieldKind::Json,
            required: true,
            description: "Condition expression to evaluate",
        }],
        outputs: &[CatalogField {
            id: "result",
            kind: FieldKind::Boolean,
            required: true,
            description: "Branch taken",
        }],
        sub_blocks: &[SubBlock {
            id: "condition",
            title: "Condition",
            control: SubBlockControl::LongInput,
            condition: None,
        }],
        tool_access: &[],
    },
    BlockConfig {
        block_type: "Tool",
        name: "Tool",
        category: BlockCategory::Execution,
        description: "Invoke a tool from the tool registry",
        inputs: &[
            CatalogField {
                id: "toolId",
                kind: FieldKind::String,
                required: true,
                description: "Id of the tool descriptor to invoke",
            },
            CatalogField {
                id: "maxRetries",
                kind: FieldKind::Integer,
                required: false,
                description: "Extra attempts on transient failures",
            },
            CatalogField {
                id: "timeout",
                kind: FieldKind::Integer,
                required: false,
                description: "Per-attempt timeout in milliseconds",
            },
        ],
        outputs: &[CatalogField {
            id: "output",
            kind: FieldKind::Json,
            required: true,
            description: "Transformed tool response",
        }],
        sub_blocks: &[
            SubBlock {
                id: "toolId",
                title: "Tool",
                control: SubBlockControl::Dropdown {
                    options: &[
                        "http_request",
                        "memory_add",
                        "memory_get",
                        "memory_delete",
                        "worker_executor",
                    ],
                },
                condition: None,
            },
            SubBlock {
                id: "maxRetries",
                title: "Max retries",
                control: SubBlockControl::Slider { min: 0, max: 10 },
                condition: None,
            },
        ],
        tool_access: &[
            "http_request",
            "memory_add",
            "memory_get",
            "memory_delete",
            "worker_executor",
        ],
    },
    BlockConfig {
        block_type: "Loop",
        name: "Loop",
        category: BlockCategory::Control,
        description: "Run a subgraph once per iteration, sequentially",
        inputs: &[
            CatalogField {
                id: "iterations",
                kind: FieldKind::Integer,
                required: false,
                description: "Fixed iteration count (for)",
            },
            CatalogField {
                id: "collection",
                kind: FieldKind::Json,
                required: false,
                description: "Collection to iterate (forEach)",
            },
        ],
        outputs: &[CatalogField {
            id: "results",
            kind: FieldKind::Json,
            required: true,
            description: "Per-iteration outputs in order",
        }],
        sub_blocks: &[
            SubBlock {
                id: "loopType",
                title: "Loop type",
                control: SubBlockControl::Dropdown {
                    options: &["for", "forEach"],
                },
                condition: None,
            },
            SubBlock {
                id: "iterations",
                title: "Iterations",
                control: SubBlockControl::Slider { min: 1, max: 1000 },
                condition: Some(SubBlockCondition {
                    field: "loopType",
                    equals: "for",
                }),
            },
            SubBlock {
                id: "collection",
                title: "Collection",
                control: SubBlockControl::LongInput,
                condition: Some(SubBlockCondition {
                    field: "loopType",
                    equals: "forEach",
                }),
            },
        ],
        tool_access: &[],
    },
    BlockConfig {
        block_type: "Parallel",
        name: "Parallel",
        category: BlockCategory::Control,
        description: "Fan a subgraph out over a collection concurrently",
        inputs: &[
            CatalogField {
                id: "collection",
                kind: FieldKind::Json,
                required: false,
                description: "Collection to distribute across branches",
            },
            CatalogField {
                id: "count",
                kind: FieldKind::Integer,
                required: false,
                description: "Fixed branch count when no collection is given",
            },
            CatalogField {
                id: "maxConcurrency",
                kind: FieldKind::Integer,
                required: false,
                description: "Upper bound on concurrently running branches",
            },
        ],
        outputs: &[CatalogField {
            id: "results",
            kind: FieldKind::Json,
            required: true,
            description: "Branch outputs in input order",
        }],
        sub_blocks: &[
            SubBlock {
                id: "distribution",
                title: "Distribution",
                control: SubBlockControl::Dropdown {
                    options: &["collection", "count"],
                },
                condition: None,
            },
            SubBlock {
                id: "collection",
                title: "Collection",
                control: SubBlockControl::LongInput,
                condition: Some(SubBlockCondition {
                    field: "distribution",
                    equals: "collection",
                }),
            },
            SubBlock {
                id: "count",
                title: "Count",
                control: SubBlockControl::Slider { min: 1, max: 100 },
                condition: Some(SubBlockCondition {
                    field: "distribution",
                    equals: "count",
                }),
            },
            SubBlock {
                id: "maxConcurrency",
                title: "Max concurrency",
                control: SubBlockControl::Slider { min: 1, max: 50 },
                condition: None,
            },
        ],
        tool_access: &[],
    },
    BlockConfig {
        block_type: "Worker",
        name: "Worker",
        category: BlockCategory::Execution,
        description: "Invoke another worker as a single block",
        inputs: &[CatalogField {
            id: "workerId",
            kind: FieldKind::String,
            required: true,
            description: "Id of the child worker to invoke",
        }],
        outputs: &[
            CatalogField {
                id: "success",
                kind: FieldKind::Boolean,
                required: true,
                description: "Whether the child run succeeded",
            },
            CatalogField {
                id: "durationMs",
                kind: FieldKind::Integer,
                required: true,
                description: "Child run duration in milliseconds",
            },
            CatalogField {
                id: "output",
                kind: FieldKind::Json,
                required: true,
                description: "Child worker output",
            },
        ],
        sub_blocks: &[SubBlock {
            id: "workerId",
            title: "Worker",
            control: SubBlockControl::ShortInput,
            condition: None,
        }],
        tool_access: &["worker_executor"],
    },
    BlockConfig {
        block_type: "Response",
        name: "Response",
        category: BlockCategory::Output,
        description: "Terminal block - shapes the worker output",
        inputs: &[],
        outputs: &[CatalogField {
            id: "response",
            kind: FieldKind::Json,
            required: true,
            description: "Final worker output",
        }],
        sub_blocks: &[],
        tool_access: &[],
    },
];

/// Look up a block type in the catalog
pub fn lookup(block_type: &str) -> Option<&'static BlockConfig> {
    BLOCK_CATALOG.iter().find(|c| c.block_type == block_type)
}

/// All catalog entries
pub fn all() -> &'static [BlockConfig] {
    BLOCK_CATALOG
}
