// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tool registry: id-keyed lookup over tool descriptors

use crate::builtin::builtin_tools;
use crate::config::ToolConfig;
use std::collections::HashMap;

/// Registry of tool descriptors, seeded with the built-ins.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Registry containing only the built-in tools
    pub fn new() -> Self {
        let mut tools = HashMap::new();
        for tool in builtin_tools() {
            tools.insert(tool.id.clone(), tool);
        }
        Self { tools }
    }

    /// Empty registry (tests and embedding)
    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a descriptor, replacing any existing one with the same id.
    /// Returns the replaced descriptor if there was one.
    pub fn register(&mut self, tool: ToolConfig) -> Option<ToolConfig> {
        self.tools.insert(tool.id.clone(), tool)
    }

    /// Look up a tool by id
    pub fn get(&self, id: &str) -> Option<&ToolConfig> {
        self.tools.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }

    /// All descriptors, sorted by id for stable API output
    pub fn all(&self) -> Vec<&ToolConfig> {
        let mut tools: Vec<&ToolConfig> = self.tools.values().collect();
        tools.sort_by(|a, b| a.id.cmp(&b.id));
        tools
    }

    /// All registered tool ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
