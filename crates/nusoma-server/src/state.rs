// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared application state.

use crate::config::ServerConfig;
use dashmap::DashMap;
use nusoma_engine::{Executor, ExecutorOptions, InMemoryWorkerStore, WorkerStore};
use nusoma_tools::{InvokeContext, ToolRegistry};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn WorkerStore>,
    pub tools: Arc<ToolRegistry>,
    pub executor: Arc<Executor>,
    /// Key-value memory backing the memory tools
    pub memory: Arc<DashMap<String, Value>>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let store: Arc<dyn WorkerStore> = Arc::new(InMemoryWorkerStore::new());
        let tools = Arc::new(ToolRegistry::new());

        // Internal tools (memory, worker calls) loop back to this server
        // authenticated as the first configured key.
        let tool_ctx = InvokeContext {
            base_url: config.base_url.clone(),
            api_key: config.api_keys.first().map(|k| k.key.clone()),
        };

        let options = ExecutorOptions {
            max_worker_depth: config.max_worker_depth,
            default_timeout_ms: config.default_timeout_ms,
            ..Default::default()
        };

        let executor = Arc::new(
            Executor::new(Arc::clone(&store), Arc::clone(&tools))
                .with_tool_context(tool_ctx)
                .with_options(options),
        );

        Self {
            config: Arc::new(config),
            store,
            tools,
            executor,
            memory: Arc::new(DashMap::new()),
            started_at: Instant::now(),
        }
    }
}
