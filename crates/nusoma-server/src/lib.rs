// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP API server for nusoma.
//!
//! Exposes the block catalog, tool registry, worker CRUD, validation and
//! execution, and the key-value memory the memory tools call back into.
//! Authentication is bearer API keys configured through the environment.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use config::ServerConfig;
pub use router::build_router;
pub use state::AppState;
