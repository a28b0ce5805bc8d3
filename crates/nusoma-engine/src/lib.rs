// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker validation and execution engine.
//!
//! The engine sits between the DSL ([`nusoma_dsl`]) and the tool layer
//! ([`nusoma_tools`]): it validates worker graphs, then walks them block by
//! block. The [`Executor`] is the single entry point for running workers;
//! it never returns an `Err`, every outcome is an [`ExecutionResult`].

pub mod conditions;
pub mod context;
pub mod error;
pub mod executor;
pub mod result;
pub mod store;
pub mod validation;

pub use context::RunContext;
pub use error::EngineError;
pub use executor::{Executor, ExecutorOptions};
pub use result::{BlockLog, ExecutionMetadata, ExecutionResult};
pub use store::{InMemoryWorkerStore, WorkerStore};
pub use validation::{ValidationError, ValidationResult, ValidationWarning, validate_graph, validate_worker};
