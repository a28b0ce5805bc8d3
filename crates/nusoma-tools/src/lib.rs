// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tool layer for nusoma workers.
//!
//! Tools are declarative HTTP descriptors: a [`ToolConfig`] says which
//! params a tool takes and how to build the request; [`invoke`] executes
//! one against a live endpoint and normalizes the response. Failures are
//! structured [`ToolError`]s classified as transient or permanent so the
//! executor can make retry decisions.

pub mod builtin;
pub mod config;
pub mod error;
pub mod invoke;
pub mod registry;

pub use config::{
    HttpMethod, RequestConfig, ResponseTransform, ToolConfig, ToolOutput, ToolParam,
};
pub use error::{
    ErrorCategory, ErrorSeverity, ToolError, classify_http_status, http_error, network_error,
    timeout_error,
};
pub use invoke::{InvokeContext, invoke, transform_error};
pub use registry::ToolRegistry;
