// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Bearer API key authentication.
//!
//! Every `/api` route except the health check goes through [`require_api_key`].
//! Rejection happens before any store access.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

/// The authenticated caller, injected as a request extension.
#[derive(Debug, Clone)]
pub struct Principal(pub String);

pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let principal = state
        .config
        .principal_for_key(key)
        .ok_or(ApiError::Unauthorized)?
        .to_string();

    request.extensions_mut().insert(Principal(principal));
    Ok(next.run(request).await)
}
