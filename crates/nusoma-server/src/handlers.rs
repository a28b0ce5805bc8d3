// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request handlers.

use crate::auth::Principal;
use crate::error::ApiError;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Extension;
use nusoma_dsl::{Worker, catalog, parse_worker};
use nusoma_engine::validate_worker;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

// ============================================================================
// Health / Catalog
// ============================================================================

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptimeSecs": state.started_at.elapsed().as_secs(),
    }))
}

/// Static block catalog, as rendered by the canvas editor.
pub async fn list_blocks() -> Json<Value> {
    Json(json!(catalog::all()))
}

pub async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.tools.all()))
}

// ============================================================================
// Workers
// ============================================================================

/// Fetch a worker, enforcing ownership.
async fn fetch_owned(
    state: &AppState,
    principal: &Principal,
    worker_id: &str,
) -> Result<Worker, ApiError> {
    let worker = state
        .store
        .get(worker_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Worker '{}' not found", worker_id)))?;

    if worker.owner.as_deref() != Some(principal.0.as_str()) {
        return Err(ApiError::Forbidden);
    }
    Ok(worker)
}

pub async fn create_worker(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(mut body): Json<Value>,
) -> Result<(StatusCode, Json<Worker>), ApiError> {
    // Ids are optional on create
    if body.get("id").is_none()
        && let Some(map) = body.as_object_mut()
    {
        map.insert("id".to_string(), json!(uuid::Uuid::new_v4().to_string()));
    }

    let mut worker = parse_worker(&body).map_err(ApiError::Validation)?;
    worker.owner = Some(principal.0.clone());

    if let Some(existing) = state.store.get(&worker.id).await
        && existing.owner.as_deref() != Some(principal.0.as_str())
    {
        return Err(ApiError::Conflict(format!(
            "Worker '{}' already exists",
            worker.id
        )));
    }

    info!(worker_id = %worker.id, principal = %principal.0, "worker registered");
    state.store.put(worker.clone()).await;
    Ok((StatusCode::CREATED, Json(worker)))
}

pub async fn list_workers(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Json<Vec<Worker>> {
    let workers = state
        .store
        .list()
        .await
        .into_iter()
        .filter(|w| w.owner.as_deref() == Some(principal.0.as_str()))
        .collect();
    Json(workers)
}

pub async fn get_worker(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(worker_id): Path<String>,
) -> Result<Json<Worker>, ApiError> {
    fetch_owned(&state, &principal, &worker_id).await.map(Json)
}

pub async fn delete_worker(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(worker_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    fetch_owned(&state, &principal, &worker_id).await?;
    state.store.remove(&worker_id).await;
    info!(worker_id = %worker_id, "worker removed");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn validate(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(worker_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let worker = fetch_owned(&state, &principal, &worker_id).await?;
    let result = validate_worker(&worker, &state.tools, state.store.as_ref()).await;

    let errors: Vec<String> = result.errors.iter().map(|e| e.to_string()).collect();
    let warnings: Vec<String> = result.warnings.iter().map(|w| w.to_string()).collect();
    Ok(Json(json!({
        "valid": result.is_ok(),
        "errors": errors,
        "warnings": warnings,
    })))
}

#[derive(Debug, Deserialize, Default)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub input: Value,
}

/// Execute a worker. Responds 200 whether or not the run succeeded; the
/// outcome is in the body's `success` and `error` fields.
pub async fn execute(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(worker_id): Path<String>,
    body: Option<Json<ExecuteRequest>>,
) -> Result<Json<nusoma_engine::ExecutionResult>, ApiError> {
    fetch_owned(&state, &principal, &worker_id).await?;

    let input = body.map(|Json(b)| b.input).unwrap_or(Value::Null);
    let result = state.executor.execute(&worker_id, input).await;
    Ok(Json(result))
}

// ============================================================================
// Memory
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MemoryAddRequest {
    pub key: String,
    pub value: Value,
}

pub async fn memory_add(
    State(state): State<AppState>,
    Json(body): Json<MemoryAddRequest>,
) -> Result<Json<Value>, ApiError> {
    if body.key.is_empty() {
        return Err(ApiError::Validation("memory key must not be empty".to_string()));
    }
    state.memory.insert(body.key.clone(), body.value.clone());
    Ok(Json(json!({ "key": body.key, "value": body.value })))
}

pub async fn memory_get(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let value = state
        .memory
        .get(&key)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| ApiError::NotFound(format!("Memory key '{}' not found", key)))?;
    Ok(Json(json!({ "key": key, "value": value })))
}

pub async fn memory_delete(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .memory
        .remove(&key)
        .ok_or_else(|| ApiError::NotFound(format!("Memory key '{}' not found", key)))?;
    Ok(StatusCode::NO_CONTENT)
}
