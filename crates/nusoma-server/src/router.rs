// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Route table.

use crate::auth::require_api_key;
use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    let authed = Router::new()
        .route("/api/blocks", get(handlers::list_blocks))
        .route("/api/tools", get(handlers::list_tools))
        .route(
            "/api/workers",
            post(handlers::create_worker).get(handlers::list_workers),
        )
        .route(
            "/api/workers/{id}",
            get(handlers::get_worker).delete(handlers::delete_worker),
        )
        .route("/api/workers/{id}/validate", post(handlers::validate))
        .route("/api/workers/{id}/execute", post(handlers::execute))
        .route("/api/memory", post(handlers::memory_add))
        .route(
            "/api/memory/{key}",
            get(handlers::memory_get).delete(handlers::memory_delete),
        )
        .layer(from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/api/health", get(handlers::health))
        .merge(authed)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
