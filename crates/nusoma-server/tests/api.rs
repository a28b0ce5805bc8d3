// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! End-to-end API tests against an in-process router.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use nusoma_server::config::{ServerConfig, parse_api_keys};
use nusoma_server::{AppState, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;

const ALICE: &str = "alice-key";
const BOB: &str = "bob-key";

fn test_router() -> Router {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        api_keys: parse_api_keys(&format!("alice:{},bob:{}", ALICE, BOB)).unwrap(),
        base_url: "http://127.0.0.1:0".to_string(),
        max_worker_depth: 10,
        default_timeout_ms: 5_000,
    };
    build_router(AppState::new(config))
}

fn request(method: &str, uri: &str, key: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn echo_worker_body(id: &str) -> Value {
    json!({
        "id": id,
        "name": "Echo",
        "graph": {
            "blocks": {
                "start": { "blockType": "Start", "id": "start" },
                "response": {
                    "blockType": "Response",
                    "id": "response",
                    "inputMapping": {
                        "echoed": { "valueType": "reference", "value": "input.value" }
                    }
                }
            },
            "entryPoint": "start",
            "edges": [
                { "fromBlock": "start", "toBlock": "response" }
            ]
        }
    })
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let response = test_router()
        .oneshot(request("GET", "/api/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn test_missing_key_is_unauthorized() {
    let response = test_router()
        .oneshot(request("GET", "/api/workers", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body, json!({"error": "Unauthorized"}));
}

#[tokio::test]
async fn test_wrong_key_is_unauthorized() {
    let response = test_router()
        .oneshot(request("GET", "/api/workers", Some("nope"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_list_blocks() {
    let response = test_router()
        .oneshot(request("GET", "/api/blocks", Some(ALICE), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let types: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["blockType"].as_str().unwrap())
        .collect();
    assert!(types.contains(&"Tool"));
    assert!(types.contains(&"Parallel"));
}

#[tokio::test]
async fn test_list_tools() {
    let response = test_router()
        .oneshot(request("GET", "/api/tools", Some(ALICE), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"http_request"));
    assert!(ids.contains(&"worker_executor"));
}

// ============================================================================
// Workers
// ============================================================================

#[tokio::test]
async fn test_worker_crud_roundtrip() {
    let router = test_router();

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/api/workers",
            Some(ALICE),
            Some(echo_worker_body("w1")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["owner"], json!("alice"));

    let response = router
        .clone()
        .oneshot(request("GET", "/api/workers/w1", Some(ALICE), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(request("GET", "/api/workers", Some(ALICE), None))
        .await
        .unwrap();
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let response = router
        .clone()
        .oneshot(request("DELETE", "/api/workers/w1", Some(ALICE), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(request("GET", "/api/workers/w1", Some(ALICE), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_assigns_id_when_missing() {
    let mut body = echo_worker_body("ignored");
    body.as_object_mut().unwrap().remove("id");

    let response = test_router()
        .oneshot(request("POST", "/api/workers", Some(ALICE), Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert!(!created["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_rejects_malformed_graph() {
    let response = test_router()
        .oneshot(request(
            "POST",
            "/api/workers",
            Some(ALICE),
            Some(json!({"id": "bad", "name": "Bad"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("parse"));
}

#[tokio::test]
async fn test_other_principals_worker_is_forbidden() {
    let router = test_router();
    router
        .clone()
        .oneshot(request(
            "POST",
            "/api/workers",
            Some(ALICE),
            Some(echo_worker_body("w1")),
        ))
        .await
        .unwrap();

    let response = router
        .clone()
        .oneshot(request("GET", "/api/workers/w1", Some(BOB), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Bob's listing doesn't include Alice's worker
    let response = router
        .clone()
        .oneshot(request("GET", "/api/workers", Some(BOB), None))
        .await
        .unwrap();
    let listed = body_json(response).await;
    assert!(listed.as_array().unwrap().is_empty());

    // Bob can't overwrite it either
    let response = router
        .oneshot(request(
            "POST",
            "/api/workers",
            Some(BOB),
            Some(echo_worker_body("w1")),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ============================================================================
// Validation / Execution
// ============================================================================

#[tokio::test]
async fn test_validate_reports_errors() {
    let router = test_router();
    let broken = json!({
        "id": "broken",
        "name": "Broken",
        "graph": {
            "blocks": {
                "start": { "blockType": "Start", "id": "start" }
            },
            "entryPoint": "missing"
        }
    });
    router
        .clone()
        .oneshot(request("POST", "/api/workers", Some(ALICE), Some(broken)))
        .await
        .unwrap();

    let response = router
        .oneshot(request(
            "POST",
            "/api/workers/broken/validate",
            Some(ALICE),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], json!(false));
    assert!(body["errors"][0].as_str().unwrap().contains("[E001]"));
}

#[tokio::test]
async fn test_execute_returns_200_with_result() {
    let router = test_router();
    router
        .clone()
        .oneshot(request(
            "POST",
            "/api/workers",
            Some(ALICE),
            Some(echo_worker_body("echo")),
        ))
        .await
        .unwrap();

    let response = router
        .oneshot(request(
            "POST",
            "/api/workers/echo/execute",
            Some(ALICE),
            Some(json!({"input": {"value": 42}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["output"], json!({"response": {"echoed": 42}}));
    assert_eq!(body["metadata"]["workerId"], json!("echo"));
}

#[tokio::test]
async fn test_execute_failure_is_still_200() {
    let router = test_router();
    let broken = json!({
        "id": "broken",
        "name": "Broken",
        "graph": {
            "blocks": {
                "start": { "blockType": "Start", "id": "start" }
            },
            "entryPoint": "missing"
        }
    });
    router
        .clone()
        .oneshot(request("POST", "/api/workers", Some(ALICE), Some(broken)))
        .await
        .unwrap();

    let response = router
        .oneshot(request(
            "POST",
            "/api/workers/broken/execute",
            Some(ALICE),
            Some(json!({"input": {}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("validation"));
}

#[tokio::test]
async fn test_execute_unknown_worker_is_404() {
    let response = test_router()
        .oneshot(request(
            "POST",
            "/api/workers/ghost/execute",
            Some(ALICE),
            Some(json!({"input": {}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Memory
// ============================================================================

#[tokio::test]
async fn test_memory_crud() {
    let router = test_router();

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/api/memory",
            Some(ALICE),
            Some(json!({"key": "greeting", "value": {"text": "hello"}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(request("GET", "/api/memory/greeting", Some(ALICE), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["value"], json!({"text": "hello"}));

    let response = router
        .clone()
        .oneshot(request("DELETE", "/api/memory/greeting", Some(ALICE), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = router
        .oneshot(request("GET", "/api/memory/greeting", Some(ALICE), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
