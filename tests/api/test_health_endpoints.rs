// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Tests for GET / and GET /model-info

use axum::body::Body;
use axum::http::{Request, StatusCode};
use car_detection_node::api::{router, AppState};
use car_detection_node::config::NodeConfig;
use car_detection_node::vision::DetectorManager;
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

fn state_not_ready() -> AppState {
    let config = NodeConfig::default();
    AppState::new(Arc::new(DetectorManager::not_ready(
        &config,
        "model failed to load",
    )))
}

async fn get(state: AppState, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");

    let response = router(state).oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Test 1: health check is available even when the model failed to load
#[tokio::test]
async fn test_health_always_available() {
    let (status, json) = get(state_not_ready(), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["message"], "Car Detection API is running");
}

/// Test 2: model-info reports the load failure as a uniform 500
#[tokio::test]
async fn test_model_info_not_ready() {
    let (status, json) = get(state_not_ready(), "/model-info").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["detail"], "Model not loaded");
}

/// Test 3: unknown routes are a plain 404
#[tokio::test]
async fn test_unknown_route() {
    let (status, _json) = get(state_not_ready(), "/no-such-route").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Test 4: model-info over a real model
#[tokio::test]
#[ignore] // Requires model files (set MODEL_PATH to a DETR ONNX export)
async fn test_model_info_with_real_model() {
    let config = NodeConfig {
        model_path: std::env::var("MODEL_PATH").ok().map(PathBuf::from),
        ..NodeConfig::default()
    };
    let manager = DetectorManager::load(&config).await;
    assert!(manager.is_ready(), "model must load for this test");

    let (status, json) = get(AppState::new(Arc::new(manager)), "/model-info").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["model_name"], config.model_id);
    assert_eq!(json["confidence_threshold"], 0.9);
    let labels = json["available_labels"].as_array().expect("labels array");
    assert_eq!(labels.len(), 91);
    assert_eq!(labels[3], "car");
}
