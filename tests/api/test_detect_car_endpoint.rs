// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detection endpoint tests for POST /detect-car and POST /detect-car-simple
//!
//! These tests verify that the detection handlers correctly:
//! - Reject non-image uploads with 400 regardless of model readiness
//! - Return a uniform 500 "Model not loaded" while the model is unready
//! - Reject multipart bodies without a usable `file` field
//!
//! They run against a NotReady detector so no model files are needed; the
//! full-pipeline cases require a model and are #[ignore]d.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use car_detection_node::api::{router, AppState};
use car_detection_node::config::NodeConfig;
use car_detection_node::vision::DetectorManager;
use http_body_util::BodyExt;
use image::{DynamicImage, RgbImage};
use serde_json::Value;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "car-detection-test-boundary";

/// Helper: AppState whose model failed to load
fn state_not_ready() -> AppState {
    let config = NodeConfig::default();
    AppState::new(Arc::new(DetectorManager::not_ready(
        &config,
        "model failed to load",
    )))
}

/// Helper: minimal valid PNG bytes
fn tiny_png() -> Vec<u8> {
    let img = RgbImage::new(4, 4);
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode PNG");
    bytes
}

/// Helper: hand-built multipart body with a single field
fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// Helper: POST a single-field multipart upload and decode the JSON reply
async fn post_upload(
    state: AppState,
    uri: &str,
    field: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, filename, content_type, data)))
        .expect("build request");

    let response = router(state).oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let json = serde_json::from_slice(&bytes).expect("JSON body");
    (status, json)
}

/// Test 1: text/plain upload is a 400 even though the model is not loaded
#[tokio::test]
async fn test_non_image_rejected_regardless_of_readiness() {
    let (status, json) = post_upload(
        state_not_ready(),
        "/detect-car",
        "file",
        "notes.txt",
        "text/plain",
        b"not an image",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "File must be an image");
}

/// Test 2: unready model yields a uniform 500 before any decoding
#[tokio::test]
async fn test_model_not_loaded_full_endpoint() {
    let (status, json) = post_upload(
        state_not_ready(),
        "/detect-car",
        "file",
        "street.png",
        "image/png",
        &tiny_png(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["detail"], "Model not loaded");
}

/// Test 3: simple endpoint shares the unready behavior
#[tokio::test]
async fn test_model_not_loaded_simple_endpoint() {
    let (status, json) = post_upload(
        state_not_ready(),
        "/detect-car-simple",
        "file",
        "street.png",
        "image/png",
        &tiny_png(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["detail"], "Model not loaded");
}

/// Test 4: simple endpoint shares the content-type gate
#[tokio::test]
async fn test_simple_endpoint_rejects_non_image() {
    let (status, json) = post_upload(
        state_not_ready(),
        "/detect-car-simple",
        "file",
        "notes.txt",
        "text/plain",
        b"not an image",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["detail"], "File must be an image");
}

/// Test 5: multipart body without a `file` field is a 400
#[tokio::test]
async fn test_missing_file_field() {
    let (status, json) = post_upload(
        state_not_ready(),
        "/detect-car",
        "other",
        "street.png",
        "image/png",
        &tiny_png(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        json["detail"].as_str().unwrap_or_default().contains("file"),
        "detail should mention the file field: {json}"
    );
}

/// Test 6: full pipeline over a real model
#[tokio::test]
#[ignore] // Requires model files (set MODEL_PATH to a DETR ONNX export)
async fn test_detect_car_with_real_model() {
    let config = NodeConfig {
        model_path: std::env::var("MODEL_PATH").ok().map(PathBuf::from),
        ..NodeConfig::default()
    };
    let manager = DetectorManager::load(&config).await;
    assert!(manager.is_ready(), "model must load for this test");
    let state = AppState::new(Arc::new(manager));

    let (status, json) = post_upload(
        state,
        "/detect-car",
        "file",
        "blank.png",
        "image/png",
        &tiny_png(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["filename"], "blank.png");
    assert!(json["has_cars"].is_boolean());
    assert!(json["car_count"].is_number());
    assert!(json["detections"].is_array());
    assert_eq!(json["model_info"]["model_name"], config.model_id);
    // A blank image has no cars
    assert_eq!(json["has_cars"], false);
    assert_eq!(json["car_count"], 0);
}

/// Test 7: grayscale input decodes and flows through the full pipeline
#[tokio::test]
#[ignore] // Requires model files (set MODEL_PATH to a DETR ONNX export)
async fn test_grayscale_upload_with_real_model() {
    let config = NodeConfig {
        model_path: std::env::var("MODEL_PATH").ok().map(PathBuf::from),
        ..NodeConfig::default()
    };
    let manager = DetectorManager::load(&config).await;
    assert!(manager.is_ready(), "model must load for this test");
    let state = AppState::new(Arc::new(manager));

    let gray = image::GrayImage::new(32, 32);
    let mut bytes = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode PNG");

    let (status, json) = post_upload(
        state,
        "/detect-car-simple",
        "file",
        "gray.png",
        "image/png",
        &bytes,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["car_detected"], false);
}
