// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP server: router, shared state, health and introspection handlers

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::detect_car::{detect_car_handler, detect_car_simple_handler};
use super::errors::ApiError;
use crate::vision::model_manager::{DetectorManager, ModelInfo};

/// Uploads above this size are rejected outright by the body limit layer.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// State shared by all handlers: the read-only detector handle.
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<DetectorManager>,
}

impl AppState {
    pub fn new(detector: Arc<DetectorManager>) -> Self {
        Self { detector }
    }
}

/// Payload of GET /
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub message: String,
    pub status: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/", get(root_handler))
        // Model introspection
        .route("/model-info", get(model_info_handler))
        // Detection endpoints
        .route("/detect-car", post(detect_car_handler))
        .route("/detect-car-simple", post(detect_car_simple_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// GET / - liveness, available even when the model failed to load
async fn root_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Car Detection API is running".to_string(),
        status: "healthy".to_string(),
    })
}

/// GET /model-info - identity and vocabulary of the loaded model
async fn model_info_handler(
    State(state): State<AppState>,
) -> Result<Json<ModelInfo>, ApiError> {
    match state.detector.model_info() {
        Some(info) => Ok(Json(info)),
        None => Err(ApiError::ModelNotLoaded),
    }
}
