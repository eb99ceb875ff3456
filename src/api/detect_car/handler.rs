// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Car detection endpoint handlers

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use tracing::{debug, info, warn};

use super::response::{DetectCarResponse, DetectCarSimpleResponse, ModelSummary};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::detection::{filter_cars, DetectionResult};
use crate::vision::image_utils::load_rgb_image;
use crate::vision::model_manager::DetectorState;

struct ImageUpload {
    filename: Option<String>,
    data: Vec<u8>,
}

/// POST /detect-car - Detect cars in an uploaded image
///
/// Accepts a multipart upload with a `file` field and returns the full
/// detection results.
///
/// # Errors
/// - 400 Bad Request: content type not image/*, or no usable `file` field
/// - 500 Internal Server Error: model not loaded, or processing failed
pub async fn detect_car_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DetectCarResponse>, ApiError> {
    let upload = read_image_upload(multipart).await?;
    let result = run_detection(&state, &upload).await?;

    info!(
        "Detected {} cars in {}",
        result.detections.len(),
        upload.filename.as_deref().unwrap_or("<unnamed upload>")
    );

    let model_info = ModelSummary {
        model_name: state.detector.model_name().to_string(),
        confidence_threshold: state.detector.confidence_threshold(),
    };
    Ok(Json(DetectCarResponse::new(
        upload.filename,
        result,
        model_info,
    )))
}

/// POST /detect-car-simple - Boolean-only car detection
///
/// Same upload contract and error cases as /detect-car, reduced response.
pub async fn detect_car_simple_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<DetectCarSimpleResponse>, ApiError> {
    let upload = read_image_upload(multipart).await?;
    let result = run_detection(&state, &upload).await?;

    Ok(Json(DetectCarSimpleResponse {
        filename: upload.filename,
        car_detected: result.has_cars,
    }))
}

/// Pull the `file` field out of the multipart body.
///
/// The content-type gate runs here, before the readiness check: a non-image
/// upload is a 400 regardless of whether the model loaded.
async fn read_image_upload(mut multipart: Multipart) -> Result<ImageUpload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidUpload(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        match field.content_type() {
            Some(content_type) if content_type.starts_with("image/") => {}
            _ => {
                warn!("Rejected upload with non-image content type");
                return Err(ApiError::NotAnImage);
            }
        }

        let filename = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidUpload(format!("Failed to read upload: {}", e)))?;

        return Ok(ImageUpload {
            filename,
            data: data.to_vec(),
        });
    }

    Err(ApiError::InvalidUpload(
        "No file field in upload".to_string(),
    ))
}

/// Decode, infer, filter. Readiness is checked first so nothing decodes
/// against an unloaded model.
async fn run_detection(state: &AppState, upload: &ImageUpload) -> Result<DetectionResult, ApiError> {
    let detector = match state.detector.state() {
        DetectorState::NotReady { reason } => {
            warn!("Detection request while model not loaded: {}", reason);
            return Err(ApiError::ModelNotLoaded);
        }
        DetectorState::Ready(detector) => detector.clone(),
    };

    let (image, image_info) = load_rgb_image(&upload.data).map_err(|e| {
        warn!("Failed to decode image: {}", e);
        ApiError::Processing(e.to_string())
    })?;
    debug!(
        "Decoded image: {}x{}, {} bytes",
        image_info.width, image_info.height, image_info.size_bytes
    );

    let raw_detections = detector.detect(&image).map_err(|e| {
        warn!("Inference failed: {:#}", e);
        ApiError::Processing(format!("{e:#}"))
    })?;

    filter_cars(&raw_detections, detector.vocabulary()).map_err(|e| {
        warn!("Label resolution failed: {}", e);
        ApiError::Processing(e.to_string())
    })
}
