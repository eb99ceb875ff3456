// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request-boundary error mapping
//!
//! Every failure a request can surface is a variant here; no internal error
//! escapes the boundary unmapped. Adding a failure kind means adding a
//! variant and its match arms, a compile-time decision rather than a
//! swallowed catch-all.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

/// JSON error body: `{"detail": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Multipart body without a readable `file` field
    InvalidUpload(String),
    /// Declared content type does not start with "image/"
    NotAnImage,
    /// Detection model failed its one-time load
    ModelNotLoaded,
    /// Decode, inference, or label resolution failed mid-pipeline
    Processing(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidUpload(_) | ApiError::NotAnImage => StatusCode::BAD_REQUEST,
            ApiError::ModelNotLoaded | ApiError::Processing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The `detail` string clients see.
    pub fn detail(&self) -> String {
        match self {
            ApiError::InvalidUpload(msg) => msg.clone(),
            ApiError::NotAnImage => "File must be an image".to_string(),
            ApiError::ModelNotLoaded => "Model not loaded".to_string(),
            ApiError::Processing(msg) => format!("Error processing image: {}", msg),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.detail())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            detail: self.detail(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
