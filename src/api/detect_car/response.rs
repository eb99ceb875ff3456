// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Car detection response types

use serde::{Deserialize, Serialize};

use crate::detection::{CarDetection, DetectionResult};

/// Identity of the loaded model, echoed in detection responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSummary {
    pub model_name: String,
    pub confidence_threshold: f32,
}

/// Response from POST /detect-car
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectCarResponse {
    /// Uploaded filename, null when the client did not send one
    pub filename: Option<String>,
    pub has_cars: bool,
    pub car_count: usize,
    /// Matching detections in adapter order
    pub detections: Vec<CarDetection>,
    pub model_info: ModelSummary,
}

impl DetectCarResponse {
    pub fn new(filename: Option<String>, result: DetectionResult, model_info: ModelSummary) -> Self {
        Self {
            filename,
            has_cars: result.has_cars,
            car_count: result.detections.len(),
            detections: result.detections,
            model_info,
        }
    }
}

/// Response from POST /detect-car-simple
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectCarSimpleResponse {
    pub filename: Option<String>,
    pub car_detected: bool,
}
