// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Car filter and result formatting
//!
//! Takes the raw detections emitted by the model adapter and keeps only the
//! ones whose resolved label is exactly "car". The adapter has already
//! applied the confidence threshold, so the filter checks label identity
//! only. A deliberate pass-through: no re-sorting, no box deduplication.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vision::labels::LabelVocabulary;

/// The label a detection must resolve to. Exact, case-sensitive match; no
/// synonyms ("truck", "vehicle") are included.
pub const CAR_LABEL: &str = "car";

/// One prediction as emitted by the detection model adapter, with the box in
/// pixel coordinates of the original image (x1, y1, x2, y2).
///
/// Confidence has already been checked against the configured threshold by
/// the adapter before a `RawDetection` is produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub label_id: usize,
    pub confidence: f32,
    pub bbox: [f32; 4],
}

/// A detection that passed the car filter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CarDetection {
    /// Resolved label, always "car"
    pub label: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Bounding box in original-image pixel coordinates
    pub bbox: [f32; 4],
    /// Box layout tag, always "xyxy"
    pub bbox_format: String,
}

/// Per-request detection outcome
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionResult {
    pub has_cars: bool,
    /// Matching detections in the order the adapter produced them
    pub detections: Vec<CarDetection>,
}

/// A label id the vocabulary has no entry for. Defensive: a well-formed
/// adapter only emits in-vocabulary ids.
#[derive(Debug, Error, PartialEq)]
#[error("label id {0} has no entry in the model vocabulary")]
pub struct UnknownLabelError(pub usize);

/// Filter raw detections down to cars, preserving input order.
pub fn filter_cars(
    raw: &[RawDetection],
    vocabulary: &LabelVocabulary,
) -> Result<DetectionResult, UnknownLabelError> {
    let mut detections = Vec::new();

    for detection in raw {
        let label = vocabulary
            .name(detection.label_id)
            .ok_or(UnknownLabelError(detection.label_id))?;

        if label == CAR_LABEL {
            detections.push(CarDetection {
                label: label.to_string(),
                confidence: detection.confidence,
                bbox: detection.bbox,
                bbox_format: "xyxy".to_string(),
            });
        }
    }

    Ok(DetectionResult {
        has_cars: !detections.is_empty(),
        detections,
    })
}
