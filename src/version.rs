// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Car Detection Node

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-detr-car-detection-2026-08-07";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2026-08-07";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "detr-resnet-50",
    "onnx-cpu-inference",
    "multipart-upload",
    "car-filter",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Car Detection Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}
