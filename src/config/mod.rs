// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Startup configuration
//!
//! Everything is fixed at process start and shared read-only afterwards.
//! Values come from environment variables with defaults; there is no config
//! file surface.

use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Hub repo of the ONNX export of facebook/detr-resnet-50.
pub const DEFAULT_MODEL_ID: &str = "Xenova/detr-resnet-50";

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.9;

pub const DEFAULT_API_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Model identifier, reported by /model-info and used as the hub repo
    /// when no local path is given.
    pub model_id: String,
    /// Local ONNX file overriding the hub fetch.
    pub model_path: Option<PathBuf>,
    /// Minimum confidence a detection must reach, in (0, 1].
    pub confidence_threshold: f32,
    pub api_port: u16,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            model_path: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            api_port: DEFAULT_API_PORT,
        }
    }
}

impl NodeConfig {
    /// Read configuration from the environment, falling back to defaults on
    /// missing or unparsable values.
    pub fn from_env() -> Self {
        let model_id = env::var("MODEL_ID").unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());
        let model_path = env::var("MODEL_PATH").ok().map(PathBuf::from);
        let confidence_threshold = env::var("CONFIDENCE_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD);
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_API_PORT);

        Self {
            model_id,
            model_path,
            confidence_threshold,
            api_port,
        }
        .validated()
    }

    /// The threshold must sit in (0, 1]; anything else reverts to the
    /// default with a warning.
    fn validated(mut self) -> Self {
        if !(self.confidence_threshold > 0.0 && self.confidence_threshold <= 1.0) {
            warn!(
                "Confidence threshold {} outside (0, 1], using default {}",
                self.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD
            );
            self.confidence_threshold = DEFAULT_CONFIDENCE_THRESHOLD;
        }
        self
    }
}
