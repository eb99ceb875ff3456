// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detector lifecycle: one-time load at startup and readiness tracking
//!
//! Model loading can fail (missing file, bad download, invalid ONNX graph)
//! without taking the process down: the manager then carries an explicit
//! `NotReady` state and every detection request gets a uniform "Model not
//! loaded" response. Readiness is a tagged enum, not a nullable handle, so
//! every entry point has to branch on it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::NodeConfig;
use crate::vision::detector::CarDetector;

/// Whether the detection capability finished its one-time initialization.
#[derive(Debug)]
pub enum DetectorState {
    NotReady { reason: String },
    Ready(Arc<CarDetector>),
}

/// Process-wide handle to the loaded (or failed-to-load) detector.
///
/// Shared read-only across all in-flight requests; the inference session
/// inside `CarDetector` does its own locking.
#[derive(Debug)]
pub struct DetectorManager {
    state: DetectorState,
    model_name: String,
    confidence_threshold: f32,
}

/// Payload of GET /model-info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub confidence_threshold: f32,
    pub available_labels: Vec<String>,
}

impl DetectorManager {
    /// Load the detection model once at startup.
    ///
    /// Never panics and never returns an error: a load failure is recovered
    /// into a `NotReady` state so the HTTP surface stays up.
    pub async fn load(config: &NodeConfig) -> Self {
        match Self::try_load(config).await {
            Ok(detector) => {
                info!("✅ Detection model {} ready", config.model_id);
                Self {
                    state: DetectorState::Ready(Arc::new(detector)),
                    model_name: config.model_id.clone(),
                    confidence_threshold: config.confidence_threshold,
                }
            }
            Err(e) => {
                warn!("⚠️ Failed to load detection model {}: {:#}", config.model_id, e);
                Self::not_ready(config, format!("{e:#}"))
            }
        }
    }

    /// Manager stuck in the unready state, as after a failed load.
    pub fn not_ready(config: &NodeConfig, reason: impl Into<String>) -> Self {
        Self {
            state: DetectorState::NotReady {
                reason: reason.into(),
            },
            model_name: config.model_id.clone(),
            confidence_threshold: config.confidence_threshold,
        }
    }

    async fn try_load(config: &NodeConfig) -> Result<CarDetector> {
        let model_file = resolve_model_file(config).await?;
        let threshold = config.confidence_threshold;

        // Session creation and the validation inference are blocking.
        tokio::task::spawn_blocking(move || CarDetector::load(&model_file, threshold))
            .await
            .context("Model load task failed")?
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, DetectorState::Ready(_))
    }

    /// Model metadata for introspection, `None` while not ready.
    pub fn model_info(&self) -> Option<ModelInfo> {
        match &self.state {
            DetectorState::NotReady { .. } => None,
            DetectorState::Ready(detector) => Some(ModelInfo {
                model_name: self.model_name.clone(),
                confidence_threshold: self.confidence_threshold,
                available_labels: detector.vocabulary().names().to_vec(),
            }),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }
}

/// Locate the ONNX model file: an explicit local path wins, otherwise the
/// export is fetched from the Hugging Face hub into its local cache.
async fn resolve_model_file(config: &NodeConfig) -> Result<PathBuf> {
    if let Some(path) = &config.model_path {
        if !path.exists() {
            anyhow::bail!("ONNX model file not found: {}", path.display());
        }
        return Ok(path.clone());
    }

    let repo = config.model_id.clone();
    info!("Fetching onnx/model.onnx from hub repo {}", repo);
    tokio::task::spawn_blocking(move || {
        let api = hf_hub::api::sync::Api::new().context("Failed to initialize hub client")?;
        api.model(repo.clone())
            .get("onnx/model.onnx")
            .with_context(|| format!("Failed to fetch onnx/model.onnx from {}", repo))
    })
    .await
    .context("Hub download task failed")?
}
