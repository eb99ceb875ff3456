// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! DETR object-detection adapter backed by ONNX Runtime
//!
//! Wraps an ONNX export of the DETR ResNet-50 checkpoint. Given a decoded
//! RGB image and the configured confidence threshold, `detect` returns raw
//! detections with boxes rescaled to the original pixel dimensions. The
//! model internally works on a resized copy; DETR emits boxes normalized to
//! [0, 1], so scaling by the original width/height restores original-space
//! coordinates.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::{Array4, ArrayViewD};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::detection::RawDetection;
use crate::vision::labels::LabelVocabulary;

/// Shortest image side is resized to this before inference.
const RESIZE_SHORTEST: u32 = 800;

/// Cap on the longest side after resizing.
const RESIZE_LONGEST: u32 = 1333;

/// ImageNet channel normalization used by the DETR image processor.
const NORM_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const NORM_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Car detection model (DETR ResNet-50, ONNX)
///
/// The session is shared process-wide behind a `Mutex`: ONNX Runtime runs
/// need exclusive access, so concurrent requests serialize here. That
/// serialization is internal to the adapter and invisible to callers.
pub struct CarDetector {
    session: Mutex<Session>,
    vocabulary: LabelVocabulary,
    confidence_threshold: f32,
}

impl std::fmt::Debug for CarDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CarDetector")
            .field("vocabulary_len", &self.vocabulary.len())
            .field("confidence_threshold", &self.confidence_threshold)
            .finish_non_exhaustive()
    }
}

impl CarDetector {
    /// Load the ONNX model from disk and validate its output shapes.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The model file is missing or invalid
    /// - ONNX Runtime initialization fails
    /// - The model does not produce DETR-shaped outputs
    pub fn load(model_path: &Path, confidence_threshold: f32) -> Result<Self> {
        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found: {}", model_path.display());
        }

        info!(
            "Initializing DETR detection session from {}",
            model_path.display()
        );
        let mut session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let vocabulary = LabelVocabulary::coco();

        // Validate output shapes with a dummy inference. Wrap in a block so
        // the outputs are dropped before the session is moved.
        {
            let dummy = Array4::<f32>::zeros((1, 3, 64, 64));
            let outputs = session
                .run(ort::inputs!["pixel_values" => Value::from_array(dummy)?])
                .context("Validation inference failed")?;

            let logits = outputs["logits"]
                .try_extract_array::<f32>()
                .context("Failed to extract logits tensor")?;
            let shape = logits.shape();
            // DETR logits: [batch, queries, classes + no-object]
            if shape.len() != 3 || shape[2] != vocabulary.len() + 1 {
                anyhow::bail!(
                    "Model outputs unexpected logits shape: {:?} (expected [batch, queries, {}])",
                    shape,
                    vocabulary.len() + 1
                );
            }

            let boxes = outputs["pred_boxes"]
                .try_extract_array::<f32>()
                .context("Failed to extract pred_boxes tensor")?;
            if boxes.shape().len() != 3 || boxes.shape()[2] != 4 {
                anyhow::bail!(
                    "Model outputs unexpected pred_boxes shape: {:?} (expected [batch, queries, 4])",
                    boxes.shape()
                );
            }
        }

        info!("✅ DETR detection model loaded");

        Ok(Self {
            session: Mutex::new(session),
            vocabulary,
            confidence_threshold,
        })
    }

    /// Run detection on a decoded image.
    ///
    /// Returns raw detections in model query order, each with
    /// `confidence >= confidence_threshold` and the box in original-image
    /// xyxy pixel coordinates. Application-level label filtering happens
    /// downstream.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<RawDetection>> {
        let (width, height) = image.dimensions();
        let tensor = preprocess(image);
        debug!(
            "Running inference: {}x{} image, tensor {:?}",
            width,
            height,
            tensor.shape()
        );

        let mut session = self.session.lock().unwrap();
        let outputs = session
            .run(ort::inputs!["pixel_values" => Value::from_array(tensor)?])
            .context("Inference failed")?;

        let logits = outputs["logits"]
            .try_extract_array::<f32>()
            .context("Failed to extract logits tensor")?;
        let boxes = outputs["pred_boxes"]
            .try_extract_array::<f32>()
            .context("Failed to extract pred_boxes tensor")?;

        postprocess(logits, boxes, width, height, self.confidence_threshold)
    }

    /// The fixed vocabulary of the loaded model.
    pub fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }
}

/// Resize to the model's working resolution and normalize into an NCHW
/// float tensor.
fn preprocess(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let (target_w, target_h) = inference_size(width, height);
    let resized = image::imageops::resize(image, target_w, target_h, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, target_h as usize, target_w as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 / 255.0 - NORM_MEAN[c]) / NORM_STD[c];
        }
    }
    tensor
}

/// Working resolution: shortest side scaled to `RESIZE_SHORTEST`, shrunk
/// further if the longest side would exceed `RESIZE_LONGEST`.
fn inference_size(width: u32, height: u32) -> (u32, u32) {
    let short = width.min(height) as f32;
    let long = width.max(height) as f32;

    let mut scale = RESIZE_SHORTEST as f32 / short;
    if long * scale > RESIZE_LONGEST as f32 {
        scale = RESIZE_LONGEST as f32 / long;
    }

    let target_w = ((width as f32 * scale).round() as u32).max(1);
    let target_h = ((height as f32 * scale).round() as u32).max(1);
    (target_w, target_h)
}

/// Decode DETR outputs into threshold-filtered raw detections.
///
/// For each query: softmax over the class logits, drop the trailing
/// no-object class, keep the best remaining class when its probability
/// meets the threshold. Boxes arrive as normalized (cx, cy, w, h) and leave
/// as original-image (x1, y1, x2, y2).
fn postprocess(
    logits: ArrayViewD<f32>,
    boxes: ArrayViewD<f32>,
    width: u32,
    height: u32,
    threshold: f32,
) -> Result<Vec<RawDetection>> {
    let logits_shape = logits.shape();
    let boxes_shape = boxes.shape();
    if logits_shape.len() != 3
        || logits_shape[2] < 2
        || boxes_shape.len() != 3
        || boxes_shape[2] != 4
    {
        anyhow::bail!(
            "Unexpected output shapes: logits {:?}, pred_boxes {:?}",
            logits_shape,
            boxes_shape
        );
    }

    let queries = logits_shape[1].min(boxes_shape[1]);
    let num_logits = logits_shape[2];
    // Trailing logit is the no-object class
    let num_classes = num_logits - 1;

    let width = width as f32;
    let height = height as f32;
    let mut detections = Vec::new();

    for q in 0..queries {
        let max_logit = (0..num_logits)
            .map(|c| logits[[0, q, c]])
            .fold(f32::NEG_INFINITY, f32::max);
        let exp_sum: f32 = (0..num_logits)
            .map(|c| (logits[[0, q, c]] - max_logit).exp())
            .sum();

        let (best_class, best_logit) = (0..num_classes)
            .map(|c| (c, logits[[0, q, c]]))
            .fold((0, f32::NEG_INFINITY), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });

        let confidence = (best_logit - max_logit).exp() / exp_sum;
        if confidence < threshold {
            continue;
        }

        let cx = boxes[[0, q, 0]];
        let cy = boxes[[0, q, 1]];
        let bw = boxes[[0, q, 2]];
        let bh = boxes[[0, q, 3]];

        let x1 = ((cx - bw / 2.0) * width).clamp(0.0, width);
        let y1 = ((cy - bh / 2.0) * height).clamp(0.0, height);
        let x2 = ((cx + bw / 2.0) * width).clamp(0.0, width);
        let y2 = ((cy + bh / 2.0) * height).clamp(0.0, height);

        detections.push(RawDetection {
            label_id: best_class,
            confidence,
            bbox: [x1, y1, x2, y2],
        });
    }

    Ok(detections)
}
