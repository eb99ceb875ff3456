// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Label vocabulary for the detection model

/// Fixed mapping from a model's numeric class ids to human-readable names.
///
/// The vocabulary is owned by the loaded detector and never changes for the
/// lifetime of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelVocabulary {
    names: Vec<String>,
}

impl LabelVocabulary {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// The 91-entry COCO vocabulary of the DETR ResNet-50 checkpoint.
    ///
    /// Unused COCO ids keep their "N/A" placeholder so ids line up with the
    /// model's class logits.
    pub fn coco() -> Self {
        Self::new(COCO_LABELS.iter().map(|s| s.to_string()).collect())
    }

    /// Resolve a class id to its name, `None` if the id has no entry.
    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// All names in id order, "N/A" placeholders included.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// COCO id -> label table as shipped with facebook/detr-resnet-50.
const COCO_LABELS: &[&str] = &[
    "N/A",
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "N/A",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "N/A",
    "backpack",
    "umbrella",
    "N/A",
    "N/A",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "N/A",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "N/A",
    "dining table",
    "N/A",
    "N/A",
    "toilet",
    "N/A",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "N/A",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];
