//! Known detection models and how their weights are located on disk.

use std::path::{Path, PathBuf};

use crate::detect::backend::SourceRole;
use crate::error::{HectorError, Result};

/// General-purpose detectors that may be selected.
pub const GENERAL_MODELS: &[&str] = &["yolov8n", "yolov8s", "yolov8m"];

pub const DEFAULT_GENERAL_MODEL: &str = "yolov8s";

pub const FACE_MODEL: &str = "yolov8n-face";

pub const FACE_LABELS: &[&str] = &["face"];

/// COCO class names, in model output order.
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

/// A resolved model: which weights to load and how to name its classes.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelSpec {
    pub name: String,
    pub role: SourceRole,
    pub weights_path: PathBuf,
    pub labels: Vec<String>,
    /// Expected SHA-256 of the weights file, hex encoded.
    pub sha256: Option<String>,
}

impl ModelSpec {
    /// Resolve a general detector by name. Unknown names are rejected.
    pub fn general(name: &str, models_dir: &Path) -> Result<Self> {
        if !GENERAL_MODELS.contains(&name) {
            return Err(HectorError::configuration(format!(
                "invalid model name '{}'; choose from: {}",
                name,
                GENERAL_MODELS.join(", ")
            )));
        }
        Ok(Self::resolve(name, SourceRole::General, models_dir, COCO_CLASSES))
    }

    /// Resolve the face detector. Only the catalogued face model is accepted.
    pub fn face(name: &str, models_dir: &Path) -> Result<Self> {
        if name != FACE_MODEL {
            return Err(HectorError::configuration(format!(
                "invalid face model name '{}'; expected {}",
                name, FACE_MODEL
            )));
        }
        Ok(Self::resolve(name, SourceRole::Face, models_dir, FACE_LABELS))
    }

    pub fn with_sha256(mut self, sha256: Option<String>) -> Self {
        self.sha256 = sha256.map(|hash| hash.trim().to_lowercase());
        self
    }

    /// File name of the weights, e.g. `yolov8s.onnx`.
    pub fn file_name(&self) -> String {
        weights_file_name(&self.name)
    }

    fn resolve(name: &str, role: SourceRole, models_dir: &Path, labels: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            role,
            weights_path: models_dir.join(weights_file_name(name)),
            labels: labels.iter().map(|label| label.to_string()).collect(),
            sha256: None,
        }
    }
}

fn weights_file_name(model: &str) -> String {
    format!("{model}.onnx")
}
