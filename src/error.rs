//! Error taxonomy for the detection pipeline.
//!
//! Every failure is fatal to the call that raised it and never to the
//! process: a failed `detect()` or `visualize()` leaves the loaded models
//! usable for the next call.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the detection and annotation pipeline.
#[derive(Error, Debug)]
pub enum HectorError {
    /// Invalid model selection or missing rendering resources at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Model weights are unavailable or corrupt.
    #[error("failed to load model '{model}' from {}: {reason}", path.display())]
    ModelLoad {
        model: String,
        path: PathBuf,
        reason: String,
    },

    /// The source image could not be read or decoded.
    #[error("failed to load image {source_id}: {reason}")]
    ImageLoad { source_id: String, reason: String },

    /// A detection's class label has no entry in the supplied color map.
    #[error("no color assigned for class label '{0}'")]
    MissingColor(String),

    /// A loaded detection source failed while running.
    #[error("inference failed in '{source_name}': {reason}")]
    Inference { source_name: String, reason: String },

    /// The annotated overlay could not be persisted.
    #[error("failed to write overlay to {}: {reason}", path.display())]
    ImageWrite { path: PathBuf, reason: String },
}

impl HectorError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn model_load(model: &str, path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ModelLoad {
            model: model.to_string(),
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn image_load(source_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::ImageLoad {
            source_id: source_id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn inference(source_name: &str, reason: impl ToString) -> Self {
        Self::Inference {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HectorError>;
