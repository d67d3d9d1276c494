//! Hector object and face detection
//!
//! Runs a general-purpose object detector and a dedicated face detector over
//! the same image, merges their output into one list of detections, and
//! renders annotated overlays whose labels stay inside their boxes and the
//! canvas.
//!
//! # Module Structure
//!
//! - `detect`: detection sources, model catalogue, YOLO decoding, merging
//! - `visualize`: per-class colors, label fonts, box/label rendering
//! - `pipeline`: the two-phase `PipelineConfig` -> `Pipeline` facade
//! - `provision`: model weight acquisition and checksum verification
//! - `config`: `hectord` service configuration (TOML + `HECTOR_*` env)
//! - `api`: HTTP boundary serving the detection route

pub mod api;
pub mod config;
pub mod detect;
pub mod error;
pub mod pipeline;
pub mod provision;
pub mod visualize;

pub use detect::{
    DetectionResult, DetectionSource, ModelSpec, PixelBox, RawDetection, SourceRole, StubSource,
    UnifiedDetection,
};
pub use error::{HectorError, Result};
pub use pipeline::{
    BackendKind, ConfiguredPipeline, Overlay, Pipeline, PipelineConfig, VisualizeOptions,
};
pub use visualize::{ColorAssigner, ColorMap, GlyphFont, LabelFont, TextMetrics};
