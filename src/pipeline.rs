//! Detection pipeline facade.
//!
//! Lifecycle is two-phase: `PipelineConfig::configure()` validates the model
//! selection and resolves paths without touching the filesystem, then
//! `ConfiguredPipeline::load()` provisions weights and builds the inference
//! sessions. Tests skip both and hand stub sources to `Pipeline::from_sources`.
//!
//! A loaded `Pipeline` is shared across threads. Each model sits behind its own
//! mutex, so concurrent calls serialize per model rather than per pipeline.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageFormat, RgbImage};

use crate::detect::yolo::YoloSettings;
use crate::detect::{
    catalog, merge, DetectionResult, DetectionSource, ModelSpec, RawDetection, SourceRole,
    StubSource, UnifiedDetection,
};
use crate::error::{HectorError, Result};
use crate::visualize::{self, ColorAssigner, ColorMap, GlyphFont, LabelFont};

/// Suffix appended to the source path to name the persisted overlay.
pub const OVERLAY_SUFFIX: &str = "_visualized.jpg";

/// Inference backend used to run the models.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Empty stub sources; no weights are loaded.
    Stub,
    /// ONNX models run with tract (feature `backend-tract`).
    Tract,
}

impl BackendKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stub" => Ok(Self::Stub),
            "tract" => Ok(Self::Tract),
            other => Err(HectorError::configuration(format!(
                "unknown backend '{}'; expected stub or tract",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stub => "stub",
            Self::Tract => "tract",
        }
    }
}

/// User-facing pipeline settings, before validation.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub models_dir: PathBuf,
    pub general_model: String,
    pub face_model: String,
    pub backend: BackendKind,
    pub font_path: Option<PathBuf>,
    pub download_base_url: Option<String>,
    pub general_sha256: Option<String>,
    pub face_sha256: Option<String>,
    pub yolo: YoloSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            general_model: catalog::DEFAULT_GENERAL_MODEL.to_string(),
            face_model: catalog::FACE_MODEL.to_string(),
            backend: BackendKind::Tract,
            font_path: None,
            download_base_url: None,
            general_sha256: None,
            face_sha256: None,
            yolo: YoloSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate the model choice and resolve weight paths.
    pub fn configure(&self) -> Result<ConfiguredPipeline> {
        let general = ModelSpec::general(&self.general_model, &self.models_dir)?
            .with_sha256(self.general_sha256.clone());
        let face = ModelSpec::face(&self.face_model, &self.models_dir)?
            .with_sha256(self.face_sha256.clone());
        if self.yolo.input_size == 0 {
            return Err(HectorError::configuration("model input size must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.yolo.confidence_threshold)
            || !(0.0..=1.0).contains(&self.yolo.iou_threshold)
        {
            return Err(HectorError::configuration(
                "confidence and iou thresholds must be within [0, 1]",
            ));
        }
        Ok(ConfiguredPipeline {
            general,
            face,
            backend: self.backend,
            font_path: self.font_path.clone(),
            download_base_url: self.download_base_url.clone(),
            yolo: self.yolo,
        })
    }
}

/// A validated configuration, ready to load.
#[derive(Clone, Debug)]
pub struct ConfiguredPipeline {
    pub general: ModelSpec,
    pub face: ModelSpec,
    pub backend: BackendKind,
    pub font_path: Option<PathBuf>,
    pub download_base_url: Option<String>,
    pub yolo: YoloSettings,
}

impl ConfiguredPipeline {
    /// Acquire weights and construct both inference sessions.
    pub fn load(self) -> Result<Pipeline> {
        let font = GlyphFont::resolve(self.font_path.as_deref())?;
        let pipeline = match self.backend {
            BackendKind::Stub => {
                log::warn!("stub backend selected; detections will always be empty");
                Pipeline::from_sources(
                    StubSource::empty(&self.general.name, SourceRole::General),
                    StubSource::empty(&self.face.name, SourceRole::Face),
                )
            }
            BackendKind::Tract => self.load_tract()?,
        };
        Ok(match font {
            Some(font) => pipeline.with_font(font),
            None => {
                log::warn!("no label font available; visualize() will fail until one is configured");
                pipeline
            }
        })
    }

    #[cfg(feature = "backend-tract")]
    fn load_tract(&self) -> Result<Pipeline> {
        use crate::detect::TractSource;
        use crate::provision;

        let base_url = self.download_base_url.as_deref();
        provision::ensure_weights(&self.general, base_url)?;
        provision::ensure_weights(&self.face, base_url)?;

        let mut general = TractSource::load(&self.general, self.yolo)?;
        let mut face = TractSource::load(&self.face, self.yolo)?;
        general.warm_up()?;
        face.warm_up()?;
        Ok(Pipeline::from_sources(general, face))
    }

    #[cfg(not(feature = "backend-tract"))]
    fn load_tract(&self) -> Result<Pipeline> {
        Err(HectorError::configuration(
            "tract backend requires the backend-tract feature",
        ))
    }
}

/// Options for a single `visualize` call.
#[derive(Clone, Debug)]
pub struct VisualizeOptions {
    /// Colors to reuse. When `None` a fresh map is drawn for this call.
    pub colors: Option<ColorMap>,
    /// Seed for freshly drawn colors.
    pub seed: Option<u64>,
    pub font_scale: f32,
}

impl Default for VisualizeOptions {
    fn default() -> Self {
        Self {
            colors: None,
            seed: None,
            font_scale: visualize::DEFAULT_FONT_SCALE,
        }
    }
}

/// Rendered overlay and where it was written.
#[derive(Debug)]
pub struct Overlay {
    pub image: RgbImage,
    pub path: PathBuf,
    pub colors: ColorMap,
}

type SharedSource = Mutex<Box<dyn DetectionSource>>;

/// Loaded detection pipeline: a general detector and a face detector.
pub struct Pipeline {
    general: SharedSource,
    face: SharedSource,
    font: Option<Arc<dyn LabelFont>>,
}

impl Pipeline {
    pub fn from_sources<G, F>(general: G, face: F) -> Self
    where
        G: DetectionSource + 'static,
        F: DetectionSource + 'static,
    {
        Self {
            general: Mutex::new(Box::new(general)),
            face: Mutex::new(Box::new(face)),
            font: None,
        }
    }

    pub fn with_font<L: LabelFont + 'static>(mut self, font: L) -> Self {
        self.font = Some(Arc::new(font));
        self
    }

    /// Run both detectors and merge their output, general detections first.
    pub fn detect(&self, image: &DynamicImage) -> Result<DetectionResult> {
        let general = run_source(&self.general, image)?;
        let faces = run_source(&self.face, image)?;
        let merged = merge(&general, &faces);
        log::info!(
            "detected {} objects ({} general, {} faces)",
            merged.len(),
            general.len(),
            faces.len()
        );
        Ok(merged)
    }

    /// Decode `bytes` and run `detect`. `source_id` names the image in errors.
    pub fn detect_bytes(&self, bytes: &[u8], source_id: &str) -> Result<DetectionResult> {
        let image = decode_image(bytes, source_id)?;
        self.detect(&image)
    }

    pub fn detect_path(&self, path: &Path) -> Result<DetectionResult> {
        let image = open_image(path)?;
        self.detect(&image)
    }

    /// Draw `detections` over the image at `image_path` with fresh random colors
    /// (or `colors` when given) and write it to `<image_path>_visualized.jpg`.
    pub fn visualize(
        &self,
        image_path: &Path,
        detections: &[UnifiedDetection],
        colors: Option<&ColorMap>,
    ) -> Result<Overlay> {
        let options = VisualizeOptions {
            colors: colors.cloned(),
            ..VisualizeOptions::default()
        };
        self.visualize_with(image_path, detections, &options)
    }

    pub fn visualize_with(
        &self,
        image_path: &Path,
        detections: &[UnifiedDetection],
        options: &VisualizeOptions,
    ) -> Result<Overlay> {
        let font = self
            .font
            .as_ref()
            .ok_or_else(|| HectorError::configuration("no label font configured"))?;
        let image = open_image(image_path)?.to_rgb8();
        let colors = match &options.colors {
            Some(colors) => colors.clone(),
            None => ColorAssigner::from_seed_option(options.seed).assign(detections),
        };

        let annotated = visualize::render(
            &image,
            detections,
            &colors,
            font.as_ref(),
            options.font_scale,
        )?;

        let path = overlay_path(image_path);
        annotated
            .save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|e| HectorError::ImageWrite {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        log::info!("overlay written to {}", path.display());

        Ok(Overlay {
            image: annotated,
            path,
            colors,
        })
    }
}

/// `<image_path>_visualized.jpg`, next to the source image.
pub fn overlay_path(image_path: &Path) -> PathBuf {
    let mut name = image_path.as_os_str().to_owned();
    name.push(OVERLAY_SUFFIX);
    PathBuf::from(name)
}

pub fn decode_image(bytes: &[u8], source_id: &str) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| HectorError::image_load(source_id, e))
}

pub fn open_image(path: &Path) -> Result<DynamicImage> {
    let source_id = path.display().to_string();
    let reader = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| HectorError::image_load(&source_id, e))?;
    reader
        .decode()
        .map_err(|e| HectorError::image_load(source_id, e))
}

fn run_source(source: &SharedSource, image: &DynamicImage) -> Result<Vec<RawDetection>> {
    let mut guard = source.lock().map_err(|poisoned| {
        let guard = poisoned.into_inner();
        HectorError::inference(guard.name(), "model lock poisoned")
    })?;
    let detections = guard.infer(image)?;
    log::debug!(
        "{} detector {} returned {} detections",
        guard.role().as_str(),
        guard.name(),
        detections.len()
    );
    Ok(detections)
}
