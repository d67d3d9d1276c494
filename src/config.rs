use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::yolo::YoloSettings;
use crate::pipeline::{BackendKind, PipelineConfig};

const DEFAULT_API_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct HectorConfigFile {
    api: Option<ApiConfigFile>,
    models: Option<ModelsConfigFile>,
    inference: Option<InferenceConfigFile>,
    render: Option<RenderConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ApiConfigFile {
    addr: Option<String>,
    max_upload_bytes: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelsConfigFile {
    dir: Option<PathBuf>,
    general: Option<String>,
    face: Option<String>,
    backend: Option<String>,
    download_base_url: Option<String>,
    general_sha256: Option<String>,
    face_sha256: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct InferenceConfigFile {
    confidence_threshold: Option<f32>,
    iou_threshold: Option<f32>,
    input_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RenderConfigFile {
    font_path: Option<PathBuf>,
}

/// Service configuration for `hectord`.
#[derive(Debug, Clone)]
pub struct HectorConfig {
    pub api_addr: String,
    pub max_upload_bytes: usize,
    pub pipeline: PipelineConfig,
}

impl HectorConfig {
    /// Load from the TOML file named by `HECTOR_CONFIG` (if set), then apply
    /// `HECTOR_*` environment overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("HECTOR_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: HectorConfigFile) -> Result<Self> {
        let defaults = PipelineConfig::default();
        let api = file.api.unwrap_or_default();
        let models = file.models.unwrap_or_default();
        let inference = file.inference.unwrap_or_default();
        let render = file.render.unwrap_or_default();

        let backend = match models.backend.as_deref() {
            Some(name) => BackendKind::parse(name)?,
            None => defaults.backend,
        };
        let yolo = YoloSettings {
            confidence_threshold: inference
                .confidence_threshold
                .unwrap_or(defaults.yolo.confidence_threshold),
            iou_threshold: inference
                .iou_threshold
                .unwrap_or(defaults.yolo.iou_threshold),
            input_size: inference.input_size.unwrap_or(defaults.yolo.input_size),
        };

        Ok(Self {
            api_addr: api.addr.unwrap_or_else(|| DEFAULT_API_ADDR.to_string()),
            max_upload_bytes: api.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            pipeline: PipelineConfig {
                models_dir: models.dir.unwrap_or(defaults.models_dir),
                general_model: models.general.unwrap_or(defaults.general_model),
                face_model: models.face.unwrap_or(defaults.face_model),
                backend,
                font_path: render.font_path,
                download_base_url: models.download_base_url,
                general_sha256: models.general_sha256,
                face_sha256: models.face_sha256,
                yolo,
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(addr) = non_empty_env("HECTOR_API_ADDR") {
            self.api_addr = addr;
        }
        if let Some(dir) = non_empty_env("HECTOR_MODELS_DIR") {
            self.pipeline.models_dir = PathBuf::from(dir);
        }
        if let Some(model) = non_empty_env("HECTOR_MODEL") {
            self.pipeline.general_model = model;
        }
        if let Some(backend) = non_empty_env("HECTOR_BACKEND") {
            self.pipeline.backend = BackendKind::parse(&backend)?;
        }
        if let Some(path) = non_empty_env("HECTOR_FONT_PATH") {
            self.pipeline.font_path = Some(PathBuf::from(path));
        }
        if let Some(url) = non_empty_env("HECTOR_MODEL_BASE_URL") {
            self.pipeline.download_base_url = Some(url);
        }
        if let Some(limit) = non_empty_env("HECTOR_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = limit
                .parse()
                .map_err(|_| anyhow!("HECTOR_MAX_UPLOAD_BYTES must be an integer number of bytes"))?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.max_upload_bytes == 0 {
            return Err(anyhow!("max_upload_bytes must be greater than zero"));
        }
        self.api_addr
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("invalid api address '{}'", self.api_addr))?;
        self.pipeline.configure()?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<HectorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
