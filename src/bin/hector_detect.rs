//! hector_detect - run detection over one image and print the result as JSON

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use hector::{
    detect::catalog, visualize::DEFAULT_FONT_SCALE, BackendKind, PipelineConfig,
    VisualizeOptions,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Image to analyze.
    image: PathBuf,
    /// General detector (yolov8n | yolov8s | yolov8m).
    #[arg(long, default_value = catalog::DEFAULT_GENERAL_MODEL)]
    model: String,
    /// Directory holding `<model>.onnx` weights.
    #[arg(long, env = "HECTOR_MODELS_DIR", default_value = "models")]
    models_dir: PathBuf,
    /// Face detector.
    #[arg(long, default_value = catalog::FACE_MODEL)]
    face_model: String,
    /// Base URL for fetching missing weights (feature `model-download`).
    #[arg(long, env = "HECTOR_MODEL_BASE_URL")]
    download_base_url: Option<String>,
    /// Inference backend (stub | tract).
    #[arg(long, default_value = "tract")]
    backend: String,
    /// Also write `<IMAGE>_visualized.jpg`.
    #[arg(long)]
    visualize: bool,
    /// Seed for overlay colors.
    #[arg(long)]
    seed: Option<u64>,
    /// TrueType/OpenType font for labels.
    #[arg(long, env = "HECTOR_FONT_PATH")]
    font: Option<PathBuf>,
    #[arg(long, default_value_t = DEFAULT_FONT_SCALE)]
    font_scale: f32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = PipelineConfig {
        models_dir: args.models_dir,
        general_model: args.model,
        face_model: args.face_model,
        backend: BackendKind::parse(&args.backend)?,
        font_path: args.font,
        download_base_url: args.download_base_url,
        ..PipelineConfig::default()
    };
    let pipeline = config
        .configure()?
        .load()
        .context("failed to load detection pipeline")?;

    let detections = pipeline
        .detect_path(&args.image)
        .with_context(|| format!("detection failed for {}", args.image.display()))?;
    println!("{}", serde_json::to_string_pretty(&detections)?);

    if args.visualize {
        let options = VisualizeOptions {
            colors: None,
            seed: args.seed,
            font_scale: args.font_scale,
        };
        let overlay = pipeline.visualize_with(&args.image, &detections, &options)?;
        eprintln!("overlay written to {}", overlay.path.display());
    }

    Ok(())
}
