use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use hector::config::HectorConfig;
use hector::BackendKind;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "HECTOR_CONFIG",
        "HECTOR_API_ADDR",
        "HECTOR_MODELS_DIR",
        "HECTOR_MODEL",
        "HECTOR_BACKEND",
        "HECTOR_FONT_PATH",
        "HECTOR_MODEL_BASE_URL",
        "HECTOR_MAX_UPLOAD_BYTES",
    ] {
        std::env::remove_var(key);
    }
}

fn config_file(toml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(toml.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_apply_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = HectorConfig::load().expect("load defaults");

    assert_eq!(cfg.api_addr, "127.0.0.1:8000");
    assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
    assert_eq!(cfg.pipeline.models_dir, PathBuf::from("models"));
    assert_eq!(cfg.pipeline.general_model, "yolov8s");
    assert_eq!(cfg.pipeline.face_model, "yolov8n-face");
    assert_eq!(cfg.pipeline.backend, BackendKind::Tract);
    assert_eq!(cfg.pipeline.yolo.confidence_threshold, 0.25);
    assert_eq!(cfg.pipeline.yolo.iou_threshold, 0.7);
    assert_eq!(cfg.pipeline.yolo.input_size, 640);
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        r#"
        [api]
        addr = "0.0.0.0:9000"
        max_upload_bytes = 2048

        [models]
        dir = "/srv/hector/models"
        general = "yolov8m"
        backend = "stub"
        general_sha256 = "ABCDEF"

        [inference]
        confidence_threshold = 0.4
        iou_threshold = 0.5

        [render]
        font_path = "/usr/share/fonts/label.ttf"
        "#,
    );

    std::env::set_var("HECTOR_CONFIG", file.path());
    std::env::set_var("HECTOR_MODEL", "yolov8n");
    std::env::set_var("HECTOR_MAX_UPLOAD_BYTES", "4096");
    std::env::set_var("HECTOR_MODEL_BASE_URL", "https://models.example.test/onnx");

    let cfg = HectorConfig::load().expect("load config");

    assert_eq!(cfg.api_addr, "0.0.0.0:9000");
    assert_eq!(cfg.max_upload_bytes, 4096);
    assert_eq!(cfg.pipeline.models_dir, PathBuf::from("/srv/hector/models"));
    assert_eq!(cfg.pipeline.general_model, "yolov8n");
    assert_eq!(cfg.pipeline.backend, BackendKind::Stub);
    assert_eq!(cfg.pipeline.general_sha256.as_deref(), Some("ABCDEF"));
    assert_eq!(cfg.pipeline.yolo.confidence_threshold, 0.4);
    assert_eq!(cfg.pipeline.yolo.iou_threshold, 0.5);
    assert_eq!(cfg.pipeline.yolo.input_size, 640);
    assert_eq!(
        cfg.pipeline.font_path,
        Some(PathBuf::from("/usr/share/fonts/label.ttf"))
    );
    assert_eq!(
        cfg.pipeline.download_base_url.as_deref(),
        Some("https://models.example.test/onnx")
    );

    clear_env();
}

#[test]
fn rejects_unknown_general_model() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("HECTOR_MODEL", "yolov5x");
    let err = HectorConfig::load().unwrap_err();
    assert!(err.to_string().contains("yolov5x"), "{err}");

    clear_env();
}

#[test]
fn rejects_unknown_config_keys() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = config_file(
        r#"
        [models]
        general = "yolov8s"
        weights = "elsewhere"
        "#,
    );
    std::env::set_var("HECTOR_CONFIG", file.path());
    assert!(HectorConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_invalid_env_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("HECTOR_MAX_UPLOAD_BYTES", "lots");
    assert!(HectorConfig::load().is_err());
    clear_env();

    std::env::set_var("HECTOR_MAX_UPLOAD_BYTES", "0");
    assert!(HectorConfig::load().is_err());
    clear_env();

    std::env::set_var("HECTOR_BACKEND", "onnxruntime");
    assert!(HectorConfig::load().is_err());
    clear_env();

    std::env::set_var("HECTOR_API_ADDR", "not-an-address");
    assert!(HectorConfig::load().is_err());
    clear_env();
}
