//! Model weight provisioning.
//!
//! Weights are expected on local disk. When a file is missing and a download
//! base URL is configured, it is fetched once (feature `model-download`).
//! There are no retries; a failed fetch is a model load error for this call.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::detect::ModelSpec;
use crate::error::{HectorError, Result};

#[cfg(feature = "model-download")]
const MAX_WEIGHTS_BYTES: u64 = 512 * 1024 * 1024;

/// Make sure the weights for `spec` exist locally and match the expected checksum.
pub fn ensure_weights(spec: &ModelSpec, download_base_url: Option<&str>) -> Result<()> {
    let path = &spec.weights_path;
    if !path.is_file() {
        match download_base_url {
            Some(base) => download(spec, base)?,
            None => {
                return Err(HectorError::model_load(
                    &spec.name,
                    path,
                    "weights file not found and no download url configured",
                ))
            }
        }
    }
    if let Some(expected) = &spec.sha256 {
        verify_checksum(spec, path, expected)?;
    }
    Ok(())
}

/// Hex-encoded SHA-256 of a file.
pub fn file_sha256(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn verify_checksum(spec: &ModelSpec, path: &Path, expected: &str) -> Result<()> {
    let actual = file_sha256(path).map_err(|e| HectorError::model_load(&spec.name, path, e))?;
    if actual != expected {
        return Err(HectorError::model_load(
            &spec.name,
            path,
            format!("checksum mismatch: expected {}, found {}", expected, actual),
        ));
    }
    Ok(())
}

#[cfg(feature = "model-download")]
fn download(spec: &ModelSpec, base_url: &str) -> Result<()> {
    use std::io::Read;

    let url = format!("{}/{}", base_url.trim_end_matches('/'), spec.file_name());
    let path = &spec.weights_path;
    log::info!("downloading model {} from {}", spec.name, url);

    let response = ureq::get(&url)
        .call()
        .map_err(|e| HectorError::model_load(&spec.name, path, format!("download failed: {e}")))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_WEIGHTS_BYTES)
        .read_to_end(&mut bytes)
        .map_err(|e| HectorError::model_load(&spec.name, path, e))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| HectorError::model_load(&spec.name, path, e))?;
    }
    // Only complete downloads appear at the final path.
    let partial = path.with_extension("onnx.partial");
    std::fs::write(&partial, &bytes).map_err(|e| HectorError::model_load(&spec.name, path, e))?;
    std::fs::rename(&partial, path).map_err(|e| HectorError::model_load(&spec.name, path, e))?;
    log::info!("download complete: {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

#[cfg(not(feature = "model-download"))]
fn download(spec: &ModelSpec, _base_url: &str) -> Result<()> {
    Err(HectorError::model_load(
        &spec.name,
        &spec.weights_path,
        "weights file not found; downloading requires the model-download feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_weights_without_url_is_model_load_error() {
        let dir = tempdir().unwrap();
        let spec = ModelSpec::general("yolov8n", dir.path()).unwrap();
        let err = ensure_weights(&spec, None).unwrap_err();
        assert!(matches!(err, HectorError::ModelLoad { .. }));
    }

    #[test]
    fn checksum_mismatch_is_reported_as_corrupt() {
        let dir = tempdir().unwrap();
        let spec = ModelSpec::face("yolov8n-face", dir.path())
            .unwrap()
            .with_sha256(Some("00".repeat(32)));
        std::fs::write(&spec.weights_path, b"not really onnx").unwrap();

        let err = ensure_weights(&spec, None).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn matching_checksum_passes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("yolov8s.onnx");
        std::fs::write(&path, b"weights").unwrap();
        let digest = file_sha256(&path).unwrap();

        let spec = ModelSpec::general("yolov8s", dir.path())
            .unwrap()
            .with_sha256(Some(digest.to_uppercase()));
        ensure_weights(&spec, None).unwrap();
    }
}
