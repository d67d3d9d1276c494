//! hectord - HTTP detection service
//!
//! This daemon:
//! 1. Loads configuration (`HECTOR_CONFIG` + `HECTOR_*` overrides)
//! 2. Provisions and loads both detection models
//! 3. Serves the detection API until Ctrl-C

use anyhow::{anyhow, Result};
use std::sync::{mpsc, Arc};

use hector::{
    api::{ApiConfig, ApiServer},
    config::HectorConfig,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = HectorConfig::load()?;
    let configured = config.pipeline.configure()?;
    log::info!(
        "loading models {} and {} with {} backend",
        configured.general.name,
        configured.face.name,
        configured.backend.as_str()
    );
    let pipeline = Arc::new(configured.load()?);

    let api_config = ApiConfig {
        addr: config.api_addr.clone(),
        max_upload_bytes: config.max_upload_bytes,
    };
    let api_handle = ApiServer::new(api_config, pipeline).spawn()?;
    log::info!("detection api listening on {}", api_handle.addr);

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|e| anyhow!("error setting Ctrl-C handler: {}", e))?;

    log::info!("hectord waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping API server...");
    api_handle.stop()?;

    Ok(())
}
