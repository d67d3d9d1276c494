//! HTTP boundary for the detection pipeline.
//!
//! Routes:
//! - `GET /health`
//! - `POST /actions/object_detection/detect_generic_objects_from_image`
//!
//! The detection route answers `200` with either `{"detections": [...]}` or
//! `{"error": "..."}`; clients distinguish the two by key, not by status.

pub mod multipart;

use crate::pipeline::Pipeline;
use anyhow::{anyhow, Result};
use serde_json::json;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

pub const DETECT_PATH: &str = "/actions/object_detection/detect_generic_objects_from_image";

const MAX_HEADER_BYTES: usize = 8192;
const READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    pipeline: Arc<Pipeline>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, pipeline: Arc<Pipeline>) -> Self {
        Self { cfg, pipeline }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let cfg = self.cfg.clone();
        let pipeline = self.pipeline.clone();
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, cfg, pipeline, shutdown_thread) {
                log::error!("detection api stopped: {}", err);
            }
        });

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(
    listener: TcpListener,
    cfg: ApiConfig,
    pipeline: Arc<Pipeline>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let cfg = Arc::new(cfg);
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                let pipeline = pipeline.clone();
                let cfg = cfg.clone();
                std::thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, &pipeline, &cfg) {
                        log::warn!("request from {} rejected: {}", peer, err);
                    }
                });
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, pipeline: &Pipeline, cfg: &ApiConfig) -> Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(READ_TIMEOUT))?;

    let head = read_head(&mut stream)?;
    match (head.method.as_str(), head.path.as_str()) {
        ("GET", "/health") => write_json_response(&mut stream, 200, &json!({"status": "ok"})),
        (_, "/health") => write_json_response(
            &mut stream,
            405,
            &json!({"error": "method_not_allowed"}),
        ),
        ("POST", DETECT_PATH) => {
            let content_length = head.content_length()?;
            if content_length > cfg.max_upload_bytes {
                write_json_response(&mut stream, 413, &json!({"error": "payload_too_large"}))?;
                return Err(anyhow!(
                    "upload of {} bytes exceeds limit of {}",
                    content_length,
                    cfg.max_upload_bytes
                ));
            }
            if head.expects_continue() {
                stream.write_all(b"HTTP/1.1 100 Continue\r\n\r\n")?;
            }
            let body = read_body(&mut stream, head.body_prefix, content_length)?;
            let payload = match detect_upload(pipeline, head.headers.get("content-type"), &body) {
                Ok(detections) => json!({ "detections": detections }),
                Err(err) => {
                    log::warn!("detection request failed: {:#}", err);
                    json!({ "error": format!("An error occurred: {}", err) })
                }
            };
            write_json_response(&mut stream, 200, &payload)
        }
        (_, DETECT_PATH) => write_json_response(
            &mut stream,
            405,
            &json!({"error": "method_not_allowed"}),
        ),
        _ => write_json_response(&mut stream, 404, &json!({"error": "not_found"})),
    }
}

fn detect_upload(
    pipeline: &Pipeline,
    content_type: Option<&String>,
    body: &[u8],
) -> Result<crate::detect::DetectionResult> {
    let boundary = content_type.and_then(|value| multipart::boundary(value));
    let detections = match boundary {
        Some(boundary) => {
            let parts = multipart::parse(body, &boundary)?;
            let part = multipart::image_part(&parts)
                .ok_or_else(|| anyhow!("upload has no image field"))?;
            let source_id = part.filename.as_deref().unwrap_or("upload");
            pipeline.detect_bytes(part.data, source_id)?
        }
        None => pipeline.detect_bytes(body, "upload")?,
    };
    Ok(detections)
}

#[derive(Debug)]
struct RequestHead {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    /// Body bytes that arrived together with the headers.
    body_prefix: Vec<u8>,
}

impl RequestHead {
    fn content_length(&self) -> Result<usize> {
        match self.headers.get("content-length") {
            Some(value) => value
                .parse()
                .map_err(|_| anyhow!("invalid content-length '{}'", value)),
            None => Ok(0),
        }
    }

    fn expects_continue(&self) -> bool {
        self.headers
            .get("expect")
            .is_some_and(|value| value.eq_ignore_ascii_case("100-continue"))
    }
}

fn read_head(stream: &mut TcpStream) -> Result<RequestHead> {
    let mut buf = [0u8; 4096];
    let mut data = Vec::new();
    let header_end = loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before headers completed"));
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(idx) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break idx;
        }
        if data.len() > MAX_HEADER_BYTES {
            return Err(anyhow!("request headers too large"));
        }
    };

    let text = String::from_utf8_lossy(&data[..header_end]);
    let mut lines = text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }
    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(RequestHead {
        method: method.to_string(),
        path,
        headers,
        body_prefix: data[header_end + 4..].to_vec(),
    })
}

fn read_body(stream: &mut TcpStream, prefix: Vec<u8>, content_length: usize) -> Result<Vec<u8>> {
    let mut body = prefix;
    body.truncate(content_length);
    if body.len() < content_length {
        let remaining = content_length - body.len();
        let mut rest = Vec::with_capacity(remaining);
        stream
            .take(remaining as u64)
            .read_to_end(&mut rest)?;
        body.extend_from_slice(&rest);
    }
    if body.len() != content_length {
        return Err(anyhow!(
            "request body truncated: expected {} bytes, received {}",
            content_length,
            body.len()
        ));
    }
    Ok(body)
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &serde_json::Value) -> Result<()> {
    let payload = serde_json::to_vec(body)?;
    write_response(stream, status, "application/json", &payload)
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        413 => "HTTP/1.1 413 Payload Too Large",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}
