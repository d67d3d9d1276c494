//! Minimal `multipart/form-data` reader for single-file uploads.

use anyhow::{anyhow, Result};

/// One form field.
#[derive(Debug, PartialEq, Eq)]
pub struct Part<'a> {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub data: &'a [u8],
}

/// Extract `boundary` from a `multipart/form-data; boundary=...` header value.
pub fn boundary(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let media_type = params.next()?.trim();
    if !media_type.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    params
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Split a multipart body into its parts.
pub fn parse<'a>(body: &'a [u8], boundary: &str) -> Result<Vec<Part<'a>>> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let mut pos = find(body, delimiter, 0).ok_or_else(|| anyhow!("multipart boundary not found"))?;
    let mut parts = Vec::new();
    loop {
        pos += delimiter.len();
        if body[pos..].starts_with(b"--") {
            break;
        }
        pos = skip_crlf(body, pos);

        let header_end =
            find(body, b"\r\n\r\n", pos).ok_or_else(|| anyhow!("multipart part missing headers"))?;
        let headers = String::from_utf8_lossy(&body[pos..header_end]);
        let data_start = header_end + 4;

        let next = find_delimiter(body, delimiter, data_start)
            .ok_or_else(|| anyhow!("multipart body truncated"))?;
        let (name, filename) = content_disposition(&headers);
        parts.push(Part {
            name,
            filename,
            data: &body[data_start..next],
        });
        pos = next + 2;
    }
    Ok(parts)
}

/// The uploaded file: the part named `image`, else the first part carrying a filename.
pub fn image_part<'a>(parts: &'a [Part<'a>]) -> Option<&'a Part<'a>> {
    parts
        .iter()
        .find(|part| part.name.as_deref() == Some("image"))
        .or_else(|| parts.iter().find(|part| part.filename.is_some()))
}

fn content_disposition(headers: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut filename = None;
    for line in headers.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("content-disposition") {
            continue;
        }
        for param in value.split(';').skip(1) {
            if let Some((k, v)) = param.split_once('=') {
                let v = v.trim().trim_matches('"').to_string();
                match k.trim().to_ascii_lowercase().as_str() {
                    "name" => name = Some(v),
                    "filename" => filename = Some(v),
                    _ => {}
                }
            }
        }
    }
    (name, filename)
}

/// Position of the CRLF that precedes the next delimiter.
fn find_delimiter(body: &[u8], delimiter: &[u8], from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(idx) = find(body, b"\r\n", search) {
        if body[idx + 2..].starts_with(delimiter) {
            return Some(idx);
        }
        search = idx + 2;
    }
    None
}

fn skip_crlf(body: &[u8], pos: usize) -> usize {
    if body[pos..].starts_with(b"\r\n") {
        pos + 2
    } else {
        pos
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|idx| idx + from)
}
