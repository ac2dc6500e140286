use super::types::FetchError;
use reqwest::header::{HeaderMap, CONTENT_ENCODING};
use reqwest::StatusCode;
use std::io::Read;
use std::time::Duration;

const BROTLI_BUFFER_SIZE: usize = 4096;
const HTML_SNIFF_LEN: usize = 512;

const BLOCK_PAGE_MARKERS: [&str; 2] = ["<html", "<!doctype"];

/// Decode a raw body according to its `Content-Encoding`.
///
/// Only `br` is handled here; gzip and deflate are already undone by the
/// HTTP client, and bodies without the header pass through unmodified.
pub fn decode_body(headers: &HeaderMap, raw: Vec<u8>) -> Result<Vec<u8>, FetchError> {
    let is_brotli = headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("br"))
        .unwrap_or(false);
    if !is_brotli {
        return Ok(raw);
    }

    let mut decoded = Vec::with_capacity(raw.len() * 2);
    brotli::Decompressor::new(raw.as_slice(), BROTLI_BUFFER_SIZE)
        .read_to_end(&mut decoded)
        .map_err(|e| FetchError::Decompress(e.to_string()))?;
    Ok(decoded)
}

/// Map a send error onto the attempt error taxonomy.
pub(crate) fn classify_send_error(e: &reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_builder() {
        return FetchError::InvalidRequest(e.to_string());
    }
    if e.is_timeout() {
        return FetchError::Timeout(timeout);
    }
    if e.is_connect() {
        return FetchError::Connect(error_chain(e));
    }
    FetchError::Network(error_chain(e))
}

/// Map an error raised while reading the body.
pub(crate) fn classify_body_error(e: &reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        return FetchError::Timeout(timeout);
    }
    FetchError::Body(error_chain(e))
}

/// reqwest hides the interesting part (refused, reset, tls) in the source chain.
fn error_chain(e: &reqwest::Error) -> String {
    let mut out = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}

/// Reject non-200 responses with a short human-readable reason.
pub(crate) fn validate_status(status_code: StatusCode) -> Result<(), String> {
    if status_code == StatusCode::OK {
        return Ok(());
    }
    let label = match status_code {
        StatusCode::TOO_MANY_REQUESTS => "rate limited",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not found",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::BAD_REQUEST => "bad request",
        StatusCode::INTERNAL_SERVER_ERROR => "server error",
        s if s.is_redirection() => "redirect",
        s if s.is_success() => "not 200",
        _ => "unknown error",
    };
    Err(format!("status {} ({})", status_code.as_u16(), label))
}

/// True when the start of the body looks like an HTML page.
pub(crate) fn looks_like_html(body: &[u8]) -> bool {
    let head = &body[..body.len().min(HTML_SNIFF_LEN)];
    let lower = String::from_utf8_lossy(head).to_ascii_lowercase();
    BLOCK_PAGE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Guess an image MIME type from magic bytes.
pub fn sniff_image_type(body: &[u8]) -> Option<&'static str> {
    if body.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if body.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if body.starts_with(b"GIF87a") || body.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if body.len() >= 12 && &body[..4] == b"RIFF" && &body[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if body.len() >= 12 && &body[4..12] == b"ftypavif" {
        return Some("image/avif");
    }
    if body.starts_with(b"BM") {
        return Some("image/bmp");
    }
    None
}
