//! Defensive response-body decompression.
//!
//! The relay asks the upstream for `identity` encoding, but public
//! endpoints and the CDNs in front of them sometimes compress anyway.
//! Bodies are decompressed according to `content-encoding` before JSON
//! validation; an unknown encoding is treated as an upstream failure.

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use std::io::Read;

use crate::upstream::UpstreamError;

/// Decodes a response body according to its declared `content-encoding`.
///
/// # Errors
///
/// Returns [`UpstreamError::Decompress`] when the declared encoding is
/// unsupported or the body is corrupt.
pub fn decompress_body(encoding: Option<&str>, body: &[u8]) -> Result<Vec<u8>, UpstreamError> {
    let encoding = encoding.map(str::trim).map(str::to_ascii_lowercase);
    match encoding.as_deref() {
        None | Some("" | "identity") => Ok(body.to_vec()),
        Some("gzip" | "x-gzip") => {
            let mut out = Vec::new();
            GzDecoder::new(body)
                .read_to_end(&mut out)
                .map_err(|e| UpstreamError::Decompress(format!("gzip: {e}")))?;
            Ok(out)
        }
        Some("deflate") => inflate(body),
        Some("br") => {
            let mut out = Vec::new();
            brotli::Decompressor::new(body, 4096)
                .read_to_end(&mut out)
                .map_err(|e| UpstreamError::Decompress(format!("brotli: {e}")))?;
            Ok(out)
        }
        Some(other) => {
            Err(UpstreamError::Decompress(format!("unsupported content-encoding: {other}")))
        }
    }
}

/// HTTP `deflate` is zlib-wrapped in practice, but some servers send raw
/// deflate streams; try zlib first and fall back to raw.
fn inflate(body: &[u8]) -> Result<Vec<u8>, UpstreamError> {
    let mut out = Vec::new();
    if ZlibDecoder::new(body).read_to_end(&mut out).is_ok() {
        return Ok(out);
    }

    out.clear();
    DeflateDecoder::new(body)
        .read_to_end(&mut out)
        .map_err(|e| UpstreamError::Decompress(format!("deflate: {e}")))?;
    Ok(out)
}
