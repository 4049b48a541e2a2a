//! Reversible transforms wrapping save containers and per-entry blobs.
//!
//! Containers are `gzip -> base64url -> xor(11)`; entry payload blobs are
//! `gzip -> base64url`. Blob helpers follow a soft contract: they always yield
//! a string, so their error type is [`Infallible`].

use std::convert::Infallible;
use std::io::{Read, Write};

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;
use tracing::debug;

use crate::error::{SaveError, SaveResult};
use crate::version::{CONTAINER_XOR_KEY, ENCODED_BLOB_PREFIX};

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const BYTE_ORDER_MARK: char = '\u{feff}';

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
enum TransformError {
    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("inflate: {0}")]
    Inflate(#[from] std::io::Error),
    #[error("payload is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("payload is empty")]
    Empty,
}

/// XORs every byte with `key`. Applying it twice restores the input.
pub fn xor_transform(bytes: &[u8], key: u8) -> Vec<u8> {
    bytes.iter().map(|byte| byte ^ key).collect()
}

/// URL-safe base64 without padding.
pub fn base64_url_encode(bytes: &[u8]) -> String {
    URL_SAFE_LENIENT.encode(bytes)
}

/// Decodes URL-safe or standard base64, padded or not. Surrounding whitespace
/// and NUL bytes are ignored.
pub fn base64_url_decode(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let normalized: String = text
        .trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    URL_SAFE_LENIENT.decode(normalized)
}

/// Gzip-compresses `bytes`.
pub fn compress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 2), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Inflates a gzip stream, or a zlib stream when the gzip magic is absent.
pub fn decompress(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(bytes.len() * 4);
    if bytes.starts_with(&GZIP_MAGIC) {
        GzDecoder::new(bytes).read_to_end(&mut out)?;
    } else {
        ZlibDecoder::new(bytes).read_to_end(&mut out)?;
    }
    Ok(out)
}

/// Recovers container markup from raw file bytes.
///
/// Plain markup passes through. Otherwise the full XOR layout is tried first,
/// then the XOR-less layout some third-party tools write.
pub fn decrypt_container(bytes: &[u8]) -> SaveResult<String> {
    let text = String::from_utf8_lossy(bytes);
    let body = text.trim_start_matches(BYTE_ORDER_MARK);
    if body.trim_start().starts_with('<') {
        return Ok(body.to_string());
    }

    let masked = xor_transform(bytes, CONTAINER_XOR_KEY);
    let xor_error = match unwrap_layers(&String::from_utf8_lossy(&masked)) {
        Ok(plain) => return Ok(plain),
        Err(err) => err,
    };
    debug!(error = %xor_error, "xor layout failed, retrying without xor");

    unwrap_layers(&text).map_err(|plain_error| SaveError::Decode {
        reason: format!("xor layout: {xor_error}; plain layout: {plain_error}"),
    })
}

/// Wraps container markup in the full on-disk layout.
pub fn encrypt_container(text: &str) -> SaveResult<Vec<u8>> {
    let zipped = compress(text.as_bytes()).map_err(compression_failed)?;
    let encoded = base64_url_encode(&zipped);
    Ok(xor_transform(encoded.as_bytes(), CONTAINER_XOR_KEY))
}

fn compression_failed(err: std::io::Error) -> SaveError {
    SaveError::Encode {
        reason: format!("container could not be compressed: {err}"),
    }
}

/// Decodes an entry payload blob. Input that is not a valid blob is returned
/// unchanged; it is assumed to be plain text already.
pub fn decrypt_blob(text: &str) -> Result<String, Infallible> {
    if text.is_empty() {
        return Ok(String::new());
    }
    Ok(unwrap_layers(text).unwrap_or_else(|err| {
        debug!(error = %err, "blob is not encoded, keeping it verbatim");
        text.to_string()
    }))
}

/// Encodes an entry payload blob. Yields an empty string if compression fails.
pub fn encrypt_blob(text: &str) -> Result<String, Infallible> {
    if text.is_empty() {
        return Ok(String::new());
    }
    Ok(compress(text.as_bytes())
        .map(|zipped| base64_url_encode(&zipped))
        .unwrap_or_default())
}

/// Whether `text` already looks like an encoded payload blob.
pub fn is_encoded_blob(text: &str) -> bool {
    text.trim_start().starts_with(ENCODED_BLOB_PREFIX)
}

fn unwrap_layers(text: &str) -> Result<String, TransformError> {
    let zipped = base64_url_decode(text)?;
    if zipped.is_empty() {
        return Err(TransformError::Empty);
    }
    let plain = decompress(&zipped)?;
    Ok(String::from_utf8(plain)?)
}
