//! Text encodings for protected blobs and raw bytes
//!
//! Ciphertext travels as standard (padded) base64, raw byte input as hex.
//! Decoding is always done before any platform call so that malformed text
//! never reaches the data protection API.

use crate::error::{DpapiError, Result};
use base64::{Engine, engine::general_purpose::STANDARD};

/// Encode a blob as standard base64.
pub fn wrap(blob: &[u8]) -> String {
    STANDARD.encode(blob)
}

/// Decode standard base64.
pub fn unwrap(armored: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(armored)
        .map_err(|e| DpapiError::encoding(format!("base64 decoding failed: {}", e), e))
}

/// Encode bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// The hex digits of `text`, without a single leading `0x` or `0X`.
pub fn strip_hex_prefix(text: &str) -> &str {
    text.strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text)
}

/// Decode hex, accepting an optional `0x` prefix.
pub fn from_hex(text: &str) -> Result<Vec<u8>> {
    hex::decode(strip_hex_prefix(text))
        .map_err(|e| DpapiError::encoding(format!("hex decoding failed: {}", e), e))
}
