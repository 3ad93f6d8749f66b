//! Serde helpers for byte fields carried as base64 strings in JSON.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encodes bytes as standard base64.
#[must_use]
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard base64, tolerating surrounding whitespace.
///
/// # Errors
///
/// Returns the underlying decode error if the text is not valid base64.
pub fn from_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(text.trim())
}

/// `#[serde(with = "base64_bytes")]` for `Vec<u8>` fields.
///
/// A JSON `null` decodes to an empty vector.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes bytes as a base64 string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_base64(bytes))
    }

    /// Deserializes a base64 string (or `null`) into bytes.
    ///
    /// # Errors
    ///
    /// Fails if the string is not valid base64.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text: Option<String> = Option::deserialize(deserializer)?;
        match text {
            None => Ok(Vec::new()),
            Some(text) => super::from_base64(&text).map_err(serde::de::Error::custom),
        }
    }
}
