//! Data URL encoding and validation for stored images.

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;

/// Upper bound on a stored or exported image data URL, in bytes.
pub const MAX_IMAGE_DATA_LEN: usize = 8 * 1024 * 1024;

/// Data URL errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUrlError {
    #[error("not a data URL")]
    MissingPrefix,
    #[error("data URL is not an image: {0}")]
    NotImage(String),
    #[error("data URL is not base64-encoded")]
    NotBase64,
    #[error("data URL payload is empty or malformed")]
    InvalidPayload,
    #[error("data URL is {len} bytes, limit is {max}")]
    TooLarge { len: usize, max: usize },
}

/// A borrowed, validated `data:image/<type>;base64,<payload>` URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUrl<'a> {
    mime: &'a str,
    payload: &'a str,
}

impl<'a> DataUrl<'a> {
    /// Validate the shape of an image data URL without decoding it.
    pub fn parse(url: &'a str) -> Result<Self, DataUrlError> {
        if url.len() > MAX_IMAGE_DATA_LEN {
            return Err(DataUrlError::TooLarge {
                len: url.len(),
                max: MAX_IMAGE_DATA_LEN,
            });
        }

        let rest = url.strip_prefix("data:").ok_or(DataUrlError::MissingPrefix)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPrefix)?;
        let mime = header.strip_suffix(";base64").ok_or(DataUrlError::NotBase64)?;

        let subtype = mime
            .strip_prefix("image/")
            .ok_or_else(|| DataUrlError::NotImage(mime.to_string()))?;
        let is_token = |c: char| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.');
        if subtype.is_empty() || !subtype.chars().all(is_token) {
            return Err(DataUrlError::NotImage(mime.to_string()));
        }

        let is_base64 = |c: char| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=');
        if payload.is_empty() || !payload.chars().all(is_base64) {
            return Err(DataUrlError::InvalidPayload);
        }

        Ok(Self { mime, payload })
    }

    pub fn mime(&self) -> &'a str {
        self.mime
    }

    pub fn payload(&self) -> &'a str {
        self.payload
    }

    /// Decode the payload bytes.
    pub fn decode(&self) -> Result<Vec<u8>, DataUrlError> {
        STANDARD
            .decode(self.payload)
            .map_err(|_| DataUrlError::InvalidPayload)
    }
}

/// Encode bytes as a base64 data URL.
pub fn encode_data_url(mime: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(data))
}
