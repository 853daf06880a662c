//! Helpers for `data:<mime>;base64,<payload>` image strings.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{ImageGenError, Result};

/// Build a data URI from a MIME type and an already base64-encoded payload.
pub fn to_data_uri(mime_type: &str, b64: &str) -> String {
    format!("data:{};base64,{}", mime_type, b64)
}

/// Encode raw bytes into a data URI.
pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    to_data_uri(mime_type, &STANDARD.encode(bytes))
}

/// Return the payload after the first `,`, or `None` if there is none.
pub fn payload_of(uri: &str) -> Option<&str> {
    uri.split_once(',')
        .map(|(_, payload)| payload)
        .filter(|p| !p.is_empty())
}

/// A parsed data URI borrowing from its source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime_type: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    pub fn parse(uri: &'a str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| ImageGenError::InvalidDataUri("missing data: prefix".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ImageGenError::InvalidDataUri("missing payload separator".into()))?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| ImageGenError::InvalidDataUri("payload is not base64".into()))?;
        Ok(Self { mime_type, payload })
    }

    /// Decode the base64 payload.
    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.payload.trim())
            .map_err(|e| ImageGenError::InvalidDataUri(e.to_string()))
    }
}
