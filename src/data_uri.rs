//! `data:<mime>;base64,<payload>` strings.

use crate::error::{GenError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// MIME type assumed when a payload does not declare one.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// A base64 payload tagged with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataUri {
    mime_type: String,
    payload: String,
}

impl DataUri {
    /// Wraps an already base64-encoded payload.
    pub fn new(mime_type: impl Into<String>, payload: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        Self {
            mime_type: if mime_type.trim().is_empty() {
                DEFAULT_IMAGE_MIME.to_string()
            } else {
                mime_type
            },
            payload: payload.into(),
        }
    }

    /// Encodes raw bytes.
    pub fn from_bytes(mime_type: impl Into<String>, data: &[u8]) -> Self {
        Self::new(
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(data),
        )
    }

    /// Splits a data URI into MIME type and payload.
    ///
    /// Input without a `data:` prefix is taken as a bare base64 payload with
    /// the default image MIME type. Only the base64 encoding is accepted.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let Some(rest) = input.strip_prefix("data:") else {
            if input.is_empty() {
                return Err(GenError::Decode("empty data URI".into()));
            }
            return Ok(Self::new(DEFAULT_IMAGE_MIME, input));
        };

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| GenError::Decode("data URI has no ',' separator".into()))?;

        let mut params = header.split(';');
        let mime_type = params.next().unwrap_or_default();
        if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
            return Err(GenError::Decode("only base64 data URIs are supported".into()));
        }
        if payload.is_empty() {
            return Err(GenError::Decode("data URI payload is empty".into()));
        }

        Ok(Self::new(mime_type, payload))
    }

    /// The declared MIME type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The base64 payload.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Decodes the payload to bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.payload)
            .map_err(|e| GenError::Decode(e.to_string()))
    }
}

impl std::fmt::Display for DataUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.payload)
    }
}

impl std::str::FromStr for DataUri {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DataUri {
    type Error = GenError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DataUri> for String {
    fn from(uri: DataUri) -> Self {
        uri.to_string()
    }
}
