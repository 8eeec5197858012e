//! Core types for asset generation.

use crate::error::{PixelForgeError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Media type assumed when the model does not declare one.
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Prefix of every downloaded asset's file name.
pub const DOWNLOAD_FILE_PREFIX: &str = "pixel-pumpkin";

/// A user prompt that is not empty once trimmed.
///
/// The text is kept verbatim; trimming is only used for the emptiness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Prompt(String);

impl Prompt {
    /// Creates a prompt, rejecting empty and whitespace-only text.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(PixelForgeError::InvalidPrompt(
                "prompt must not be empty".into(),
            ));
        }
        Ok(Self(text))
    }

    /// Returns the prompt text exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the prompt, returning the text.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A self-contained reference to generated image data.
///
/// Holds the media type and the base64 payload as returned by the model;
/// displays as a `data:` URI usable directly as an image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    mime_type: String,
    data: String,
}

impl ImageReference {
    /// Creates a reference from a media type and a base64 payload.
    ///
    /// An empty media type falls back to [`DEFAULT_MIME_TYPE`].
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        Self {
            mime_type: if mime_type.is_empty() {
                DEFAULT_MIME_TYPE.to_string()
            } else {
                mime_type
            },
            data: data.into(),
        }
    }

    /// Parses a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| PixelForgeError::Decode("not a data URI".into()))?;
        let (mime_type, data) = rest
            .split_once(";base64,")
            .ok_or_else(|| PixelForgeError::Decode("data URI is not base64 encoded".into()))?;
        Ok(Self::new(mime_type, data))
    }

    /// Returns the declared media type.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the base64 payload.
    pub fn base64_data(&self) -> &str {
        &self.data
    }

    /// Returns the reference as a data URI.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Decodes the payload into raw image bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| PixelForgeError::Decode(e.to_string()))
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}

impl Serialize for ImageReference {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ImageReference {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        Self::from_data_uri(&uri).map_err(serde::de::Error::custom)
    }
}

/// A successfully generated image and its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[must_use = "generated asset should be stored or saved"]
pub struct GeneratedAsset {
    /// Unique identifier, fresh for every successful generation.
    pub id: Uuid,
    /// The generated image.
    #[serde(rename = "image_url")]
    pub image: ImageReference,
    /// Prompt text in effect when generation was triggered.
    pub prompt: String,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl GeneratedAsset {
    /// Creates an asset stamped with a new id and the current time.
    pub fn new(image: ImageReference, prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            image,
            prompt: prompt.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Returns the file name used when downloading this asset.
    pub fn file_name(&self) -> String {
        format!("{}-{}.png", DOWNLOAD_FILE_PREFIX, self.timestamp)
    }
}
