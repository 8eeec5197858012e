//! Error types for asset generation.

use std::time::Duration;

/// Errors that can occur while generating or saving an asset.
#[derive(Debug, thiserror::Error)]
pub enum PixelForgeError {
    /// Required configuration (the API key) is missing.
    #[error("configuration error: {0}")]
    Config(String),

    /// The prompt is empty or whitespace-only.
    #[error("invalid prompt: {0}")]
    InvalidPrompt(String),

    /// The model answered but produced no candidates or parts.
    #[error("No content generated from Gemini.")]
    NoContent,

    /// The model answered with parts, none of which carry inline image data.
    #[error("No image data found in the response.")]
    NoImageData,

    /// API key rejected by the remote service.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// Rate limit or quota exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay suggested by the `Retry-After` header.
        retry_after: Option<Duration>,
    },

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image payload is not a valid data URI or base64 string.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g. writing the downloaded file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`PixelForgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing credential or unusable input; fatal until corrected.
    Configuration,
    /// The remote call succeeded but yielded nothing usable.
    EmptyResponse,
    /// Failure raised by the remote call mechanism itself.
    Transport,
    /// Local failure while handling an already generated asset.
    Local,
}

impl PixelForgeError {
    /// Returns the message payload of variants that carry one.
    ///
    /// `None` for variants whose message is fixed or comes from a source error.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Config(m)
            | Self::InvalidPrompt(m)
            | Self::Auth(m)
            | Self::Decode(m)
            | Self::Api { message: m, .. } => Some(m.as_str()),
            _ => None,
        }
    }

    /// Returns the kind of failure this error represents.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::InvalidPrompt(_) => ErrorKind::Configuration,
            Self::NoContent | Self::NoImageData => ErrorKind::EmptyResponse,
            Self::Auth(_)
            | Self::Api { .. }
            | Self::RateLimited { .. }
            | Self::Network(_)
            | Self::Json(_) => ErrorKind::Transport,
            Self::Decode(_) | Self::Io(_) => ErrorKind::Local,
        }
    }
}

/// Result type alias for asset generation operations.
pub type Result<T> = std::result::Result<T, PixelForgeError>;

/// Longest error body carried into an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Reduces an HTTP error body to a short, human-readable message.
///
/// Google APIs wrap failures as `{"error": {"code", "message", "status"}}`;
/// when the body has that shape only the message is kept. Anything else is
/// trimmed and truncated.
pub(crate) fn sanitize_error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct Envelope {
        error: EnvelopeError,
    }

    #[derive(serde::Deserialize)]
    struct EnvelopeError {
        #[serde(default)]
        message: String,
    }

    if let Ok(envelope) = serde_json::from_str::<Envelope>(body) {
        if !envelope.error.message.is_empty() {
            return envelope.error.message;
        }
    }

    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return trimmed.to_string();
    }
    let mut truncated: String = trimmed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    truncated.push_str("...");
    truncated
}

/// Parses a `Retry-After` header expressed in whole seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
