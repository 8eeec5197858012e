//! Gemini (Google) pixel-art generation client.

use crate::error::{parse_retry_after, sanitize_error_message, PixelForgeError, Result};
use crate::generation::provider::AssetGenerator;
use crate::generation::types::{ImageReference, Prompt};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Default API root for the Gemini REST API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 3] = ["API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Style directives appended to every prompt.
const STYLE_DIRECTIVES: &str = "Style: High-quality 16-bit or 32-bit pixel art game asset.\n\
View: Front facing.\n\
Background: Solid white background (easy to remove).\n\
Details: Crisp edges, vibrant colors.";

/// Appends the fixed pixel-art style directives to a user prompt.
pub fn augment_prompt(prompt: &Prompt) -> String {
    format!("{}.\n{}", prompt.as_str(), STYLE_DIRECTIVES)
}

/// Gemini image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "nano-banana-pro-preview",
        }
    }
}

/// Builder for [`GeminiClient`].
#[derive(Debug, Clone, Default)]
pub struct GeminiClientBuilder {
    api_key: Option<String>,
    model: GeminiModel,
    base_url: Option<String>,
}

impl GeminiClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to the variables in [`API_KEY_ENV_VARS`].
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Gemini model variant.
    pub fn model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    /// Overrides the API root (e.g. for a proxy or a mock server).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the client, resolving the API key.
    pub fn build(self) -> Result<GeminiClient> {
        let api_key = resolve_api_key(self.api_key, |name| std::env::var(name).ok())?;

        Ok(GeminiClient {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }
}

fn resolve_api_key(
    explicit: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    explicit
        .into_iter()
        .chain(API_KEY_ENV_VARS.into_iter().filter_map(|name| lookup(name)))
        .find(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            PixelForgeError::Config(format!(
                "no API key provided and none of {} is set",
                API_KEY_ENV_VARS.join(", ")
            ))
        })
}

/// Pixel-art asset generator backed by the Gemini `generateContent` API.
///
/// Owns a single HTTP client reused for every call.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: GeminiModel,
    base_url: String,
}

impl GeminiClient {
    /// Creates a new `GeminiClientBuilder`.
    pub fn builder() -> GeminiClientBuilder {
        GeminiClientBuilder::new()
    }

    /// Returns the model this client requests.
    pub fn model(&self) -> GeminiModel {
        self.model
    }

    async fn generate_impl(&self, prompt: &Prompt) -> Result<ImageReference> {
        let start = Instant::now();

        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url,
            self.model.as_str()
        );
        let body = GeminiRequest::from_prompt(prompt);

        tracing::debug!(model = self.model.as_str(), "submitting generation request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let image = gemini_response.into_image()?;

        tracing::debug!(
            mime_type = image.mime_type(),
            duration_ms = start.elapsed().as_millis() as u64,
            "generation complete"
        );

        Ok(image)
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> PixelForgeError {
    let text = sanitize_error_message(text);
    match status {
        401 | 403 => PixelForgeError::Auth(text),
        429 => PixelForgeError::RateLimited {
            retry_after: parse_retry_after(headers).map(Duration::from_secs),
        },
        _ => PixelForgeError::Api {
            status,
            message: text,
        },
    }
}

#[async_trait]
impl AssetGenerator for GeminiClient {
    async fn generate(&self, prompt: &Prompt) -> Result<ImageReference> {
        self.generate_impl(prompt)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "error generating asset"))
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiRequestPart>,
}

#[derive(Debug, Serialize)]
struct GeminiRequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<&'static str>,
}

impl GeminiRequest {
    fn from_prompt(prompt: &Prompt) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiRequestPart {
                    text: augment_prompt(prompt),
                }],
            }],
            generation_config: GeminiConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Option<Vec<GeminiPartResponse>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

impl GeminiResponse {
    /// Picks the first inline image of the first candidate.
    ///
    /// Later image parts, if any, are ignored.
    fn into_image(self) -> Result<ImageReference> {
        if let Some(feedback) = &self.prompt_feedback {
            if let Some(ref reason) = feedback.block_reason {
                tracing::warn!(
                    block_reason = %reason,
                    message = feedback.block_reason_message.as_deref().unwrap_or_default(),
                    "prompt blocked by Gemini"
                );
            }
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or(PixelForgeError::NoContent)?;

        if let Some(ref finish_reason) = candidate.finish_reason {
            tracing::debug!(finish_reason = %finish_reason, "candidate finished");
        }

        let parts = candidate
            .content
            .and_then(|c| c.parts)
            .ok_or(PixelForgeError::NoContent)?;

        let inline_data = parts
            .into_iter()
            .find_map(|p| p.inline_data)
            .ok_or(PixelForgeError::NoImageData)?;

        Ok(ImageReference::new(
            inline_data.mime_type.unwrap_or_default(),
            inline_data.data,
        ))
    }
}
