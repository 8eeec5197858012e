//! Asset generation: the generator trait, its Gemini implementation, and
//! the types they exchange.

mod gemini;
mod provider;
mod types;

pub use gemini::{
    augment_prompt, GeminiClient, GeminiClientBuilder, GeminiModel, API_KEY_ENV_VARS,
    DEFAULT_BASE_URL,
};
pub use provider::AssetGenerator;
pub use types::{GeneratedAsset, ImageReference, Prompt, DEFAULT_MIME_TYPE, DOWNLOAD_FILE_PREFIX};
