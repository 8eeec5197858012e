//! Asset generator trait.

use crate::error::Result;
use crate::generation::types::{ImageReference, Prompt};
use async_trait::async_trait;

/// Turns a prompt into image data via some remote capability.
///
/// The workflow is generic over this trait so it can be driven by the
/// Gemini client or by a scripted generator in tests.
#[async_trait]
pub trait AssetGenerator: Send + Sync {
    /// Generates one image for the given prompt. No retries are performed.
    async fn generate(&self, prompt: &Prompt) -> Result<ImageReference>;

    /// Returns the name of this generator for display.
    fn name(&self) -> &str;
}
