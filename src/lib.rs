#![warn(missing_docs)]
//! PixelForge - pixel-art game assets from text prompts.
//!
//! A [`Workflow`] holds the prompt, the generation status, and the most
//! recent [`GeneratedAsset`]. It drives an [`AssetGenerator`], normally a
//! [`GeminiClient`], which augments the prompt with pixel-art style
//! directives and returns the first inline image of the model's answer.
//!
//! # Quick Start
//!
//! ```no_run
//! use pixelforge::{GeminiClient, GenerationStatus, Preset, Workflow};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> pixelforge::Result<()> {
//!     let client = GeminiClient::builder().build()?;
//!     let workflow = Workflow::new(Arc::new(client));
//!
//!     workflow.select_preset(Preset::Potion);
//!     if workflow.generate().await == Some(GenerationStatus::Success) {
//!         workflow.download(".")?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `cli` (default): the `pixelforge` command-line interface

mod error;
pub mod generation;
pub mod preset;
pub mod workflow;

// Re-export error types at crate root
pub use error::{ErrorKind, PixelForgeError, Result};

pub use generation::{
    AssetGenerator, GeminiClient, GeminiClientBuilder, GeminiModel, GeneratedAsset,
    ImageReference, Prompt,
};
pub use preset::{Preset, DEFAULT_PROMPT};
pub use workflow::{GenerationStatus, GenerationTask, Workflow, WorkflowState};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{PixelForgeError, Result};
    pub use crate::generation::{AssetGenerator, GeminiClient, GeneratedAsset, Prompt};
    pub use crate::preset::Preset;
    pub use crate::workflow::{GenerationStatus, Workflow};
}
