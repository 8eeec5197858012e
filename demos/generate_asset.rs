//! Basic asset generation example.
//!
//! Run with: `cargo run --example generate_asset`
//!
//! Requires `API_KEY` (or `GEMINI_API_KEY` / `GOOGLE_API_KEY`) environment variable.

use pixelforge::{GeminiClient, GenerationStatus, Preset, Workflow};
use std::sync::Arc;

#[tokio::main]
async fn main() -> pixelforge::Result<()> {
    let client = GeminiClient::builder().build()?;
    let workflow = Workflow::new(Arc::new(client));

    workflow.select_preset(Preset::Chest);
    match workflow.generate().await {
        Some(GenerationStatus::Success) => {
            if let Some(path) = workflow.download(".")? {
                println!("Generated asset: {}", path.display());
            }
        }
        _ => println!("Generation failed: {:?}", workflow.error()),
    }

    Ok(())
}
