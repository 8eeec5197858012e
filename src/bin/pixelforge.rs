//! CLI for PixelForge - pixel-art asset generation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use pixelforge::{
    GeminiClient, GeminiModel, GenerationStatus, Preset, Workflow, WorkflowState,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pixelforge")]
#[command(about = "Generate pixel-art game assets from text prompts via Gemini")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an asset and save it as a PNG file
    Generate(GenerateArgs),

    /// List the preset prompts
    Presets,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt describing the asset (defaults to the pumpkin button)
    prompt: Option<String>,

    /// Use a preset prompt instead of PROMPT
    #[arg(short, long, value_enum, conflicts_with = "prompt")]
    preset: Option<PresetArg>,

    /// Directory the asset is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Gemini model to use
    #[arg(short, long, value_enum, default_value = "nano-banana")]
    model: ModelArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Pumpkin,
    Potion,
    Chest,
}

impl From<PresetArg> for Preset {
    fn from(arg: PresetArg) -> Self {
        match arg {
            PresetArg::Pumpkin => Preset::Pumpkin,
            PresetArg::Potion => Preset::Potion,
            PresetArg::Chest => Preset::Chest,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    NanoBanana,
    NanoBananaPro,
}

impl From<ModelArg> for GeminiModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::NanoBanana => GeminiModel::NanoBanana,
            ModelArg::NanoBananaPro => GeminiModel::NanoBananaPro,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pixelforge=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => generate(args, cli.json).await,
        Commands::Presets => list_presets(cli.json),
    }
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    // The credential is resolved here, at the first generation, not at startup
    let client = GeminiClient::builder().model(args.model.into()).build()?;
    let workflow = Workflow::new(Arc::new(client));

    if let Some(preset) = args.preset {
        workflow.select_preset(preset.into());
    } else if let Some(prompt) = args.prompt {
        workflow.set_prompt(prompt);
    }

    if workflow.generate().await.is_none() {
        anyhow::bail!("prompt must not be empty");
    }

    // Download failures are reported alongside the state, not instead of it
    let state = workflow.snapshot();
    let download = workflow.download(&args.output_dir).map_err(|e| e.to_string());

    if json_output {
        print_json(&state, &download)?;
    } else {
        print_summary(&state, &download);
    }

    if state.status == GenerationStatus::Error || download.is_err() {
        std::process::exit(1);
    }
    Ok(())
}

type DownloadOutcome = Result<Option<PathBuf>, String>;

fn print_json(state: &WorkflowState, download: &DownloadOutcome) -> anyhow::Result<()> {
    let output = download.as_ref().ok().and_then(|p| p.as_ref());
    let result = serde_json::json!({
        "type": "image",
        "success": state.status == GenerationStatus::Success,
        "status": state.status,
        "output": output.map(|p| p.display().to_string()),
        "asset": state.current_asset.as_ref().map(|asset| serde_json::json!({
            "id": asset.id,
            "prompt": asset.prompt,
            "timestamp": asset.timestamp,
            "mime_type": asset.image.mime_type(),
        })),
        "error": state.error,
        "download_error": download.as_ref().err(),
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn print_summary(state: &WorkflowState, download: &DownloadOutcome) {
    let Some(asset) = state
        .current_asset
        .as_ref()
        .filter(|_| state.status == GenerationStatus::Success)
    else {
        let error = state.error.as_deref().unwrap_or("unknown error");
        eprintln!("Generation failed: {}", error);
        return;
    };

    match download {
        Ok(Some(path)) => {
            println!("Generated asset: {} ({})", path.display(), asset.image.mime_type());
        }
        Ok(None) => println!("Generated asset ({})", asset.image.mime_type()),
        Err(e) => {
            println!("Generated asset ({})", asset.image.mime_type());
            eprintln!("Failed to save {}: {}", asset.file_name(), e);
        }
    }
    println!("Prompt used: \"{}\"", asset.prompt);
}

fn list_presets(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct PresetInfo {
        name: Preset,
        label: &'static str,
        prompt: &'static str,
    }

    let presets: Vec<PresetInfo> = Preset::ALL
        .into_iter()
        .map(|p| PresetInfo {
            name: p,
            label: p.label(),
            prompt: p.prompt(),
        })
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&presets)?);
    } else {
        println!("Available presets:\n");
        for p in &presets {
            println!("  {} ({})", p.label, p.name.as_str());
            println!("    {}", p.prompt);
        }
    }

    Ok(())
}
