//! Generation workflow: the prompt, status, and latest asset of one session.
//!
//! ```text
//!            trigger_generation()
//!   Idle ──────────────────────────▶ Loading ──ok──▶ Success
//!                                       │
//!                                       └──err──▶ Error
//! ```
//!
//! Success and Error both go back to Loading on the next trigger. Triggering
//! with a blank prompt does nothing.

use crate::error::{PixelForgeError, Result};
use crate::generation::{AssetGenerator, GeneratedAsset, Prompt};
use crate::preset::{Preset, DEFAULT_PROMPT};
use serde::Serialize;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Message shown when a failure carries no message of its own.
pub const GENERIC_ERROR_MESSAGE: &str =
    "Failed to generate asset. Please check your API key and try again.";

/// Status of the generation workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    /// Nothing has been generated yet.
    #[default]
    Idle,
    /// A generation request is in flight.
    Loading,
    /// The last request produced an asset.
    Success,
    /// The last request failed.
    Error,
}

impl std::fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Observable state of a [`Workflow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowState {
    /// Current prompt text, as edited by the user.
    pub prompt: String,
    /// Current status.
    pub status: GenerationStatus,
    /// Most recent successfully generated asset.
    pub current_asset: Option<GeneratedAsset>,
    /// Message of the most recent failure, cleared when a new attempt starts.
    pub error: Option<String>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            status: GenerationStatus::Idle,
            current_asset: None,
            error: None,
        }
    }
}

fn lock(state: &Mutex<WorkflowState>) -> MutexGuard<'_, WorkflowState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Display text for a failure, or the generic message when its payload is empty.
fn user_message(err: &PixelForgeError) -> String {
    match err.detail() {
        Some(detail) if detail.trim().is_empty() => GENERIC_ERROR_MESSAGE.to_string(),
        _ => err.to_string(),
    }
}

/// Drives an [`AssetGenerator`] and keeps the single most recent asset.
///
/// Requests are not serialized: triggering again while `Loading` starts a
/// second request, and whichever settles last determines the final state.
pub struct Workflow<G: AssetGenerator + ?Sized> {
    generator: Arc<G>,
    state: Arc<Mutex<WorkflowState>>,
    attempts: AtomicU64,
}

impl<G: AssetGenerator + ?Sized + 'static> Workflow<G> {
    /// Creates an idle workflow holding the default prompt.
    pub fn new(generator: Arc<G>) -> Self {
        Self {
            generator,
            state: Arc::new(Mutex::new(WorkflowState::default())),
            attempts: AtomicU64::new(0),
        }
    }

    /// Returns the generator this workflow drives.
    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Replaces the prompt text. Allowed in any state; status is unchanged.
    pub fn set_prompt(&self, text: impl Into<String>) {
        lock(&self.state).prompt = text.into();
    }

    /// Replaces the prompt text with a preset's.
    pub fn select_preset(&self, preset: Preset) {
        self.set_prompt(preset.prompt());
    }

    /// Returns the current prompt text.
    pub fn prompt(&self) -> String {
        lock(&self.state).prompt.clone()
    }

    /// Returns the current status.
    pub fn status(&self) -> GenerationStatus {
        lock(&self.state).status
    }

    /// Returns the current error message, if any.
    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    /// Returns the most recent successfully generated asset, if any.
    pub fn current_asset(&self) -> Option<GeneratedAsset> {
        lock(&self.state).current_asset.clone()
    }

    /// Returns a consistent copy of the whole state.
    pub fn snapshot(&self) -> WorkflowState {
        lock(&self.state).clone()
    }

    /// Starts generating an asset from the current prompt.
    ///
    /// Returns `None` without touching any state if the prompt is blank.
    /// Otherwise the error is cleared and the status is `Loading` by the time
    /// this returns; the remote call runs on a spawned task. Must be called
    /// from within a tokio runtime.
    pub fn trigger_generation(&self) -> Option<GenerationTask> {
        let prompt = {
            let mut state = lock(&self.state);
            let prompt = Prompt::new(state.prompt.clone()).ok()?;
            state.error = None;
            state.status = GenerationStatus::Loading;
            prompt
        };

        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(attempt, generator = self.generator.name(), "generation started");

        let generator = Arc::clone(&self.generator);
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            // A panicking generator must still move the workflow out of Loading
            let result = AssertUnwindSafe(generator.generate(&prompt))
                .catch_unwind()
                .await;

            let mut state = lock(&state);
            match result {
                Err(_) => {
                    tracing::error!(attempt, "generator panicked");
                    state.error = Some(GENERIC_ERROR_MESSAGE.to_string());
                    state.status = GenerationStatus::Error;
                }
                Ok(Ok(image)) => {
                    let asset = GeneratedAsset::new(image, prompt.into_inner());
                    tracing::info!(attempt, id = %asset.id, "asset generated");
                    state.current_asset = Some(asset);
                    state.status = GenerationStatus::Success;
                }
                Ok(Err(e)) => {
                    tracing::warn!(attempt, kind = ?e.kind(), "generation failed: {e}");
                    state.error = Some(user_message(&e));
                    state.status = GenerationStatus::Error;
                }
            }
            state.status
        });

        Some(GenerationTask {
            handle,
            state: Arc::clone(&self.state),
        })
    }

    /// Triggers generation and waits for it to settle.
    ///
    /// Returns `None` if the prompt is blank.
    pub async fn generate(&self) -> Option<GenerationStatus> {
        Some(self.trigger_generation()?.wait().await)
    }

    /// Writes the current asset into `dir` as `pixel-pumpkin-<timestamp>.png`.
    ///
    /// Returns `Ok(None)` if no asset has been generated.
    pub fn download(&self, dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let Some(asset) = self.current_asset() else {
            return Ok(None);
        };

        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(asset.file_name());
        std::fs::write(&path, asset.image.decode()?)?;

        tracing::info!(path = %path.display(), "asset downloaded");
        Ok(Some(path))
    }
}

/// Handle to an in-flight generation.
///
/// Dropping it does not cancel the request; the workflow is still updated
/// when the request settles, including when the generator panics.
#[must_use = "await the task with `wait` to observe the outcome"]
pub struct GenerationTask {
    handle: JoinHandle<GenerationStatus>,
    state: Arc<Mutex<WorkflowState>>,
}

impl GenerationTask {
    /// Waits for the request to settle and returns the status it set.
    ///
    /// If the task itself was lost (e.g. the runtime shut down) the workflow
    /// is moved to `Error` with the generic message.
    pub async fn wait(self) -> GenerationStatus {
        match self.handle.await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!(error = %e, "generation task failed");
                let mut state = lock(&self.state);
                state.error = Some(GENERIC_ERROR_MESSAGE.to_string());
                state.status = GenerationStatus::Error;
                GenerationStatus::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::ImageReference;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use tokio::sync::oneshot;

    /// Answers each call with the next scripted result.
    struct ScriptedGenerator {
        results: Mutex<VecDeque<Result<ImageReference>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(results: Vec<Result<ImageReference>>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AssetGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &Prompt) -> Result<ImageReference> {
            self.prompts.lock().unwrap().push(prompt.as_str().to_string());
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected generate call")
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Holds each call open until the test releases it, keyed by prompt.
    #[derive(Default)]
    struct GatedGenerator {
        gates: Mutex<HashMap<String, oneshot::Receiver<Result<ImageReference>>>>,
    }

    impl GatedGenerator {
        fn gate(&self, prompt: &str) -> oneshot::Sender<Result<ImageReference>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(prompt.to_string(), rx);
            tx
        }
    }

    #[async_trait]
    impl AssetGenerator for GatedGenerator {
        async fn generate(&self, prompt: &Prompt) -> Result<ImageReference> {
            let rx = self
                .gates
                .lock()
                .unwrap()
                .remove(prompt.as_str())
                .expect("no gate for prompt");
            rx.await.expect("gate dropped")
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    struct PanickingGenerator;

    #[async_trait]
    impl AssetGenerator for PanickingGenerator {
        async fn generate(&self, _prompt: &Prompt) -> Result<ImageReference> {
            panic!("generator exploded");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn png(data: &str) -> ImageReference {
        ImageReference::new("image/png", data)
    }

    #[test]
    fn test_initial_state() {
        let workflow = Workflow::new(ScriptedGenerator::new(vec![]));
        let state = workflow.snapshot();
        assert_eq!(state.prompt, DEFAULT_PROMPT);
        assert_eq!(state.status, GenerationStatus::Idle);
        assert!(state.current_asset.is_none());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_select_preset_sets_prompt() {
        let workflow = Workflow::new(ScriptedGenerator::new(vec![]));
        workflow.select_preset(Preset::Chest);
        assert_eq!(workflow.prompt(), Preset::Chest.prompt());
        assert_eq!(workflow.status(), GenerationStatus::Idle);
    }

    #[tokio::test]
    async fn test_potion_preset_scenario() {
        let generator = ScriptedGenerator::new(vec![Ok(png("QQ=="))]);
        let workflow = Workflow::new(Arc::clone(&generator));

        workflow.select_preset(Preset::Potion);
        assert_eq!(workflow.generate().await, Some(GenerationStatus::Success));

        let asset = workflow.current_asset().unwrap();
        assert_eq!(asset.image.to_data_uri(), "data:image/png;base64,QQ==");
        assert_eq!(
            asset.prompt,
            "A purple potion bottle with a cork, pixel art style."
        );
        assert!(workflow.error().is_none());
        assert_eq!(
            *generator.prompts.lock().unwrap(),
            vec![Preset::Potion.prompt().to_string()]
        );
    }

    #[tokio::test]
    async fn test_blank_prompt_is_noop() {
        let generator = ScriptedGenerator::new(vec![Err(PixelForgeError::NoContent)]);
        let workflow = Workflow::new(Arc::clone(&generator));
        workflow.set_prompt("a chest");
        workflow.generate().await;
        let before = workflow.snapshot();
        assert_eq!(before.status, GenerationStatus::Error);

        for blank in ["", "   ", "\n\t"] {
            workflow.set_prompt(blank);
            assert!(workflow.trigger_generation().is_none());
            let after = workflow.snapshot();
            assert_eq!(after.status, before.status);
            assert_eq!(after.error, before.error);
            assert_eq!(after.current_asset, before.current_asset);
        }
        assert_eq!(generator.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_loading_is_set_before_call_settles() {
        let generator = Arc::new(GatedGenerator::default());
        let gate = generator.gate("a chest");
        let workflow = Workflow::new(Arc::clone(&generator));
        workflow.set_prompt("a chest");

        let task = workflow.trigger_generation().unwrap();
        assert_eq!(workflow.status(), GenerationStatus::Loading);
        tokio::task::yield_now().await;
        assert_eq!(workflow.status(), GenerationStatus::Loading);

        gate.send(Ok(png("QQ=="))).unwrap();
        assert_eq!(task.wait().await, GenerationStatus::Success);
        assert_eq!(workflow.status(), GenerationStatus::Success);
    }

    #[tokio::test]
    async fn test_trigger_clears_previous_error() {
        let generator = Arc::new(GatedGenerator::default());
        let failing = generator.gate("first");
        let workflow = Workflow::new(Arc::clone(&generator));

        workflow.set_prompt("first");
        let task = workflow.trigger_generation().unwrap();
        failing.send(Err(PixelForgeError::NoContent)).unwrap();
        assert_eq!(task.wait().await, GenerationStatus::Error);
        assert_eq!(
            workflow.error().as_deref(),
            Some("No content generated from Gemini.")
        );

        let pending = generator.gate("second");
        workflow.set_prompt("second");
        let task = workflow.trigger_generation().unwrap();
        assert_eq!(workflow.status(), GenerationStatus::Loading);
        assert!(workflow.error().is_none());

        pending.send(Ok(png("QQ=="))).unwrap();
        assert_eq!(task.wait().await, GenerationStatus::Success);
    }

    #[tokio::test]
    async fn test_asset_keeps_prompt_from_trigger_time() {
        let generator = Arc::new(GatedGenerator::default());
        let gate = generator.gate("a golden chest");
        let workflow = Workflow::new(Arc::clone(&generator));

        workflow.set_prompt("a golden chest");
        let task = workflow.trigger_generation().unwrap();
        workflow.set_prompt("edited while loading");

        gate.send(Ok(png("QQ=="))).unwrap();
        task.wait().await;

        assert_eq!(workflow.current_asset().unwrap().prompt, "a golden chest");
        assert_eq!(workflow.prompt(), "edited while loading");
    }

    #[tokio::test]
    async fn test_failure_preserves_previous_asset() {
        let generator = ScriptedGenerator::new(vec![
            Ok(png("QQ==")),
            Err(PixelForgeError::NoImageData),
        ]);
        let workflow = Workflow::new(generator);
        workflow.set_prompt("a potion");

        assert_eq!(workflow.generate().await, Some(GenerationStatus::Success));
        let asset = workflow.current_asset().unwrap();

        workflow.set_prompt("a chest");
        assert_eq!(workflow.generate().await, Some(GenerationStatus::Error));
        assert_eq!(
            workflow.error().as_deref(),
            Some("No image data found in the response.")
        );
        assert_eq!(workflow.current_asset(), Some(asset));
    }

    #[tokio::test]
    async fn test_transport_error_message_surfaces() {
        let generator = ScriptedGenerator::new(vec![Err(PixelForgeError::Api {
            status: 503,
            message: "The model is overloaded.".into(),
        })]);
        let workflow = Workflow::new(generator);
        workflow.set_prompt("a chest");

        assert_eq!(workflow.generate().await, Some(GenerationStatus::Error));
        assert_eq!(
            workflow.error().as_deref(),
            Some("API error: 503 - The model is overloaded.")
        );
        assert!(workflow.current_asset().is_none());
    }

    #[test]
    fn test_user_message_uses_display() {
        assert_eq!(
            user_message(&PixelForgeError::NoContent),
            "No content generated from Gemini."
        );
        assert_eq!(
            user_message(&PixelForgeError::Auth("API key not valid.".into())),
            "authentication failed: API key not valid."
        );
    }

    #[test]
    fn test_user_message_falls_back_on_empty_detail() {
        assert_eq!(
            user_message(&PixelForgeError::Auth(String::new())),
            GENERIC_ERROR_MESSAGE
        );
        assert_eq!(
            user_message(&PixelForgeError::Api {
                status: 500,
                message: "  ".into()
            }),
            GENERIC_ERROR_MESSAGE
        );
    }

    #[tokio::test]
    async fn test_empty_error_shows_generic_message() {
        let generator = ScriptedGenerator::new(vec![Err(PixelForgeError::Auth(String::new()))]);
        let workflow = Workflow::new(generator);
        workflow.set_prompt("a chest");

        assert_eq!(workflow.generate().await, Some(GenerationStatus::Error));
        assert_eq!(workflow.error().as_deref(), Some(GENERIC_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_panicking_generator_settles_to_error() {
        let workflow = Workflow::new(Arc::new(PanickingGenerator));
        workflow.set_prompt("a chest");

        assert_eq!(workflow.generate().await, Some(GenerationStatus::Error));
        assert_eq!(workflow.error().as_deref(), Some(GENERIC_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_dropped_task_still_settles_after_panic() {
        let workflow = Workflow::new(Arc::new(PanickingGenerator));
        workflow.set_prompt("a chest");

        drop(workflow.trigger_generation().unwrap());
        assert_eq!(workflow.status(), GenerationStatus::Loading);

        for _ in 0..100 {
            if workflow.status() != GenerationStatus::Loading {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(workflow.status(), GenerationStatus::Error);
        assert_eq!(workflow.error().as_deref(), Some(GENERIC_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_lost_task_moves_to_error() {
        let workflow = Workflow::new(ScriptedGenerator::new(vec![]));
        lock(&workflow.state).status = GenerationStatus::Loading;

        let handle = tokio::spawn(std::future::pending::<GenerationStatus>());
        handle.abort();
        let task = GenerationTask {
            handle,
            state: Arc::clone(&workflow.state),
        };

        assert_eq!(task.wait().await, GenerationStatus::Error);
        assert_eq!(workflow.status(), GenerationStatus::Error);
        assert_eq!(workflow.error().as_deref(), Some(GENERIC_ERROR_MESSAGE));
    }

    #[tokio::test]
    async fn test_trigger_after_success_sets_loading() {
        let generator = Arc::new(GatedGenerator::default());
        let first = generator.gate("first");
        let workflow = Workflow::new(Arc::clone(&generator));

        workflow.set_prompt("first");
        let task = workflow.trigger_generation().unwrap();
        first.send(Ok(png("QQ=="))).unwrap();
        assert_eq!(task.wait().await, GenerationStatus::Success);
        let asset = workflow.current_asset().unwrap();

        let second = generator.gate("second");
        workflow.set_prompt("second");
        let task = workflow.trigger_generation().unwrap();
        assert_eq!(workflow.status(), GenerationStatus::Loading);
        assert_eq!(workflow.current_asset(), Some(asset));

        second.send(Ok(png("Qg=="))).unwrap();
        assert_eq!(task.wait().await, GenerationStatus::Success);
        assert_eq!(workflow.current_asset().unwrap().prompt, "second");
    }

    #[tokio::test]
    async fn test_last_settled_request_wins() {
        let generator = Arc::new(GatedGenerator::default());
        let first = generator.gate("first");
        let second = generator.gate("second");
        let workflow = Workflow::new(Arc::clone(&generator));

        workflow.set_prompt("first");
        let first_task = workflow.trigger_generation().unwrap();
        workflow.set_prompt("second");
        let second_task = workflow.trigger_generation().unwrap();

        second.send(Ok(png("Qg=="))).unwrap();
        second_task.wait().await;
        assert_eq!(workflow.current_asset().unwrap().prompt, "second");

        first.send(Ok(png("QQ=="))).unwrap();
        first_task.wait().await;
        assert_eq!(workflow.current_asset().unwrap().prompt, "first");
        assert_eq!(workflow.status(), GenerationStatus::Success);
    }

    #[tokio::test]
    async fn test_download_without_asset_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = Workflow::new(ScriptedGenerator::new(vec![]));

        assert!(workflow.download(dir.path()).unwrap().is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert_eq!(workflow.status(), GenerationStatus::Idle);
    }

    #[tokio::test]
    async fn test_download_writes_decoded_image() {
        let dir = tempfile::tempdir().unwrap();
        let workflow = Workflow::new(ScriptedGenerator::new(vec![Ok(png("iVBORw0KGgo="))]));
        workflow.generate().await;

        let asset = workflow.current_asset().unwrap();
        let path = workflow.download(dir.path()).unwrap().unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            format!("pixel-pumpkin-{}.png", asset.timestamp)
        );
        assert_eq!(
            std::fs::read(&path).unwrap(),
            [0x89u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
        );
        assert_eq!(workflow.status(), GenerationStatus::Success);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(GenerationStatus::default(), GenerationStatus::Idle);
        assert_eq!(GenerationStatus::Loading.to_string(), "loading");
        assert_eq!(GenerationStatus::Error.to_string(), "error");
    }
}
