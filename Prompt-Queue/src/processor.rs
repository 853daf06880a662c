use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use imagegen_rs::{GenerationRequest, ImageGenError, ImageGenerator};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{BatchConfig, ProcessorConfig};
use crate::events::*;
use crate::prompt::{effective_prompt, split_prompts};
use crate::types::*;
use crate::FlagGuard;

/// Recorded when a generator fails without saying why.
pub const UNKNOWN_ERROR: &str = "An unknown error occurred";

/// Runs batches of prompts through an [`ImageGenerator`], one prompt at a
/// time, with a fixed pause between requests.
///
/// Only one batch runs at a time: [`submit_batch()`](Self::submit_batch)
/// while another batch is in flight is ignored. Each batch replaces the
/// previous [`QueueState`]; observers read it through [`snapshot()`](Self::snapshot)
/// or [`subscribe()`](Self::subscribe), and can follow individual steps
/// through [`events()`](Self::events).
///
/// # Example
///
/// ```ignore
/// let processor = Arc::new(QueueProcessor::new(client, ProcessorConfig::default()));
/// let mut state = processor.subscribe();
///
/// let handle = processor.clone().spawn_batch("a cat\na fox", BatchConfig::default());
/// while state.changed().await.is_ok() {
///     let s = state.borrow().clone();
///     println!("{:.0}%", s.progress_percentage());
///     if s.is_finished() { break; }
/// }
/// let summary = handle.await?;
/// ```
pub struct QueueProcessor<G> {
    generator: G,
    config: ProcessorConfig,
    running: AtomicBool,
    state: watch::Sender<QueueState>,
    events: broadcast::Sender<QueueEvent>,
}

impl<G> QueueProcessor<G>
where
    G: ImageGenerator,
{
    pub fn new(generator: G, config: ProcessorConfig) -> Self {
        let (state, _) = watch::channel(QueueState::default());
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            generator,
            config,
            running: AtomicBool::new(false),
            state,
            events,
        }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn phase(&self) -> ProcessorPhase {
        if self.is_running() {
            ProcessorPhase::Running
        } else {
            ProcessorPhase::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// A copy of the current batch state.
    pub fn snapshot(&self) -> QueueState {
        self.state.borrow().clone()
    }

    /// Receive a new snapshot on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<QueueState> {
        self.state.subscribe()
    }

    /// Receive step-by-step events for subsequent batches.
    pub fn events(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Run one batch to completion.
    ///
    /// `prompts_text` is split on newlines and blank lines are dropped.
    /// Every accepted submission replaces the previous state, so text with
    /// no prompts yields an empty, already finished batch. Returns `None`
    /// without touching the state if a batch is already running.
    pub async fn submit_batch(
        &self,
        prompts_text: &str,
        config: &BatchConfig,
    ) -> Option<BatchSummary> {
        let Some(_guard) = FlagGuard::try_acquire(&self.running) else {
            debug!("Batch already in progress, ignoring submission");
            return None;
        };

        let prompts = split_prompts(prompts_text);
        if prompts.is_empty() {
            debug!("No prompts in submission, clearing previous batch");
        }

        Some(self.run_batch(prompts, config).await)
    }

    /// Spawn [`submit_batch()`](Self::submit_batch) as a background tokio task.
    pub fn spawn_batch(
        self: Arc<Self>,
        prompts_text: impl Into<String>,
        config: BatchConfig,
    ) -> JoinHandle<Option<BatchSummary>>
    where
        G: 'static,
    {
        let text = prompts_text.into();
        tokio::spawn(async move { self.submit_batch(&text, &config).await })
    }

    async fn run_batch(&self, prompts: Vec<String>, config: &BatchConfig) -> BatchSummary {
        let batch_id = uuid::Uuid::new_v4().to_string();
        let total = prompts.len();
        let batch_start = Instant::now();

        self.state.send_replace(QueueState {
            batch_id: Some(batch_id.clone()),
            total,
            completed: 0,
            current_index: 0,
            results: prompts.iter().map(PromptResult::loading).collect(),
            size: Some(config.size),
            started_at: Some(chrono::Utc::now().to_rfc3339()),
            completed_at: None,
        });

        info!(%batch_id, total, model = %config.model, size = %config.size, "Batch started");
        let _ = self.events.send(QueueEvent::BatchStarted(BatchStartedEvent {
            batch_id: batch_id.clone(),
            total,
        }));

        for (i, prompt) in prompts.iter().enumerate() {
            let index = i + 1;
            self.state.send_modify(|s| s.current_index = index);
            let _ = self.events.send(QueueEvent::ItemStarted(ItemStartedEvent {
                batch_id: batch_id.clone(),
                index,
                prompt: prompt.clone(),
            }));

            let request = GenerationRequest {
                prompt: effective_prompt(prompt, config.style_preset()),
                size: config.size,
                count: config.image_count(),
                model: config.model.clone(),
                seed: None,
            };

            let start = Instant::now();
            let result = match self.generator.generate(&request).await {
                Ok(images) => {
                    debug!(%batch_id, index, images = images.len(), "Prompt succeeded");
                    PromptResult::success(prompt.as_str(), images)
                }
                Err(e) => {
                    let message = failure_message(&e);
                    warn!(%batch_id, index, error = %message, "Prompt failed");
                    PromptResult::failure(prompt.as_str(), message)
                }
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            let status = result.status;
            let error = result.error.clone();
            let mut completed = 0;
            self.state.send_modify(|s| {
                s.results[i] = result;
                s.completed += 1;
                completed = s.completed;
            });

            let _ = self.events.send(QueueEvent::ItemFinished(ItemFinishedEvent {
                batch_id: batch_id.clone(),
                index,
                status,
                completed,
                total,
                error,
                duration_ms,
            }));

            if index < total && !self.config.pacing.is_zero() {
                tokio::time::sleep(self.config.pacing).await;
            }
        }

        self.state
            .send_modify(|s| s.completed_at = Some(chrono::Utc::now().to_rfc3339()));

        let state = self.state.borrow().clone();
        let summary = BatchSummary {
            batch_id,
            total,
            succeeded: state.succeeded(),
            failed: state.failed(),
            total_duration_ms: batch_start.elapsed().as_millis() as u64,
        };

        info!(
            batch_id = %summary.batch_id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            duration_ms = summary.total_duration_ms,
            "Batch completed"
        );
        let _ = self.events.send(QueueEvent::BatchCompleted(BatchCompletedEvent {
            summary: summary.clone(),
        }));

        summary
    }
}

/// The generator's message, or [`UNKNOWN_ERROR`] if it has none.
fn failure_message(err: &ImageGenError) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        UNKNOWN_ERROR.to_string()
    } else {
        message
    }
}
