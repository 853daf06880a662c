use serde::{Deserialize, Serialize};

use crate::types::{BatchSummary, GenerationStatus};

/// Emitted when a batch starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStartedEvent {
    pub batch_id: String,
    pub total: usize,
}

/// Emitted just before a prompt is sent to the generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStartedEvent {
    pub batch_id: String,
    /// 1-based, matches `QueueState::current_index`.
    pub index: usize,
    pub prompt: String,
}

/// Emitted after a prompt's result has been recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFinishedEvent {
    pub batch_id: String,
    pub index: usize,
    pub status: GenerationStatus,
    pub completed: usize,
    pub total: usize,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Emitted once every prompt has been processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchCompletedEvent {
    pub summary: BatchSummary,
}

/// Everything the processor broadcasts, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueueEvent {
    BatchStarted(BatchStartedEvent),
    ItemStarted(ItemStartedEvent),
    ItemFinished(ItemFinishedEvent),
    BatchCompleted(BatchCompletedEvent),
}
