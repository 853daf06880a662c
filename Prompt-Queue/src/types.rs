use imagegen_rs::ImageSize;
use serde::{Deserialize, Serialize};

/// Per-prompt lifecycle: Queued -> Loading -> Success/Error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GenerationStatus {
    Queued,
    Loading,
    Success,
    Error,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            GenerationStatus::Queued => "queued",
            GenerationStatus::Loading => "loading",
            GenerationStatus::Success => "success",
            GenerationStatus::Error => "error",
        }
    }

    /// `Success` and `Error` are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Success | GenerationStatus::Error)
    }
}

/// The outcome record for one prompt in a batch.
///
/// `images` is set only when `status` is `Success`, and `error` only when it
/// is `Error`. Use the constructors rather than building one by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptResult {
    pub prompt: String,
    pub status: GenerationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PromptResult {
    /// A prompt waiting on the generator.
    pub fn loading(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            status: GenerationStatus::Loading,
            images: None,
            error: None,
        }
    }

    pub fn success(prompt: impl Into<String>, images: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            status: GenerationStatus::Success,
            images: Some(images),
            error: None,
        }
    }

    pub fn failure(prompt: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            status: GenerationStatus::Error,
            images: None,
            error: Some(error.into()),
        }
    }

    /// Images of a successful result; empty for anything else.
    pub fn images(&self) -> &[String] {
        self.images.as_deref().unwrap_or(&[])
    }

    /// Successful and carrying at least one image.
    pub fn has_images(&self) -> bool {
        self.status == GenerationStatus::Success && !self.images().is_empty()
    }
}

/// Whether the processor is accepting a new batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessorPhase {
    Idle,
    Running,
}

/// Observable state of the current (or most recent) batch.
///
/// Replaced wholesale when a new batch starts; never merged with the
/// previous batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    /// Unique per batch. `None` before the first batch.
    pub batch_id: Option<String>,
    pub total: usize,
    /// Items that reached a terminal status.
    pub completed: usize,
    /// 1-based index of the item in flight (0 = none started).
    pub current_index: usize,
    pub results: Vec<PromptResult>,
    /// Size/aspect ratio the batch was generated with, for display.
    pub size: Option<ImageSize>,
    /// RFC 3339 timestamp when the batch started.
    pub started_at: Option<String>,
    /// RFC 3339 timestamp when the batch finished.
    pub completed_at: Option<String>,
}

impl QueueState {
    /// `completed / total * 100`, or 0 for an empty batch.
    pub fn progress_percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }

    pub fn is_finished(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn succeeded(&self) -> usize {
        self.count(GenerationStatus::Success)
    }

    pub fn failed(&self) -> usize {
        self.count(GenerationStatus::Error)
    }

    /// Whether any result has images worth exporting.
    pub fn has_successful_images(&self) -> bool {
        self.results.iter().any(PromptResult::has_images)
    }

    fn count(&self, status: GenerationStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// Summary of a finished batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub batch_id: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Wall-clock time including pacing delays.
    pub total_duration_ms: u64,
}
