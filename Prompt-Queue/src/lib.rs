//! # Prompt Queue
//!
//! Sequential text-to-image prompt queue with per-item status tracking,
//! live progress, and zip export.
//!
//! ## Key Features
//!
//! - **Strictly sequential**: prompts go to the generator one at a time,
//!   with a fixed pause between requests to stay under rate limits
//! - **Per-item status**: every prompt has its own Loading/Success/Error
//!   record; one failure never stops the rest of the batch
//! - **Observable state**: watch snapshots for UIs, broadcast events for
//!   step-by-step listeners
//! - **Re-entrancy guard**: a batch submitted while another runs is ignored
//! - **Zip export** of every generated image, with prompt-derived file names
//! - **Local store**: a SQLite-backed JSON key-value store for settings
//!
//! ## Quick Start
//!
//! 1. Pick an [`ImageGenerator`] backend from [`imagegen_rs`]
//! 2. Create a [`QueueProcessor`] with a [`ProcessorConfig`]
//! 3. Call [`QueueProcessor::submit_batch()`] with newline-separated prompts
//! 4. Export results with [`ResultArchiver::save_to_dir()`]

pub mod archive;
pub mod config;
pub mod error;
pub mod events;
pub mod processor;
pub mod prompt;
pub mod storage;
pub mod types;

pub use archive::{build_archive, image_filename, sanitize_prompt, save_image, ResultArchiver};
pub use config::{
    clamp_image_count, BatchConfig, BatchConfigBuilder, ProcessorConfig, ProcessorConfigBuilder,
    StylePreset, STYLE_PRESETS,
};
pub use error::{QueueError, Result};
pub use events::QueueEvent;
pub use processor::{QueueProcessor, UNKNOWN_ERROR};
pub use prompt::{effective_prompt, is_prompt_whitespace, split_prompts};
pub use storage::LocalStore;
pub use types::{
    BatchSummary, GenerationStatus, ProcessorPhase, PromptResult, QueueState,
};

pub use imagegen_rs;
pub use imagegen_rs::{ImageGenerator, ImageSize};

use std::sync::atomic::{AtomicBool, Ordering};

/// Holds an in-progress flag for its lifetime and clears it on drop, so the
/// flag is released even if the owning future is dropped mid-way.
pub(crate) struct FlagGuard<'a>(&'a AtomicBool);

impl<'a> FlagGuard<'a> {
    /// Set the flag, or return `None` if it was already set.
    pub(crate) fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
