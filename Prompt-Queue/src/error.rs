use thiserror::Error;

/// Errors that can occur outside the per-prompt generation path.
///
/// Per-prompt failures never surface here; they are recorded on the
/// prompt's [`PromptResult`](crate::PromptResult) instead.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid image payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for QueueError {
    fn from(err: anyhow::Error) -> Self {
        QueueError::Other(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
