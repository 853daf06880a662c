use thiserror::Error;

/// Errors returned by image generation backends.
#[derive(Error, Debug)]
pub enum ImageGenError {
    /// The API returned a non-success HTTP status.
    #[error("API Error: HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response was missing expected fields.
    #[error("{0}")]
    InvalidResponse(String),

    /// The request succeeded but produced no images.
    #[error("{0}")]
    NoImages(String),

    /// No API key was configured for a backend that needs one.
    #[error("API key not set (expected GEMINI_API_KEY or API_KEY)")]
    MissingApiKey,

    /// A string was not a `data:<mime>;base64,<payload>` URI.
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Anything else. The message may be empty.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ImageGenError>;
