//! # imagegen-rs
//!
//! Async Rust clients for text-to-image APIs.
//!
//! Two backends implement the same [`ImageGenerator`] capability:
//!
//! - [`GeminiClient`] talks to the Generative Language API directly
//!   (Gemini image models via `generateContent`, Imagen via `predict`)
//! - [`OpenAiImagesClient`] talks to any OpenAI-style
//!   `/images/generations` endpoint with a bearer token
//!
//! Every backend returns images as data URIs (`data:<mime>;base64,...`),
//! ready to display or to decode with [`DataUri`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use imagegen_rs::{GeminiClient, GeminiConfig, GenerationRequest, ImageGenerator, ImageSize};
//!
//! # async fn example() -> imagegen_rs::Result<()> {
//! let client = GeminiClient::new(GeminiConfig::from_env()?)?;
//! let request = GenerationRequest::new("a sunset over mountains", "imagen-4.0-generate-001")
//!     .size("16:9".parse::<ImageSize>()?)
//!     .count(2);
//!
//! for uri in client.generate(&request).await? {
//!     println!("{} bytes of base64", uri.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod data_uri;
pub mod error;
pub mod gemini;
pub mod openai;
pub mod types;

pub use data_uri::{payload_of, DataUri};
pub use error::{ImageGenError, Result};
pub use gemini::{GeminiClient, GeminiConfig, DEFAULT_GEMINI_MODEL, GEMINI_MODELS};
pub use openai::{
    OpenAiImagesClient, OpenAiImagesConfig, DEFAULT_OPENAI_MODEL, OPENAI_MODELS, OPENAI_SIZES,
};
pub use types::{AspectRatio, GenerationRequest, ImageSize, ModelOption};

use std::future::Future;
use std::sync::Arc;

/// A text-to-image capability.
///
/// Implementations return one data URI per generated image, in generation
/// order, or fail with an [`ImageGenError`].
///
/// # Example
///
/// ```
/// use imagegen_rs::*;
///
/// struct Solid;
///
/// impl ImageGenerator for Solid {
///     async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>> {
///         Ok(vec![data_uri::encode_data_uri("image/png", b"px"); request.count as usize])
///     }
/// }
/// ```
pub trait ImageGenerator: Send + Sync {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;
}

impl<G: ImageGenerator> ImageGenerator for Arc<G> {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<Vec<String>>> + Send {
        (**self).generate(request)
    }
}

/// Either backend, chosen at runtime.
#[derive(Debug, Clone)]
pub enum ImageBackend {
    Gemini(GeminiClient),
    OpenAi(OpenAiImagesClient),
}

impl ImageBackend {
    /// Model used when the caller has no preference.
    pub fn default_model(&self) -> &'static str {
        match self {
            ImageBackend::Gemini(_) => DEFAULT_GEMINI_MODEL,
            ImageBackend::OpenAi(_) => DEFAULT_OPENAI_MODEL,
        }
    }

    pub fn models(&self) -> &'static [ModelOption] {
        match self {
            ImageBackend::Gemini(_) => &GEMINI_MODELS,
            ImageBackend::OpenAi(_) => &OPENAI_MODELS,
        }
    }

    /// Sizes the backend accepts, default first: aspect ratios for Gemini,
    /// pixel sizes for OpenAI-style endpoints.
    pub fn sizes(&self) -> Vec<ImageSize> {
        match self {
            ImageBackend::Gemini(_) => AspectRatio::ALL
                .into_iter()
                .map(ImageSize::AspectRatio)
                .collect(),
            ImageBackend::OpenAi(_) => OPENAI_SIZES.to_vec(),
        }
    }
}

impl ImageGenerator for ImageBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>> {
        match self {
            ImageBackend::Gemini(c) => c.generate(request).await,
            ImageBackend::OpenAi(c) => c.generate(request).await,
        }
    }
}

pub(crate) fn normalize(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

/// Extract `error.message` from a JSON error body, or return the raw text.
pub(crate) fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize("http://localhost:8080/".into()), "http://localhost:8080");
        assert_eq!(normalize("http://host:8080///".into()), "http://host:8080");
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "API key not valid.");
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_backend_defaults() {
        let backend = ImageBackend::OpenAi(OpenAiImagesClient::new(OpenAiImagesConfig::new(
            "http://localhost:1",
            "t",
        )));
        assert_eq!(backend.default_model(), "nano-banana");
        assert_eq!(backend.models().len(), 3);
        assert_eq!(backend.sizes()[0], ImageSize::pixels(1792, 1024));

        let gemini = ImageBackend::Gemini(GeminiClient::new(GeminiConfig::new("k")).unwrap());
        assert_eq!(gemini.sizes()[0], ImageSize::default());
        assert_eq!(gemini.sizes().len(), AspectRatio::ALL.len());
    }
}
