use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::data_uri::to_data_uri;
use crate::error::{ImageGenError, Result};
use crate::types::{GenerationRequest, ImageSize, ModelOption};
use crate::{api_error_message, normalize, ImageGenerator};

pub const DEFAULT_OPENAI_MODEL: &str = "nano-banana";

/// Models exposed by the OpenAI-compatible gateway.
pub const OPENAI_MODELS: [ModelOption; 3] = [
    ModelOption {
        label: "Nano Banana",
        value: "nano-banana",
    },
    ModelOption {
        label: "Nano Banana R2I",
        value: "nano-banana-r2i",
    },
    ModelOption {
        label: "Imagen 4.0",
        value: "IMAGEN_4",
    },
];

/// Pixel sizes the gateway accepts.
pub const OPENAI_SIZES: [ImageSize; 3] = [
    ImageSize::pixels(1792, 1024),
    ImageSize::pixels(1024, 1792),
    ImageSize::pixels(1024, 1024),
];

/// Configuration for [`OpenAiImagesClient`].
#[derive(Debug, Clone)]
pub struct OpenAiImagesConfig {
    /// Base URL; requests go to `{base_url}/images/generations`.
    pub base_url: String,
    /// Bearer token sent in the `Authorization` header.
    pub token: String,
    pub timeout: Option<Duration>,
}

impl OpenAiImagesConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: normalize(base_url.into()),
            token: token.into(),
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Serialize)]
struct ImagesRequestBody<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: String,
    response_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}

/// Client for OpenAI-style `POST /images/generations` endpoints that return
/// `b64_json` payloads.
#[derive(Debug, Clone)]
pub struct OpenAiImagesClient {
    http: Client,
    config: OpenAiImagesConfig,
}

impl OpenAiImagesClient {
    pub fn new(config: OpenAiImagesConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn config(&self) -> &OpenAiImagesConfig {
        &self.config
    }

    pub async fn images_generations(&self, request: &GenerationRequest) -> Result<Vec<String>> {
        let url = format!("{}/images/generations", self.config.base_url);
        let body = request_body(request);

        let mut req = self
            .http
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&body);
        if let Some(timeout) = self.config.timeout {
            req = req.timeout(timeout);
        }

        let resp = req.send().await.map_err(|e| ImageGenError::Network {
            context: format!("Cannot reach image API at {}", self.config.base_url),
            source: e,
        })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ImageGenError::Http {
                status,
                body: api_error_message(&text),
            });
        }

        let text = resp.text().await.map_err(|e| ImageGenError::Network {
            context: "Failed to read image API response".into(),
            source: e,
        })?;
        parse_response(&text)
    }
}

impl ImageGenerator for OpenAiImagesClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>> {
        let result = self.images_generations(request).await;
        if let Err(e) = &result {
            tracing::warn!(model = %request.model, error = %e, "Image generation failed");
        }
        result
    }
}

fn request_body(request: &GenerationRequest) -> ImagesRequestBody<'_> {
    ImagesRequestBody {
        model: &request.model,
        prompt: &request.prompt,
        n: request.count,
        size: request.size.pixel_size_string(),
        response_format: "b64_json",
        seed: request.seed,
    }
}

fn parse_response(text: &str) -> Result<Vec<String>> {
    let parsed: ImagesResponse = serde_json::from_str(text)?;
    let images: Vec<String> = parsed
        .data
        .into_iter()
        .filter_map(|d| d.b64_json)
        .map(|b64| to_data_uri("image/png", &b64))
        .collect();
    if images.is_empty() {
        return Err(ImageGenError::NoImages("No images were generated.".into()));
    }
    Ok(images)
}
