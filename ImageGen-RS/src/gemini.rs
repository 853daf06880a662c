use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::data_uri::to_data_uri;
use crate::error::{ImageGenError, Result};
use crate::types::{GenerationRequest, ModelOption};
use crate::{api_error_message, normalize, ImageGenerator};

/// Default Google Generative Language API base URL.
pub const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-image";

/// Models selectable for the Gemini backend.
pub const GEMINI_MODELS: [ModelOption; 4] = [
    ModelOption {
        label: "Gemini 2.5 Flash (Recommended)",
        value: "gemini-2.5-flash-image",
    },
    ModelOption {
        label: "Gemini 3 Pro Image",
        value: "gemini-3-pro-image-preview",
    },
    ModelOption {
        label: "Imagen 4.0",
        value: "imagen-4.0-generate-001",
    },
    ModelOption {
        label: "Imagen 3.0",
        value: "imagen-3.0-generate-001",
    },
];

/// Configuration for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API base URL (default: [`GEMINI_ENDPOINT`]).
    pub endpoint: String,
    pub api_key: String,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: GEMINI_ENDPOINT.to_string(),
            api_key: api_key.into(),
            timeout: None,
        }
    }

    /// Read the API key from `GEMINI_API_KEY`, falling back to `API_KEY`.
    pub fn from_env() -> Result<Self> {
        std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(Self::new)
            .ok_or(ImageGenError::MissingApiKey)
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = normalize(endpoint.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Client for Gemini image models (`generateContent`) and Imagen models
/// (`predict`) on the Generative Language API.
///
/// The model name picks the call: anything starting with `gemini` goes
/// through `generateContent` and yields a single image, everything else is
/// treated as an Imagen model and honours the requested image count.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ImageGenError::MissingApiKey);
        }
        Ok(Self {
            http: Client::new(),
            config,
        })
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Generate with a Gemini model via `models/{model}:generateContent`.
    pub async fn generate_content(&self, request: &GenerationRequest) -> Result<Vec<String>> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint, request.model
        );
        let json = self.post(&url, &generate_content_body(request)).await?;
        parse_generate_content(&json)
    }

    /// Generate with an Imagen model via `models/{model}:predict`.
    pub async fn predict(&self, request: &GenerationRequest) -> Result<Vec<String>> {
        let url = format!("{}/models/{}:predict", self.config.endpoint, request.model);
        let json = self.post(&url, &predict_body(request)).await?;
        parse_predict(&json)
    }

    async fn post(&self, url: &str, body: &Value) -> Result<Value> {
        let mut req = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body);
        if let Some(timeout) = self.config.timeout {
            req = req.timeout(timeout);
        }

        let resp = req.send().await.map_err(|e| ImageGenError::Network {
            context: format!("Cannot reach image API at {}", self.config.endpoint),
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

        resp.json().await.map_err(|e| ImageGenError::Network {
            context: "Failed to parse image API response".into(),
            source: e,
        })
    }
}

impl ImageGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<String>> {
        let result = if is_gemini_model(&request.model) {
            self.generate_content(request).await
        } else {
            self.predict(request).await
        };
        if let Err(e) = &result {
            tracing::warn!(model = %request.model, error = %e, "Image generation failed");
        }
        result
    }
}

fn is_gemini_model(model: &str) -> bool {
    model.to_lowercase().starts_with("gemini")
}

fn generate_content_body(request: &GenerationRequest) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": request.prompt }] }],
        "generationConfig": {
            "responseModalities": ["TEXT", "IMAGE"],
            "imageConfig": { "aspectRatio": request.size.aspect_ratio().as_str() },
        },
    })
}

fn predict_body(request: &GenerationRequest) -> Value {
    let mut body = json!({
        "instances": [{ "prompt": request.prompt }],
        "parameters": {
            "sampleCount": request.count,
            "aspectRatio": request.size.aspect_ratio().as_str(),
            "outputOptions": { "mimeType": "image/jpeg" },
        },
    });
    if let Some(seed) = request.seed {
        body["parameters"]["seed"] = json!(seed);
    }
    body
}

/// Pull the first inline image out of a `generateContent` response.
/// The image part is not necessarily the first part.
fn parse_generate_content(json: &Value) -> Result<Vec<String>> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array());

    let inline = parts.and_then(|parts| {
        parts.iter().find_map(|p| {
            let data = p.get("inlineData")?;
            let b64 = data.get("data").and_then(|d| d.as_str())?;
            if b64.is_empty() {
                return None;
            }
            let mime = data
                .get("mimeType")
                .and_then(|m| m.as_str())
                .unwrap_or("image/png");
            Some(to_data_uri(mime, b64))
        })
    });

    inline.map(|uri| vec![uri]).ok_or_else(|| {
        ImageGenError::NoImages(
            "No image content generated. The model might have returned only text.".into(),
        )
    })
}

fn parse_predict(json: &Value) -> Result<Vec<String>> {
    let images: Vec<String> = json
        .get("predictions")
        .and_then(|p| p.as_array())
        .map(|preds| {
            preds
                .iter()
                .filter_map(|p| {
                    let b64 = p.get("bytesBase64Encoded").and_then(|b| b.as_str())?;
                    let mime = p
                        .get("mimeType")
                        .and_then(|m| m.as_str())
                        .unwrap_or("image/jpeg");
                    Some(to_data_uri(mime, b64))
                })
                .collect()
        })
        .unwrap_or_default();

    if images.is_empty() {
        return Err(ImageGenError::NoImages("No images were generated.".into()));
    }
    Ok(images)
}
