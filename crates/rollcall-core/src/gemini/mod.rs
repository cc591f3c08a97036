//! Multimodal model access.
//!
//! [`ContentGenerator`] is the seam between the analysis pipeline and the
//! remote model. [`client::GeminiClient`] talks to the Gemini REST API;
//! tests substitute scripted generators.

pub mod client;

use async_trait::async_trait;
use base64::Engine;

use crate::intake::SheetFile;

/// Prompt plus one inline image, ready to send to any model.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub mime_type: String,
    /// Image bytes, base64 without a data-URL prefix.
    pub image_base64: String,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, image: &SheetFile) -> Self {
        GenerateRequest {
            prompt: prompt.into(),
            mime_type: image.mime_type.clone(),
            image_base64: base64::engine::general_purpose::STANDARD.encode(&image.bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("API key rejected: {0}")]
    Unauthorized(String),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("no text response from AI model")]
    EmptyResponse,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl GenerateError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GenerateError::RateLimited(_))
    }
}

/// Something that can turn a prompt and an image into reply text.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Run one generation against `model`. Implementations must not retry;
    /// fallback across models is handled by the ladder.
    async fn generate(&self, model: &str, request: &GenerateRequest)
        -> Result<String, GenerateError>;
}

/// Map an HTTP failure onto a [`GenerateError`].
///
/// The API reports quota exhaustion both as HTTP 429 and inside error bodies
/// of other statuses, so the body text is inspected as well.
pub fn classify_api_error(status: u16, body: &str) -> GenerateError {
    let message = api_error_message(body);
    let lower = message.to_lowercase();

    if status == 429
        || message.contains("429")
        || lower.contains("too many requests")
        || message.contains("RESOURCE_EXHAUSTED")
        || lower.contains("quota")
    {
        return GenerateError::RateLimited(message);
    }
    if status == 401
        || status == 403
        || message.contains("API_KEY_INVALID")
        || lower.contains("api key")
    {
        return GenerateError::Unauthorized(message);
    }
    if status == 404 || lower.contains("not found") {
        return GenerateError::ModelNotFound(message);
    }
    if status == 408 || status == 504 {
        return GenerateError::Timeout;
    }
    GenerateError::Api { status, message }
}

/// Pull `error.message` (and `error.status`) out of a Google API error body,
/// or return the body unchanged.
fn api_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    let error = &value["error"];
    match (error["message"].as_str(), error["status"].as_str()) {
        (Some(msg), Some(status)) => format!("{status}: {msg}"),
        (Some(msg), None) => msg.to_string(),
        _ => body.trim().to_string(),
    }
}
