//! Gemini REST `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{classify_api_error, ContentGenerator, GenerateError, GenerateRequest};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Gemini provider.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client with an API key and per-request timeout.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerateError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateRequest,
    ) -> Result<String, GenerateError> {
        let body = GeminiRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text {
                        text: &request.prompt,
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type: &request.mime_type,
                            data: &request.image_base64,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(classify_api_error(status.as_u16(), &text));
        }

        let parsed: GeminiResponse = serde_json::from_str(&text).map_err(|e| GenerateError::Api {
            status: status.as_u16(),
            message: format!("unreadable response body: {e}"),
        })?;

        let reply: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if reply.trim().is_empty() {
            return Err(GenerateError::EmptyResponse);
        }
        Ok(reply)
    }
}

fn transport_error(e: reqwest::Error) -> GenerateError {
    if e.is_timeout() {
        GenerateError::Timeout
    } else {
        GenerateError::Network(e.to_string())
    }
}
