//! Sequential model fallback with a fixed rate-limit back-off.

use std::time::Duration;

use crate::error::RollcallError;
use crate::gemini::{ContentGenerator, GenerateRequest};

/// The text a model produced, and which model produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub model: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct FallbackLadder {
    models: Vec<String>,
    rate_limit_wait: Duration,
}

impl FallbackLadder {
    /// Build a ladder from models in priority order. Duplicates are dropped,
    /// keeping the first occurrence.
    pub fn new<I, S>(models: I, rate_limit_wait: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for model in models {
            let model = model.into();
            let model = model.trim();
            if !model.is_empty() && !unique.iter().any(|m| m == model) {
                unique.push(model.to_string());
            }
        }
        FallbackLadder {
            models: unique,
            rate_limit_wait,
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn rate_limit_wait(&self) -> Duration {
        self.rate_limit_wait
    }

    /// Try each model in order until one answers.
    ///
    /// A rate-limited model is followed by a `rate_limit_wait` pause before
    /// the next model; other failures move on immediately. The last model's
    /// failure is final: a rate limit there becomes
    /// [`RollcallError::RateLimitExceeded`] without waiting.
    pub async fn run(
        &self,
        generator: &dyn ContentGenerator,
        request: &GenerateRequest,
    ) -> Result<ModelReply, RollcallError> {
        if self.models.is_empty() {
            return Err(RollcallError::NoModels);
        }
        tracing::debug!(models = ?self.models, "model ladder");

        let last = self.models.len() - 1;
        for (i, model) in self.models.iter().enumerate() {
            tracing::info!(%model, attempt = i + 1, "attempting analysis");

            let error = match generator.generate(model, request).await {
                Ok(text) => {
                    tracing::info!(%model, "model answered");
                    tracing::debug!(%model, reply = %text, "raw model reply");
                    return Ok(ModelReply {
                        model: model.clone(),
                        text,
                    });
                }
                Err(e) => e,
            };

            if error.is_rate_limit() {
                if i == last {
                    tracing::warn!(%model, "rate limit hit on last model");
                    return Err(RollcallError::RateLimitExceeded);
                }
                tracing::warn!(
                    %model,
                    wait_secs = self.rate_limit_wait.as_secs(),
                    "rate limit hit, waiting before next model"
                );
                tokio::time::sleep(self.rate_limit_wait).await;
                continue;
            }

            tracing::warn!(%model, error = %error, "model failed");
            if i == last {
                tracing::error!("all models failed");
                return Err(RollcallError::Model {
                    model: model.clone(),
                    source: error,
                });
            }
        }

        Err(RollcallError::NoModels)
    }
}
