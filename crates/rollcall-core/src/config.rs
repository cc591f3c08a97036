use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RollcallError;
use crate::gemini::client::DEFAULT_BASE_URL;
use crate::intake::SizeLimits;
use crate::ladder::FallbackLadder;

/// Value shipped in `.env` templates; never a real key.
pub const PLACEHOLDER_API_KEY: &str = "your_gemini_api_key_here";

pub const DEFAULT_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.0-flash", "gemini-1.5-flash"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Models in the order they are tried.
    pub models: Vec<String>,
    pub base_url: String,
    pub rate_limit_wait_secs: u64,
    pub request_timeout_secs: u64,
    pub max_image_bytes: usize,
    pub max_pdf_bytes: usize,
    /// Known-lot counts above this are flagged for manual review.
    pub high_count_threshold: usize,
    pub pdf_dpi: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let limits = SizeLimits::default();
        AnalyzerConfig {
            api_key: None,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            base_url: DEFAULT_BASE_URL.into(),
            rate_limit_wait_secs: 60,
            request_timeout_secs: 120,
            max_image_bytes: limits.max_image_bytes,
            max_pdf_bytes: limits.max_pdf_bytes,
            high_count_threshold: 50,
            pdf_dpi: 144,
        }
    }
}

impl AnalyzerConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, RollcallError> {
        let text = std::fs::read_to_string(path)?;
        let config: AnalyzerConfig = serde_json::from_str(&text)
            .map_err(|e| RollcallError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Override the key and first model from `GEMINI_API_KEY` and `GEMINI_MODEL`.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| std::env::var(name).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("GEMINI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(model) = var("GEMINI_MODEL") {
            self.prefer_model(&model);
        }
    }

    /// Put `model` at the front of the fallback order.
    pub fn prefer_model(&mut self, model: &str) {
        let model = model.trim();
        if model.is_empty() {
            return;
        }
        self.models.retain(|m| m != model);
        self.models.insert(0, model.to_string());
    }

    pub fn validate(&self) -> Result<(), RollcallError> {
        if self.models.iter().all(|m| m.trim().is_empty()) {
            return Err(RollcallError::Config("at least one model is required".into()));
        }
        if self.pdf_dpi == 0 {
            return Err(RollcallError::Config("pdf_dpi must be positive".into()));
        }
        Ok(())
    }

    /// The API key, unless it is missing, blank or the template placeholder.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != PLACEHOLDER_API_KEY)
    }

    pub fn ladder(&self) -> FallbackLadder {
        FallbackLadder::new(
            self.models.iter().cloned(),
            Duration::from_secs(self.rate_limit_wait_secs),
        )
    }

    pub fn limits(&self) -> SizeLimits {
        SizeLimits {
            max_image_bytes: self.max_image_bytes,
            max_pdf_bytes: self.max_pdf_bytes,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn status(&self) -> ServiceStatus {
        let has_api_key = self.usable_api_key().is_some();
        ServiceStatus {
            configured: has_api_key && !self.models.is_empty(),
            model: self.models.first().cloned().unwrap_or_default(),
            has_api_key,
        }
    }
}

/// Whether the analyzer can reach the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub configured: bool,
    /// First model in the fallback order.
    pub model: String,
    pub has_api_key: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_hosted_service() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.models[0], "gemini-2.5-flash");
        assert_eq!(config.ladder().rate_limit_wait(), Duration::from_secs(60));
        assert_eq!(config.limits().max_image_bytes, 5 * 1024 * 1024);
        assert_eq!(config.high_count_threshold, 50);
    }

    #[test]
    fn preferred_model_moves_to_front_without_duplicates() {
        let mut config = AnalyzerConfig::default();
        config.prefer_model("gemini-2.0-flash");
        assert_eq!(
            config.models,
            ["gemini-2.0-flash", "gemini-2.5-flash", "gemini-1.5-flash"]
        );
        config.prefer_model("gemini-exp");
        assert_eq!(config.models.len(), 4);
        assert_eq!(config.models[0], "gemini-exp");
    }

    #[test]
    fn environment_sets_key_and_first_model() {
        let mut config = AnalyzerConfig::default();
        config.apply_vars(|name| match name {
            "GEMINI_API_KEY" => Some("AIza-env".into()),
            "GEMINI_MODEL" => Some("gemini-1.5-flash".into()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("AIza-env"));
        assert_eq!(config.models[0], "gemini-1.5-flash");
        assert_eq!(config.models.len(), 3);
    }

    #[test]
    fn missing_environment_leaves_defaults() {
        let mut config = AnalyzerConfig::default();
        config.apply_vars(|_| None);
        assert_eq!(config, AnalyzerConfig::default());
    }

    #[test]
    fn placeholder_key_is_not_configured() {
        let mut config = AnalyzerConfig::default();
        assert!(!config.status().configured);

        config.api_key = Some(PLACEHOLDER_API_KEY.into());
        assert!(!config.status().has_api_key);

        config.api_key = Some("AIza-real".into());
        let status = config.status();
        assert!(status.configured);
        assert_eq!(status.model, "gemini-2.5-flash");
    }

    #[test]
    fn loads_partial_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"models": ["gemini-2.0-flash"], "rate_limit_wait_secs": 5}}"#).unwrap();
        let config = AnalyzerConfig::load(file.path()).unwrap();
        assert_eq!(config.models, ["gemini-2.0-flash"]);
        assert_eq!(config.rate_limit_wait_secs, 5);
        assert_eq!(config.pdf_dpi, 144);
    }

    #[test]
    fn empty_model_list_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"models": []}}"#).unwrap();
        let err = AnalyzerConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, RollcallError::Config(_)));
    }
}
