use std::path::PathBuf;

use crate::gemini::GenerateError;

#[derive(Debug, thiserror::Error)]
pub enum RollcallError {
    #[error("no file provided")]
    NoFile,

    #[error("invalid file type '{0}'. Please upload a JPEG, PNG, WebP image or a PDF")]
    InvalidFileType(String),

    #[error("file too large ({size}). Maximum size is {limit}")]
    FileTooLarge { size: String, limit: String },

    #[error("pdftoppm not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PdftoppmNotFound,

    #[error("pdftoppm failed with exit code {code}: {stderr}")]
    PdftoppmFailed { code: i32, stderr: String },

    #[error("failed to process PDF: {0}")]
    Rasterize(String),

    #[error("PDF has 0 pages")]
    EmptyPdf,

    #[error("Gemini API not configured. Set GEMINI_API_KEY")]
    NotConfigured,

    #[error("no models configured for analysis")]
    NoModels,

    #[error("API rate limit exceeded. Please wait a few minutes and try again.")]
    RateLimitExceeded,

    #[error("model {model} failed: {source}")]
    Model {
        model: String,
        #[source]
        source: GenerateError,
    },

    #[error("failed to parse AI response: {0}")]
    ResponseFormat(String),

    #[error("invalid AI response: {0}")]
    InvalidResponse(String),

    #[error("could not identify lot name from image header")]
    LotNotIdentified,

    #[error("could not match lot \"{detected}\" to any available parking lot")]
    LotNotMatched { detected: String },

    #[error("{0}")]
    InvalidInput(String),

    #[error("failed to load roster from {path}: {reason}")]
    RosterLoad { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RollcallError {
    /// Message suitable for showing to the person who uploaded the sheet.
    pub fn user_message(&self) -> String {
        match self {
            RollcallError::NotConfigured => {
                "Gemini API key not configured. Please check your environment settings.".into()
            }
            RollcallError::RateLimitExceeded => {
                "API rate limit exceeded. Please wait a few minutes and try again.".into()
            }
            RollcallError::Model { source, .. } => match source {
                GenerateError::Unauthorized(_) => {
                    "Invalid API key. Please check your Gemini API configuration.".into()
                }
                GenerateError::RateLimited(_) => {
                    "API rate limit exceeded. Please wait a few minutes and try again.".into()
                }
                GenerateError::ModelNotFound(_) => {
                    "AI model not available. The service may be updating. Please try again later."
                        .into()
                }
                GenerateError::Network(_) => {
                    "Network error. Please check your internet connection and try again.".into()
                }
                GenerateError::Timeout => {
                    "Request timed out. The image may be too large or the service is slow. Please try again."
                        .into()
                }
                GenerateError::EmptyResponse | GenerateError::Api { .. } => {
                    format!("Failed to analyze image: {source}. If this persists, try a different image or use manual entry.")
                }
            },
            RollcallError::ResponseFormat(_) | RollcallError::InvalidResponse(_) => {
                "AI response format error. The image may be unclear or corrupted. Please try a clearer image."
                    .into()
            }
            RollcallError::LotNotMatched { detected } => format!(
                "Could not identify parking lot from image. Found: \"{detected}\". Please check the image quality or try manual entry."
            ),
            RollcallError::FileTooLarge { .. } => {
                "Image file is too large. Please compress the image or use a smaller file.".into()
            }
            RollcallError::InvalidFileType(_) => {
                "Invalid file format. Please use JPEG, PNG, or PDF files only.".into()
            }
            other => other.to_string(),
        }
    }
}
