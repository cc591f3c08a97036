pub mod analyzer;
pub mod config;
pub mod error;
pub mod gemini;
pub mod intake;
pub mod ladder;
pub mod matching;
pub mod model;
pub mod parsing;
pub mod prompt;
pub mod roster;

pub use analyzer::Analyzer;
pub use config::AnalyzerConfig;
pub use error::RollcallError;
pub use intake::SheetFile;
pub use model::{AnalysisResult, BulkReport, Confidence, Lot, Student};
