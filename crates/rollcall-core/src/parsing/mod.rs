pub mod reconcile;
pub mod reply;

use crate::error::RollcallError;
use crate::model::AnalysisResult;
use reconcile::{reconcile, AnalysisMode, ReplySource};
use reply::parse_reply;

/// Parse a model reply and reconcile it into an [`AnalysisResult`].
pub fn interpret_reply(
    text: &str,
    model: &str,
    mode: AnalysisMode,
    high_count_threshold: usize,
) -> Result<AnalysisResult, RollcallError> {
    let raw = parse_reply(text)?;
    reconcile(
        raw,
        mode,
        high_count_threshold,
        ReplySource {
            model,
            raw_text: text,
            analyzed_at: chrono::Utc::now().to_rfc3339(),
        },
    )
}
