use std::path::PathBuf;

use rollcall_core::error::RollcallError;
use rollcall_core::model::{BulkFailure, BulkReport};
use rollcall_core::roster::load_roster;
use rollcall_core::{Analyzer, AnalyzerConfig};

use crate::output;

pub async fn run(
    config: AnalyzerConfig,
    input_files: Vec<PathBuf>,
    roster_file: PathBuf,
    output_format: &str,
    output_file: Option<PathBuf>,
) -> Result<(), RollcallError> {
    let roster = load_roster(&roster_file)?;
    let analyzer = Analyzer::gemini(config)?;

    let expanded = super::load_pages(&input_files, analyzer.config());
    let rejected: Vec<BulkFailure> = expanded
        .rejected
        .into_iter()
        .map(|(file_name, e)| BulkFailure {
            file_name,
            error: e.user_message(),
            original_error: e.to_string(),
        })
        .collect();

    let mut report = if expanded.pages.is_empty() {
        BulkReport::default()
    } else {
        analyzer
            .analyze_bulk(&expanded.pages, &roster.lots, |percent| {
                tracing::info!(percent, "bulk progress");
            })
            .await?
    };
    report.failed.extend(rejected);

    match output_file {
        Some(path) => {
            // Always write JSON when saving to file
            let json = serde_json::to_string_pretty(&report)?;
            std::fs::write(&path, json)?;
            eprintln!(
                "Analyzed {} sheet(s), {} failed, written to {}",
                report.successful.len(),
                report.failed.len(),
                path.display()
            );
        }
        None => match output_format {
            "json" => output::json::print(&report)?,
            _ => output::table::print_bulk(&report),
        },
    }

    Ok(())
}
