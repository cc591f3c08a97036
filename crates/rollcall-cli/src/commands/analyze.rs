use serde::Serialize;
use std::path::PathBuf;

use rollcall_core::error::RollcallError;
use rollcall_core::matching::lots::{find_matching_lot, validate_lot_match, LotValidation};
use rollcall_core::matching::names::{match_names_against_roster, RosterMatch, DEFAULT_THRESHOLD};
use rollcall_core::model::{AnalysisResult, Lot};
use rollcall_core::roster::{load_roster, Roster};
use rollcall_core::{Analyzer, AnalyzerConfig};

use crate::output;

/// Everything learned about one page.
#[derive(Debug, Serialize)]
pub struct SheetReport {
    pub file_name: String,
    pub analysis: AnalysisResult,
    /// Roster lot the detected lot name resolved to, when identifying.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_lot: Option<Lot>,
    /// Check of the detected lot against the lot given on the command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_check: Option<LotValidation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roster_match: Option<RosterMatch>,
}

pub async fn run(
    config: AnalyzerConfig,
    input_file: PathBuf,
    lot_name: Option<String>,
    lot_id: Option<String>,
    roster_file: Option<PathBuf>,
    output_format: &str,
) -> Result<(), RollcallError> {
    let roster = match &roster_file {
        Some(path) => load_roster(path)?,
        None => Roster::default(),
    };

    let expected = lot_name.map(|name| {
        let id = lot_id.unwrap_or_else(|| name.clone());
        roster
            .lots
            .iter()
            .find(|l| l.id == id || l.name.eq_ignore_ascii_case(&name))
            .cloned()
            .unwrap_or_else(|| Lot::new(id, name))
    });
    if expected.is_none() && roster.lots.is_empty() {
        return Err(RollcallError::InvalidInput(
            "give the sheet's lot with --lot, or a --roster with lots to identify it".into(),
        ));
    }

    let analyzer = Analyzer::gemini(config)?;
    let mut expanded = super::load_pages(std::slice::from_ref(&input_file), analyzer.config());
    if let Some((_, e)) = expanded.rejected.pop() {
        return Err(e);
    }

    let mut reports = Vec::new();
    for page in &expanded.pages {
        let report = match &expected {
            Some(lot) => {
                let analysis = analyzer.analyze_sheet(page, lot).await?;
                let lot_check = (!analysis.lot_identified.is_empty())
                    .then(|| validate_lot_match(lot, &analysis, &roster.lots));
                SheetReport {
                    file_name: page.name.clone(),
                    roster_match: roster_match(&analysis, &roster),
                    analysis,
                    matched_lot: None,
                    lot_check,
                }
            }
            None => {
                let analysis = analyzer
                    .analyze_with_lot_identification(page, &roster.lots)
                    .await?;
                let matched_lot =
                    find_matching_lot(&analysis.lot_identified, &roster.lots).map(|m| m.lot.clone());
                SheetReport {
                    file_name: page.name.clone(),
                    roster_match: roster_match(&analysis, &roster),
                    analysis,
                    matched_lot,
                    lot_check: None,
                }
            }
        };
        reports.push(report);
    }

    match output_format {
        "json" => output::json::print(&reports)?,
        _ => output::table::print_sheets(&reports),
    }

    Ok(())
}

fn roster_match(analysis: &AnalysisResult, roster: &Roster) -> Option<RosterMatch> {
    if roster.students.is_empty() {
        return None;
    }
    Some(match_names_against_roster(
        &analysis.student_names,
        &roster.students,
        DEFAULT_THRESHOLD,
    ))
}
