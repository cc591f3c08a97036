use rollcall_core::config::ServiceStatus;
use rollcall_core::model::{AnalysisResult, BulkReport};

use crate::commands::analyze::SheetReport;

pub fn print_sheets(reports: &[SheetReport]) {
    let multi_page = reports.len() > 1;

    for (i, report) in reports.iter().enumerate() {
        if multi_page {
            if i > 0 {
                println!();
            }
            println!("--- {} ---\n", report.file_name);
        }

        print_analysis(&report.analysis);

        if let Some(lot) = &report.matched_lot {
            println!("  Matched lot: {} ({})", lot.name, lot.id);
        } else if report.lot_check.is_none() && !report.analysis.lot_identified.is_empty() {
            println!("  Matched lot: none");
        }

        if let Some(check) = &report.lot_check {
            if check.is_valid {
                println!("  Lot check:   ok ({})", check.reason);
            } else {
                println!("  Lot check:   MISMATCH ({})", check.reason);
                if let Some(suggested) = &check.suggested_lot {
                    println!("               did you mean {} ({})?", suggested.name, suggested.id);
                }
            }
        }

        if let Some(roster) = &report.roster_match {
            println!(
                "\n  Roster: {} matched, {} unmatched, {} duplicate ({:.0}%)",
                roster.matched.len(),
                roster.unmatched.len(),
                roster.duplicates.len(),
                roster.match_rate
            );
            let width = roster
                .matched
                .iter()
                .map(|m| m.extracted_name.len())
                .max()
                .unwrap_or(10);
            for m in &roster.matched {
                println!(
                    "    {:<width$}  -> {} ({:?}, {:.2})",
                    m.extracted_name,
                    m.student_name,
                    m.confidence,
                    m.score,
                    width = width
                );
            }
            for name in &roster.unmatched {
                println!("    {name:<width$}  -> ?", width = width);
            }
        }
    }
}

fn print_analysis(analysis: &AnalysisResult) {
    println!(
        "  Students: {}  (confidence: {}, model: {})",
        analysis.count, analysis.confidence, analysis.model
    );
    if !analysis.lot_identified.is_empty() {
        let zone = if analysis.zone_identified.is_empty() {
            String::new()
        } else {
            format!(", {}", analysis.zone_identified)
        };
        println!("  Lot on sheet: {}{zone}", analysis.lot_identified);
    }
    if !analysis.event_date.is_empty() {
        println!("  Event date:   {}", analysis.event_date);
    }
    println!();

    for (n, name) in analysis.student_names.iter().enumerate() {
        println!("  {:>3}. {name}", n + 1);
    }
    if !analysis.illegible_names.is_empty() {
        println!("\n  Illegible:");
        for name in &analysis.illegible_names {
            println!("       {name}");
        }
    }
    if !analysis.notes.trim().is_empty() {
        println!("\n  Notes: {}", analysis.notes.trim());
    }
}

pub fn print_bulk(report: &BulkReport) {
    println!(
        "=== {} analyzed, {} failed ===\n",
        report.successful.len(),
        report.failed.len()
    );

    if !report.successful.is_empty() {
        let width = report
            .successful
            .iter()
            .map(|s| s.file_name.len())
            .max()
            .unwrap_or(10);
        for s in &report.successful {
            println!(
                "  {:<width$}  {:>3}  {} [{}] (read \"{}\", {})",
                s.file_name,
                s.analysis.count,
                s.lot_name,
                s.match_kind,
                s.detected_lot_name,
                s.analysis.confidence,
                width = width
            );
        }
        let total: usize = report.successful.iter().map(|s| s.analysis.count).sum();
        println!("\n  Total students: {total}");
    }

    if !report.failed.is_empty() {
        println!("\n  Failed:");
        for f in &report.failed {
            println!("    {}: {}", f.file_name, f.error);
        }
    }
}

pub fn print_status(status: &ServiceStatus, models: &[String], pdf_support: bool) {
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    println!("  Configured:  {}", yes_no(status.configured));
    println!("  API key:     {}", if status.has_api_key { "set" } else { "missing" });
    println!("  Model:       {}", status.model);
    if models.len() > 1 {
        println!("  Fallbacks:   {}", models[1..].join(", "));
    }
    println!("  PDF support: {}", yes_no(pdf_support));
}
