use rollcall_core::error::RollcallError;
use rollcall_core::intake::pdftoppm::PdftoppmRasterizer;
use rollcall_core::AnalyzerConfig;

use crate::output;

pub fn run(config: &AnalyzerConfig, output_format: &str) -> Result<(), RollcallError> {
    let status = config.status();
    let pdf_support = PdftoppmRasterizer::is_available();

    match output_format {
        "json" => output::json::print(&serde_json::json!({
            "configured": status.configured,
            "model": status.model,
            "has_api_key": status.has_api_key,
            "fallback_models": config.models,
            "pdf_support": pdf_support,
        }))?,
        _ => output::table::print_status(&status, &config.models, pdf_support),
    }
    Ok(())
}
