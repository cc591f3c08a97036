//! High-level sheet analysis: validation, prompting, model fallback and
//! reply reconciliation in one place.

use crate::config::{AnalyzerConfig, ServiceStatus};
use crate::error::RollcallError;
use crate::gemini::client::GeminiClient;
use crate::gemini::{ContentGenerator, GenerateRequest};
use crate::intake::{validate_image, SheetFile};
use crate::ladder::FallbackLadder;
use crate::matching::lots::find_matching_lot;
use crate::model::{AnalysisResult, BulkFailure, BulkReport, BulkSuccess, Lot, MatchKind};
use crate::parsing::interpret_reply;
use crate::parsing::reconcile::AnalysisMode;
use crate::prompt::{known_lot_prompt, lot_identification_prompt};

pub struct Analyzer {
    generator: Box<dyn ContentGenerator>,
    ladder: FallbackLadder,
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(generator: impl ContentGenerator + 'static, config: AnalyzerConfig) -> Self {
        Analyzer {
            generator: Box::new(generator),
            ladder: config.ladder(),
            config,
        }
    }

    /// Build an analyzer backed by the Gemini REST API.
    pub fn gemini(config: AnalyzerConfig) -> Result<Self, RollcallError> {
        let key = config.usable_api_key().ok_or(RollcallError::NotConfigured)?;
        let client = GeminiClient::new(key, config.request_timeout())
            .map_err(|e| RollcallError::Config(e.to_string()))?
            .with_base_url(config.base_url.clone());
        Ok(Analyzer::new(client, config))
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn status(&self) -> ServiceStatus {
        self.config.status()
    }

    /// Count the students on a sheet that belongs to a known lot.
    pub async fn analyze_sheet(
        &self,
        file: &SheetFile,
        lot: &Lot,
    ) -> Result<AnalysisResult, RollcallError> {
        validate_image(file, self.config.max_image_bytes)?;
        tracing::info!(file = %file.name, lot = %lot.name, "analyzing sheet");

        let request = GenerateRequest::new(known_lot_prompt(&lot.name, &lot.id), file);
        self.run(&request, AnalysisMode::KnownLot).await
    }

    /// Count the students on a sheet and read which lot it belongs to.
    pub async fn analyze_with_lot_identification(
        &self,
        file: &SheetFile,
        lots: &[Lot],
    ) -> Result<AnalysisResult, RollcallError> {
        validate_image(file, self.config.max_image_bytes)?;
        tracing::info!(file = %file.name, lots = lots.len(), "analyzing sheet with lot identification");

        let request = GenerateRequest::new(lot_identification_prompt(lots), file);
        self.run(&request, AnalysisMode::IdentifyLot).await
    }

    async fn run(
        &self,
        request: &GenerateRequest,
        mode: AnalysisMode,
    ) -> Result<AnalysisResult, RollcallError> {
        let reply = self.ladder.run(self.generator.as_ref(), request).await?;
        let result = interpret_reply(
            &reply.text,
            &reply.model,
            mode,
            self.config.high_count_threshold,
        )?;
        tracing::info!(
            model = %result.model,
            count = result.count,
            confidence = %result.confidence,
            "sheet analyzed"
        );
        Ok(result)
    }

    /// Analyze many sheets one after another, assigning each to a lot.
    ///
    /// A failing sheet does not stop the run; it is reported in
    /// [`BulkReport::failed`]. `progress` receives the completed percentage
    /// after every sheet.
    pub async fn analyze_bulk(
        &self,
        files: &[SheetFile],
        lots: &[Lot],
        mut progress: impl FnMut(u8),
    ) -> Result<BulkReport, RollcallError> {
        if files.is_empty() {
            return Err(RollcallError::InvalidInput(
                "no files provided for bulk analysis".into(),
            ));
        }
        if lots.is_empty() {
            return Err(RollcallError::InvalidInput(
                "no parking lots available for matching".into(),
            ));
        }

        let mut report = BulkReport::default();
        for (i, file) in files.iter().enumerate() {
            tracing::info!(file = %file.name, index = i + 1, total = files.len(), "bulk analysis");

            match self.analyze_and_assign(file, lots).await {
                Ok(success) => report.successful.push(success),
                Err(e) => {
                    tracing::warn!(file = %file.name, error = %e, "sheet failed");
                    report.failed.push(BulkFailure {
                        file_name: file.name.clone(),
                        error: e.user_message(),
                        original_error: e.to_string(),
                    });
                }
            }

            let pct = ((i + 1) as f64 / files.len() as f64 * 100.0).round() as u8;
            progress(pct);
        }

        tracing::info!(
            successful = report.successful.len(),
            failed = report.failed.len(),
            "bulk analysis finished"
        );
        Ok(report)
    }

    async fn analyze_and_assign(
        &self,
        file: &SheetFile,
        lots: &[Lot],
    ) -> Result<BulkSuccess, RollcallError> {
        let analysis = self.analyze_with_lot_identification(file, lots).await?;
        let detected = analysis.lot_identified.clone();

        let Some(found) = find_matching_lot(&detected, lots) else {
            return Err(RollcallError::LotNotMatched { detected });
        };
        let lot = found.lot;
        let match_kind = if detected == lot.name {
            MatchKind::Exact
        } else {
            MatchKind::Fuzzy
        };

        Ok(BulkSuccess {
            file_name: file.name.clone(),
            lot_id: lot.id.clone(),
            lot_name: lot.name.clone(),
            detected_lot_name: detected,
            match_kind,
            analysis,
        })
    }
}
