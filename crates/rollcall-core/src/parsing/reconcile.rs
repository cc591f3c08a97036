use crate::error::RollcallError;
use crate::model::{AnalysisResult, Confidence};
use crate::parsing::reply::RawReply;

/// Which prompt produced the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    /// The caller told the model which lot the sheet is for.
    KnownLot,
    /// The model had to read the lot from the sheet header.
    IdentifyLot,
}

/// Provenance of a reply, stamped onto the result.
#[derive(Debug, Clone)]
pub struct ReplySource<'a> {
    pub model: &'a str,
    pub raw_text: &'a str,
    pub analyzed_at: String,
}

/// Turn a validated reply into the attendance record.
///
/// The extracted name list is authoritative: `count` is its length whatever
/// the model reported, and a disagreement is recorded in the notes.
pub fn reconcile(
    raw: RawReply,
    mode: AnalysisMode,
    high_count_threshold: usize,
    source: ReplySource<'_>,
) -> Result<AnalysisResult, RollcallError> {
    if mode == AnalysisMode::IdentifyLot && raw.lot_identified.trim().is_empty() {
        return Err(RollcallError::LotNotIdentified);
    }

    let count = raw.student_names.len();
    let mut notes = raw.notes;
    let mut confidence = raw.confidence;
    let mut reported_count = None;

    if raw.student_count != count as f64 {
        tracing::warn!(
            reported = raw.student_count,
            extracted = count,
            "model count disagrees with extracted names, using extracted names"
        );
        notes.push_str(&format!(
            " [Note: AI reported count {} adjusted to match {} extracted names]",
            raw.student_count, count
        ));
        reported_count = Some(raw.student_count);
    }

    if mode == AnalysisMode::KnownLot && count > high_count_threshold {
        tracing::warn!(count, "unusually high student count");
        notes.push_str(" WARNING: Unusually high count detected. Please verify manually.");
        confidence = Confidence::Low;
    }

    Ok(AnalysisResult {
        count,
        reported_count,
        student_names: raw.student_names,
        illegible_names: raw.illegible_names,
        lot_identified: raw.lot_identified,
        zone_identified: raw.zone_identified,
        event_date: raw.event_date,
        confidence,
        notes,
        model: source.model.to_string(),
        raw_response: source.raw_text.to_string(),
        analyzed_at: source.analyzed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(reported: f64, names: &[&str]) -> RawReply {
        RawReply {
            student_count: reported,
            student_names: names.iter().map(|s| s.to_string()).collect(),
            illegible_names: vec![],
            lot_identified: "Lot 43".into(),
            zone_identified: String::new(),
            event_date: String::new(),
            confidence: Confidence::High,
            notes: "clear image".into(),
        }
    }

    fn source() -> ReplySource<'static> {
        ReplySource {
            model: "gemini-2.5-flash",
            raw_text: "{}",
            analyzed_at: "2025-09-14T10:00:00+00:00".into(),
        }
    }

    #[test]
    fn trusts_name_list_over_reported_count() {
        let result = reconcile(
            raw(5.0, &["A B", "C D", "E F"]),
            AnalysisMode::KnownLot,
            50,
            source(),
        )
        .unwrap();
        assert_eq!(result.count, 3);
        assert_eq!(result.reported_count, Some(5.0));
        assert_eq!(
            result.notes,
            "clear image [Note: AI reported count 5 adjusted to match 3 extracted names]"
        );
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn matching_count_leaves_notes_alone() {
        let result =
            reconcile(raw(2.0, &["A B", "C D"]), AnalysisMode::KnownLot, 50, source()).unwrap();
        assert_eq!(result.count, 2);
        assert_eq!(result.reported_count, None);
        assert_eq!(result.notes, "clear image");
    }

    #[test]
    fn high_count_forces_low_confidence_for_known_lot() {
        let names: Vec<String> = (0..4).map(|i| format!("Student {i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let result = reconcile(raw(4.0, &refs), AnalysisMode::KnownLot, 3, source()).unwrap();
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result
            .notes
            .ends_with(" WARNING: Unusually high count detected. Please verify manually."));
    }

    #[test]
    fn high_count_is_not_flagged_when_identifying_lot() {
        let result = reconcile(
            raw(4.0, &["a", "b", "c", "d"]),
            AnalysisMode::IdentifyLot,
            3,
            source(),
        )
        .unwrap();
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn identify_mode_requires_lot() {
        let mut reply = raw(0.0, &[]);
        reply.lot_identified = "   ".into();
        let err = reconcile(reply, AnalysisMode::IdentifyLot, 50, source()).unwrap_err();
        assert!(matches!(err, RollcallError::LotNotIdentified));
    }

    #[test]
    fn fractional_report_is_noted() {
        let result = reconcile(raw(1.5, &["A B"]), AnalysisMode::KnownLot, 50, source()).unwrap();
        assert!(result.notes.contains("AI reported count 1.5 adjusted to match 1"));
    }
}
