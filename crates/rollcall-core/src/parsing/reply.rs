use serde_json::Value;

use crate::error::RollcallError;
use crate::model::Confidence;

/// The model's reply after validation, before any reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReply {
    pub student_count: f64,
    pub student_names: Vec<String>,
    pub illegible_names: Vec<String>,
    pub lot_identified: String,
    pub zone_identified: String,
    pub event_date: String,
    pub confidence: Confidence,
    pub notes: String,
}

/// Return the span from the first `{` to the last `}`.
///
/// Models wrap JSON in prose or markdown fences even when asked not to;
/// taking the outermost braces recovers the object in both cases.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Extract, parse and validate a model reply.
pub fn parse_reply(text: &str) -> Result<RawReply, RollcallError> {
    let json = extract_json_object(text).ok_or_else(|| {
        RollcallError::ResponseFormat("response was not in expected JSON format".into())
    })?;
    let value: Value = serde_json::from_str(json)
        .map_err(|e| RollcallError::ResponseFormat(format!("invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(RollcallError::ResponseFormat(
            "response JSON is not an object".into(),
        ));
    }

    let student_count = value["studentCount"].as_f64().ok_or_else(|| {
        RollcallError::InvalidResponse("studentCount must be a number".into())
    })?;
    if student_count < 0.0 {
        return Err(RollcallError::InvalidResponse(
            "studentCount cannot be negative".into(),
        ));
    }

    let student_names = match string_list(&value["studentNames"]) {
        Some(names) => names,
        None => {
            tracing::warn!("studentNames not provided or not an array, defaulting to empty");
            Vec::new()
        }
    };
    let illegible_names = string_list(&value["illegibleNames"]).unwrap_or_default();

    Ok(RawReply {
        student_count,
        student_names,
        illegible_names,
        lot_identified: string_field(&value, "lotIdentified"),
        zone_identified: string_field(&value, "zoneIdentified"),
        event_date: string_field(&value, "eventDate"),
        confidence: value["confidence"]
            .as_str()
            .map(Confidence::from_str_loose)
            .unwrap_or_default(),
        notes: string_field(&value, "notes"),
    })
}

/// `None` when the value is not an array. Non-string entries are dropped;
/// strings are kept exactly as the model wrote them.
fn string_list(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

fn string_field(value: &Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_from_prose_and_fences() {
        let text = "Here you go:\n```json\n{\"studentCount\": 1, \"x\": {\"y\": 2}}\n```\nThanks!";
        assert_eq!(
            extract_json_object(text),
            Some("{\"studentCount\": 1, \"x\": {\"y\": 2}}")
        );
    }

    #[test]
    fn no_braces_means_no_object() {
        assert_eq!(extract_json_object("I could not read the sheet."), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn parses_full_reply() {
        let reply = parse_reply(
            r#"{
                "studentCount": 2,
                "studentNames": ["Smith, John", "Emma Johnson"],
                "lotIdentified": "Lot 43",
                "zoneIdentified": "Zone 1",
                "eventDate": "September 14th",
                "confidence": "High",
                "notes": "clear",
                "illegibleNames": ["J?? Br..."]
            }"#,
        )
        .unwrap();
        assert_eq!(reply.student_count, 2.0);
        assert_eq!(reply.student_names, ["Smith, John", "Emma Johnson"]);
        assert_eq!(reply.illegible_names, ["J?? Br..."]);
        assert_eq!(reply.lot_identified, "Lot 43");
        assert_eq!(reply.event_date, "September 14th");
        assert_eq!(reply.confidence, Confidence::High);
    }

    #[test]
    fn string_count_is_rejected() {
        let err = parse_reply(r#"{"studentCount": "3", "studentNames": []}"#).unwrap_err();
        assert!(matches!(err, RollcallError::InvalidResponse(_)));
    }

    #[test]
    fn negative_count_is_rejected() {
        let err = parse_reply(r#"{"studentCount": -1}"#).unwrap_err();
        assert!(err.to_string().contains("cannot be negative"));
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let reply = parse_reply(r#"{"studentCount": 0, "studentNames": "none"}"#).unwrap();
        assert!(reply.student_names.is_empty());
        assert!(reply.illegible_names.is_empty());
        assert_eq!(reply.confidence, Confidence::Low);
        assert_eq!(reply.notes, "");
    }

    #[test]
    fn non_string_names_are_dropped() {
        let reply =
            parse_reply(r#"{"studentCount": 2, "studentNames": ["Ann Lee", 7, null, ""]}"#)
                .unwrap();
        assert_eq!(reply.student_names, ["Ann Lee", ""]);
    }

    #[test]
    fn names_are_kept_as_written() {
        let reply =
            parse_reply(r#"{"studentCount": 1, "studentNames": [" Smith,  John "]}"#).unwrap();
        assert_eq!(reply.student_names, [" Smith,  John "]);
    }

    #[test]
    fn malformed_json_is_a_format_error() {
        let err = parse_reply("{\"studentCount\": 3,,}").unwrap_err();
        assert!(matches!(err, RollcallError::ResponseFormat(_)));
    }
}
