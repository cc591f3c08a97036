use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::High => write!(f, "high"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::Low => write!(f, "low"),
        }
    }
}

impl Confidence {
    /// Parse the model's confidence label. Anything unrecognised reads as low.
    pub fn from_str_loose(s: &str) -> Confidence {
        match s.trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" | "med" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

/// A parking lot a sheet can belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

impl Lot {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Lot {
            id: id.into(),
            name: name.into(),
            zone: None,
        }
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }
}

/// A student on the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

/// Normalized attendance record for one sheet image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Number of extracted names. Always equals `student_names.len()`.
    pub count: usize,
    /// What the model claimed, when it disagreed with the name list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_count: Option<f64>,
    pub student_names: Vec<String>,
    pub illegible_names: Vec<String>,
    pub lot_identified: String,
    pub zone_identified: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub event_date: String,
    pub confidence: Confidence,
    pub notes: String,
    pub model: String,
    pub raw_response: String,
    pub analyzed_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKind::Exact => write!(f, "EXACT"),
            MatchKind::Fuzzy => write!(f, "FUZZY"),
        }
    }
}

/// A sheet from a bulk run that was analyzed and assigned to a lot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSuccess {
    pub file_name: String,
    pub lot_id: String,
    pub lot_name: String,
    pub detected_lot_name: String,
    pub match_kind: MatchKind,
    pub analysis: AnalysisResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkFailure {
    pub file_name: String,
    /// User-facing explanation.
    pub error: String,
    pub original_error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkReport {
    pub successful: Vec<BulkSuccess>,
    pub failed: Vec<BulkFailure>,
}
