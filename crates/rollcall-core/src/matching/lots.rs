//! Matching a lot name read off a sheet header against the known lots.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::model::{AnalysisResult, Confidence, Lot};

static COMBINED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+(?:and|&)\s+(.+)$").unwrap());

static LOT_NUMBER_WITH_DIRECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"lot\s*#?\s*(\d+)\s*([nsew]{1,2}\b)?|^#?(\d+)\s*([nsew]{1,2}\b)?").unwrap()
});

static LOT_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"lot\s*#?\s*(\d+)").unwrap());

static ANY_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d+)\b").unwrap());

/// The second branch catches "lot48"; its digit is put back by the replacement.
static LOT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(?:parking lot|lot|pl)\b\s*|lot(\d))").unwrap());

static TRAILING_LOT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*lot\s*$").unwrap());

static ZONE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^zone\s*").unwrap());

const KEYWORD_STOP_WORDS: &[&str] = &["lot", "and", "the", "lower", "fields"];

const PART_STOP_WORDS: &[&str] = &[
    "lot", "and", "the", "lower", "fields", "ave", "street", "road",
];

/// How a detected lot name was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Exact,
    Combined,
    CombinedPart,
    LotContainsDetected,
    DetectedContainsLot,
    Keywords,
    NumberAndDirection,
    NumberOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotMatch<'a> {
    pub lot: &'a Lot,
    pub strategy: MatchStrategy,
}

/// Resolve a lot name detected on a sheet to one of `lots`.
///
/// Strategies run from most to least specific: exact name, combined
/// "A and B" headers, containment in either direction, shared keywords,
/// then the lot number (with a compass suffix such as "NW" when present).
pub fn find_matching_lot<'a>(detected: &str, lots: &'a [Lot]) -> Option<LotMatch<'a>> {
    let normalized = detected.trim().to_lowercase();
    if normalized.is_empty() || lots.is_empty() {
        return None;
    }
    let found = |lot: &'a Lot, strategy| {
        tracing::info!(detected, lot = %lot.name, ?strategy, "lot matched");
        Some(LotMatch { lot, strategy })
    };

    if let Some(lot) = lots.iter().find(|l| lower(&l.name) == normalized) {
        return found(lot, MatchStrategy::Exact);
    }

    if let Some(caps) = COMBINED.captures(&normalized) {
        let first = caps[1].trim();
        let second = caps[2].trim();
        tracing::debug!(first, second, "detected combined lot names");

        let keywords: Vec<String> = significant_words(first)
            .chain(significant_words(second))
            .collect();
        if !keywords.is_empty() {
            if let Some(lot) = lots.iter().find(|l| {
                let name = lower(&l.name);
                keywords.iter().all(|kw| name.contains(kw.as_str()))
            }) {
                return found(lot, MatchStrategy::Combined);
            }
        }

        let first_match = match_part(first, lots);
        let second_match = match_part(second, lots);
        if let (Some(a), Some(b)) = (first_match, second_match) {
            if a.id != b.id {
                tracing::warn!(first = %a.name, second = %b.name, "both lots matched, using first");
            }
        }
        if let Some(lot) = first_match.or(second_match) {
            return found(lot, MatchStrategy::CombinedPart);
        }
    }

    if let Some(lot) = lots.iter().find(|l| lower(&l.name).contains(&normalized)) {
        return found(lot, MatchStrategy::LotContainsDetected);
    }

    if let Some(lot) = lots.iter().find(|l| normalized.contains(&lower(&l.name))) {
        return found(lot, MatchStrategy::DetectedContainsLot);
    }

    let keywords: Vec<String> = significant_words(&normalized)
        .filter(|w| !KEYWORD_STOP_WORDS.contains(&w.as_str()))
        .collect();
    if !keywords.is_empty() {
        if let Some(lot) = lots.iter().find(|l| {
            let name = lower(&l.name);
            let hits = keywords.iter().filter(|kw| name.contains(kw.as_str())).count();
            hits >= 2 || (hits == 1 && keywords.len() == 1)
        }) {
            return found(lot, MatchStrategy::Keywords);
        }
    }

    if let Some(caps) = LOT_NUMBER_WITH_DIRECTION.captures(&normalized) {
        let number = caps.get(1).or_else(|| caps.get(3)).map(|m| m.as_str());
        let direction = caps.get(2).or_else(|| caps.get(4)).map(|m| m.as_str());

        if let Some(number) = number {
            if let Some(direction) = direction {
                if let Some(lot) = lots.iter().find(|l| {
                    has_lot_number(&l.name, number) && has_word(&l.name, direction)
                }) {
                    return found(lot, MatchStrategy::NumberAndDirection);
                }
            }

            if let Some(lot) = lots.iter().find(|l| has_lot_number(&l.name, number)) {
                tracing::warn!(
                    detected,
                    lot = %lot.name,
                    "matched on lot number alone, may be wrong if lots share a number"
                );
                return found(lot, MatchStrategy::NumberOnly);
            }
        }
    }

    tracing::warn!(
        detected,
        available = %lots.iter().map(|l| l.name.as_str()).collect::<Vec<_>>().join(", "),
        "no lot match"
    );
    None
}

/// Simpler matcher for one half of a combined header.
fn match_part<'a>(part: &str, lots: &'a [Lot]) -> Option<&'a Lot> {
    let normalized = part.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    if let Some(lot) = lots.iter().find(|l| lower(&l.name) == normalized) {
        return Some(lot);
    }
    if let Some(lot) = lots.iter().find(|l| lower(&l.name).contains(&normalized)) {
        return Some(lot);
    }
    if let Some(lot) = lots.iter().find(|l| normalized.contains(&lower(&l.name))) {
        return Some(lot);
    }
    let keywords: Vec<String> = significant_words(&normalized)
        .filter(|w| !PART_STOP_WORDS.contains(&w.as_str()))
        .collect();
    lots.iter().find(|l| {
        let name = lower(&l.name);
        keywords.iter().any(|kw| name.contains(kw.as_str()))
    })
}

/// Words longer than three characters, stripped of punctuation.
fn significant_words(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| w.chars().count() > 3)
}

fn has_lot_number(name: &str, number: &str) -> bool {
    LOT_NUMBER
        .captures_iter(&lower(name))
        .any(|c| &c[1] == number)
}

fn has_word(name: &str, word: &str) -> bool {
    lower(name)
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| w == word)
}

fn lower(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Outcome of checking a detected lot name against the lot the upload was for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotComparison {
    pub matches: bool,
    pub confidence: Confidence,
    pub reason: String,
}

impl LotComparison {
    fn new(matches: bool, confidence: Confidence, reason: impl Into<String>) -> Self {
        LotComparison {
            matches,
            confidence,
            reason: reason.into(),
        }
    }

    fn score(&self) -> u8 {
        if !self.matches {
            return 0;
        }
        match self.confidence {
            Confidence::High => 3,
            Confidence::Medium => 2,
            Confidence::Low => 1,
        }
    }
}

/// Drop "lot" / "parking lot" / "pl" prefixes and punctuation.
pub fn normalize_lot_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let stripped = LOT_PREFIX.replace(&lowered, "${1}");
    stripped
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_zone(zone: &str) -> String {
    let lowered = zone.trim().to_lowercase();
    ZONE_PREFIX
        .replace(&lowered, "")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// First standalone number in a name: "Lot 48" gives "48".
pub fn extract_lot_number(name: &str) -> Option<String> {
    ANY_NUMBER.captures(name).map(|c| c[1].to_string())
}

/// Compare the lot an upload was made for with what the model read.
pub fn compare_lot_names(
    expected: &Lot,
    detected: &str,
    detected_zone: Option<&str>,
) -> LotComparison {
    if expected.name.trim().is_empty() {
        return LotComparison::new(false, Confidence::Low, "Expected lot name is missing");
    }
    if detected.trim().is_empty() {
        return LotComparison::new(
            false,
            Confidence::Low,
            "No lot name detected on sign-in sheet",
        );
    }

    let expected_name = normalize_lot_name(&expected.name);
    let detected_name = normalize_lot_name(detected);
    let expected_zone = normalize_zone(expected.zone.as_deref().unwrap_or_default());
    let detected_zone = normalize_zone(detected_zone.unwrap_or_default());

    if expected_name == detected_name {
        return LotComparison::new(true, Confidence::High, "Exact lot name match");
    }

    let expected_number = extract_lot_number(&expected.name);
    if let (Some(e), Some(d)) = (&expected_number, extract_lot_number(detected)) {
        if *e == d {
            return LotComparison::new(true, Confidence::High, format!("Lot number match ({e})"));
        }
    }

    if !expected_zone.is_empty() && expected_zone == detected_zone {
        return LotComparison::new(
            true,
            Confidence::Medium,
            format!("Zone match ({})", expected.zone.as_deref().unwrap_or_default()),
        );
    }

    if !expected_name.is_empty()
        && !detected_name.is_empty()
        && (expected_name.contains(&detected_name) || detected_name.contains(&expected_name))
    {
        return LotComparison::new(true, Confidence::Medium, "Partial lot name match");
    }

    let variations = [
        Some(TRAILING_LOT.replace(&expected_name, "").into_owned()),
        expected_number,
        expected_name.split(' ').next().map(str::to_string),
    ];
    let fuzzy = !detected_name.is_empty()
        && variations
            .into_iter()
            .flatten()
            .filter(|v| !v.is_empty())
            .any(|v| detected_name.contains(&v) || v.contains(&detected_name));
    if fuzzy {
        return LotComparison::new(true, Confidence::Medium, "Fuzzy lot name match");
    }

    LotComparison::new(
        false,
        Confidence::High,
        format!(
            "Lot name mismatch: expected \"{}\", detected \"{}\"",
            expected.name, detected
        ),
    )
}

/// The lot whose comparison scores highest; ties go to the earlier lot.
pub fn best_matching_lot<'a>(
    detected: &str,
    detected_zone: Option<&str>,
    lots: &'a [Lot],
) -> Option<&'a Lot> {
    let mut best: Option<(&Lot, u8)> = None;
    for lot in lots {
        let score = compare_lot_names(lot, detected, detected_zone).score();
        if score > best.map(|(_, s)| s).unwrap_or(0) {
            best = Some((lot, score));
        }
    }
    best.map(|(lot, _)| lot)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LotValidation {
    pub is_valid: bool,
    pub confidence: Confidence,
    pub reason: String,
    pub expected_lot: Lot,
    pub detected_lot: String,
    pub detected_zone: String,
    pub suggested_lot: Option<Lot>,
    /// Confident mismatch: the sheet most likely belongs to another lot.
    pub should_warn: bool,
}

/// Check a single-sheet analysis against the lot it was uploaded for.
pub fn validate_lot_match(
    expected: &Lot,
    analysis: &AnalysisResult,
    lots: &[Lot],
) -> LotValidation {
    let detected_lot = analysis.lot_identified.clone();
    let detected_zone = analysis.zone_identified.clone();
    let comparison = compare_lot_names(expected, &detected_lot, Some(&detected_zone));

    let suggested_lot = if !comparison.matches && !detected_lot.trim().is_empty() {
        best_matching_lot(&detected_lot, Some(&detected_zone), lots).cloned()
    } else {
        None
    };

    LotValidation {
        is_valid: comparison.matches,
        confidence: comparison.confidence,
        should_warn: !comparison.matches && comparison.confidence == Confidence::High,
        reason: comparison.reason,
        expected_lot: expected.clone(),
        detected_lot,
        detected_zone,
        suggested_lot,
    }
}
