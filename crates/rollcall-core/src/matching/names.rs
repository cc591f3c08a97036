//! Fuzzy matching of handwritten names against the student roster.

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::model::Student;

static SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+(?:jr\.?|sr\.?|iii?|iv|v)$").unwrap());

pub const DEFAULT_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedName {
    /// Lowercased input with suffixes and periods removed.
    pub full: String,
    pub first: String,
    pub last: String,
    /// Always "first last".
    pub normalized: String,
}

/// Split a name into first/last, accepting "Last, First" and "First Last".
pub fn normalize_name(name: &str) -> NormalizedName {
    let lowered = name.trim().to_lowercase();
    let without_suffix = SUFFIX.replace(&lowered, "");
    let cleaned = without_suffix
        .replace('.', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    let (first, last) = if let Some((last, first)) = cleaned.split_once(',') {
        let first = first.split(',').next().unwrap_or_default();
        (first.trim().to_string(), last.trim().to_string())
    } else {
        let parts: Vec<&str> = cleaned.split(' ').filter(|p| !p.is_empty()).collect();
        match parts.as_slice() {
            [] => (String::new(), String::new()),
            [only] => (String::new(), only.to_string()),
            [first, .., last] => (first.to_string(), last.to_string()),
        }
    };

    let normalized = [first.as_str(), last.as_str()]
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");

    NormalizedName {
        full: cleaned,
        first,
        last,
        normalized,
    }
}

/// Edit distance over characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

fn initial(s: &str) -> Option<char> {
    s.chars().next()
}

/// Similarity between two names, from 0 (unrelated) to 1 (same person).
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let n1 = normalize_name(a);
    let n2 = normalize_name(b);

    if n1.normalized.is_empty() || n2.normalized.is_empty() {
        return 0.0;
    }
    if n1.normalized == n2.normalized {
        return 1.0;
    }

    let last_match = !n1.last.is_empty() && n1.last == n2.last;
    let first_match = !n1.first.is_empty() && n1.first == n2.first;
    if last_match && first_match {
        return 1.0;
    }

    if last_match && !n1.first.is_empty() && !n2.first.is_empty() {
        if initial(&n1.first) == initial(&n2.first) {
            return 0.9;
        }
        if similarity(&n1.first, &n2.first) > 0.7 {
            return 0.85;
        }
    }

    if first_match && !n1.last.is_empty() && !n2.last.is_empty() {
        if similarity(&n1.last, &n2.last) > 0.7 {
            return 0.85;
        }
    }

    similarity(&n1.normalized, &n2.normalized)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameConfidence {
    Exact,
    High,
    Medium,
    Low,
    VeryLow,
}

impl NameConfidence {
    pub fn from_score(score: f64) -> NameConfidence {
        if score >= 0.95 {
            NameConfidence::Exact
        } else if score >= 0.85 {
            NameConfidence::High
        } else if score >= 0.75 {
            NameConfidence::Medium
        } else if score >= 0.7 {
            NameConfidence::Low
        } else {
            NameConfidence::VeryLow
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NameMatch<'a> {
    pub student: &'a Student,
    pub score: f64,
    pub confidence: NameConfidence,
}

/// Best-scoring roster entry at or above `threshold`. Ties keep the earlier entry.
pub fn find_best_match<'a>(
    extracted: &str,
    roster: &'a [Student],
    threshold: f64,
) -> Option<NameMatch<'a>> {
    if extracted.trim().is_empty() {
        return None;
    }
    let mut best: Option<NameMatch<'a>> = None;
    for student in roster {
        let score = name_similarity(extracted, &student.name);
        if score >= threshold && best.map_or(true, |b| score > b.score) {
            best = Some(NameMatch {
                student,
                score,
                confidence: NameConfidence::from_score(score),
            });
        }
    }
    best
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedName {
    pub extracted_name: String,
    pub student_id: String,
    pub student_name: String,
    pub score: f64,
    pub confidence: NameConfidence,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RosterMatch {
    pub matched: Vec<MatchedName>,
    pub unmatched: Vec<String>,
    /// Names whose best match was a student already matched earlier.
    pub duplicates: Vec<MatchedName>,
    /// Percentage of extracted names matched to a distinct student.
    pub match_rate: f64,
}

pub fn match_names_against_roster(
    extracted: &[String],
    roster: &[Student],
    threshold: f64,
) -> RosterMatch {
    let mut out = RosterMatch::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for name in extracted {
        let Some(m) = find_best_match(name, roster, threshold) else {
            out.unmatched.push(name.clone());
            continue;
        };
        let entry = MatchedName {
            extracted_name: name.clone(),
            student_id: m.student.id.clone(),
            student_name: m.student.name.clone(),
            score: m.score,
            confidence: m.confidence,
        };
        if seen.insert(m.student.id.as_str()) {
            out.matched.push(entry);
        } else {
            out.duplicates.push(entry);
        }
    }

    if !extracted.is_empty() {
        out.match_rate = out.matched.len() as f64 / extracted.len() as f64 * 100.0;
    }
    out
}
