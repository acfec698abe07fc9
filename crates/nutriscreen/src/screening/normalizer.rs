//! Best-effort matching of legacy stored values onto the catalog lists.
//!
//! Used only when redisplaying inconsistent historical data for editing.
//! Import validation never goes through here.

use serde::Serialize;

use super::catalog::{BARANGAYS, INCOME_BRACKETS};

const MIN_SIMILARITY: u8 = 30;

/// Catalog entry chosen for a legacy value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BestMatch {
    pub value: &'static str,
    pub similarity: u8,
}

pub fn normalize_label(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

/// Levenshtein similarity as a rounded percentage of the longer string.
pub fn similarity(left: &str, right: &str) -> u8 {
    if left == right {
        return 100;
    }
    if left.is_empty() || right.is_empty() {
        return 0;
    }

    (strsim::normalized_levenshtein(left, right) * 100.0).round() as u8
}

pub fn closest_barangay(value: &str) -> Option<BestMatch> {
    closest(value, &BARANGAYS, |_, _| false)
}

pub fn closest_income_bracket(value: &str) -> Option<BestMatch> {
    closest(value, &INCOME_BRACKETS, income_keywords_match)
}

fn closest(
    value: &str,
    candidates: &[&'static str],
    keyword_match: impl Fn(&str, &str) -> bool,
) -> Option<BestMatch> {
    let needle = normalize_label(value);
    if needle.is_empty() {
        return None;
    }

    let mut best: Option<BestMatch> = None;
    for candidate in candidates {
        let normalized = normalize_label(candidate);
        let score = if normalized == needle || keyword_match(&needle, &normalized) {
            100
        } else {
            similarity(&needle, &normalized)
        };

        if best.map_or(true, |current| score > current.similarity) {
            best = Some(BestMatch {
                value: *candidate,
                similarity: score,
            });
        }
    }

    best.filter(|found| found.similarity > MIN_SIMILARITY)
}

const INCOME_KEYWORDS: [&[&str]; 4] = [
    &["below", "poverty"],
    &["low", "12,031"],
    &["middle", "20,001"],
    &["high", "above", "40,000"],
];

/// Legacy rows often store only the bracket name or its lower bound.
fn income_keywords_match(needle: &str, candidate: &str) -> bool {
    match income_group(needle) {
        Some(group) => income_group(candidate) == Some(group),
        None => false,
    }
}

/// First keyword group present; "below" is checked before "low".
fn income_group(text: &str) -> Option<usize> {
    INCOME_KEYWORDS
        .iter()
        .position(|group| group.iter().any(|keyword| text.contains(keyword)))
}
