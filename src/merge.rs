//! Collapsing raw OCR detections into stable subtitle spans.
//!
//! Consecutive sampled frames usually see the same on-screen subtitle with
//! small OCR differences. A greedy left-to-right pass groups detections that
//! are close in time and similar in text, emitting one span per group.

use std::collections::HashSet;
use std::hash::Hash;

use serde::Serialize;

use crate::srt::Subtitle;

/// One OCR hit for one sampled frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDetection {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// How detection text is split into tokens for similarity comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tokenization {
    /// Whitespace-separated words, for languages with spaced word boundaries.
    Words,
    /// Individual characters, for scripts written without word spacing.
    Chars,
}

/// OCR language codes whose scripts carry no whitespace word boundaries.
/// Covers the Tesseract traineddata names and the short names some other
/// OCR engines use for the same languages.
const UNSPACED_LANGS: &[&str] = &[
    "chi_sim",
    "chi_tra",
    "jpn",
    "kor",
    "ch",
    "chinese_cht",
    "japan",
    "korean",
];

impl Tokenization {
    /// Pick the tokenization mode for an OCR language code.
    pub fn for_language(lang: &str) -> Self {
        if UNSPACED_LANGS.contains(&lang) {
            Tokenization::Chars
        } else {
            Tokenization::Words
        }
    }
}

/// Jaccard index of the two texts' token sets under the given tokenization.
///
/// Returns 0.0 when both token sets are empty, so contentless detections
/// never merge with anything.
pub fn jaccard_similarity(a: &str, b: &str, tokenization: Tokenization) -> f64 {
    match tokenization {
        Tokenization::Words => set_similarity(
            a.split_whitespace().collect(),
            b.split_whitespace().collect(),
        ),
        Tokenization::Chars => set_similarity(a.chars().collect(), b.chars().collect()),
    }
}

fn set_similarity<T: Eq + Hash>(a: HashSet<T>, b: HashSet<T>) -> f64 {
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Collapse chronologically ordered detections into merged subtitle spans.
///
/// Each run is anchored at its first detection. A following detection is
/// absorbed while the gap from the current run end stays within
/// `time_threshold` (inclusive) and its similarity to the anchor text reaches
/// `similarity_threshold` (inclusive). Similarity is always measured against
/// the anchor rather than the most recently absorbed text, so slow drift
/// cannot chain unrelated lines into one span. The emitted span keeps the
/// last absorbed text, since later reads of a subtitle settling on screen
/// tend to be the most complete.
pub fn merge_similar_detections(
    detections: &[RawDetection],
    tokenization: Tokenization,
    time_threshold: f64,
    similarity_threshold: f64,
) -> Vec<Subtitle> {
    let mut merged = Vec::new();
    let mut i = 0;
    while i < detections.len() {
        let anchor = &detections[i];
        let mut run_end = anchor.end;
        let mut run_text = anchor.text.as_str();
        let mut j = i + 1;
        while j < detections.len() {
            let next = &detections[j];
            if next.start - run_end > time_threshold {
                break;
            }
            let similarity = jaccard_similarity(&anchor.text, &next.text, tokenization);
            if similarity >= similarity_threshold {
                run_end = next.end;
                run_text = &next.text;
                j += 1;
            } else {
                break;
            }
        }
        merged.push(Subtitle {
            start: anchor.start,
            end: run_end,
            text: run_text.to_string(),
        });
        i = j;
    }
    merged
}
