//! Span-level agreement scoring between two annotations of one document.
//!
//! Both annotations are converted to the IOB text block, parsed into labeled
//! spans, and scored with standard chunk metrics treating the first
//! annotation as gold: precision, recall and F-measure over exact-match
//! spans, plus the raw correct/missed/incorrect span lists.

use crate::annotation::TokenAnnotation;
use crate::iob::to_iob;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// A labeled entity span parsed from an IOB text block.
///
/// `start`/`end` are token indices within the sentence, end exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabeledSpan {
    /// Sentence index within the document.
    pub sentence: usize,
    /// First token index of the span.
    pub start: usize,
    /// One past the last token index of the span.
    pub end: usize,
    /// Entity label.
    pub label: String,
    /// Space-joined surface text of the span.
    pub text: String,
}

/// Parse the labeled spans out of an IOB text block.
///
/// Only labels present in `labels` form spans; tokens tagged with any other
/// label behave like `O`. An `I-` tag without an open span of the same label
/// starts a new span (lenient parsing, matching common chunk readers).
#[must_use]
pub fn parse_spans(iob_text: &str, labels: &BTreeSet<String>) -> Vec<LabeledSpan> {
    let mut spans = Vec::new();
    let mut sentence = 0usize;
    let mut token_idx = 0usize;
    // (label, start index, words)
    let mut open: Option<(String, usize, Vec<String>)> = None;

    fn close(
        open: &mut Option<(String, usize, Vec<String>)>,
        spans: &mut Vec<LabeledSpan>,
        sentence: usize,
        end: usize,
    ) {
        if let Some((label, start, words)) = open.take() {
            spans.push(LabeledSpan {
                sentence,
                start,
                end,
                label,
                text: words.join(" "),
            });
        }
    }

    for line in iob_text.lines() {
        if line.is_empty() {
            close(&mut open, &mut spans, sentence, token_idx);
            sentence += 1;
            token_idx = 0;
            continue;
        }

        // Columns from the right: label, pos, then text (which may itself
        // contain spaces).
        let mut cols = line.rsplitn(3, ' ');
        let label = cols.next().unwrap_or("O");
        let _pos = cols.next();
        let text = cols.next().unwrap_or("");

        match label.split_once('-') {
            Some(("B", ann)) if labels.contains(ann) => {
                close(&mut open, &mut spans, sentence, token_idx);
                open = Some((ann.to_string(), token_idx, vec![text.to_string()]));
            }
            Some(("I", ann)) if labels.contains(ann) => match open.as_mut() {
                Some((current, _, words)) if current == ann => {
                    words.push(text.to_string());
                }
                _ => {
                    close(&mut open, &mut spans, sentence, token_idx);
                    open = Some((ann.to_string(), token_idx, vec![text.to_string()]));
                }
            },
            _ => close(&mut open, &mut spans, sentence, token_idx),
        }
        token_idx += 1;
    }
    // A well-formed block ends with a blank line, but close anyway.
    close(&mut open, &mut spans, sentence, token_idx);

    spans
}

/// Chunk-scoring result of comparing two annotations.
///
/// The first annotation is treated as gold: `missed` are gold-only spans
/// (false negatives), `incorrect` are test-only spans (false positives).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkScore {
    /// Spans present identically in both annotations.
    pub correct: Vec<LabeledSpan>,
    /// Spans present only in the gold annotation.
    pub missed: Vec<LabeledSpan>,
    /// Spans present only in the test annotation.
    pub incorrect: Vec<LabeledSpan>,
}

impl ChunkScore {
    /// Score a gold span set against a test span set by exact span identity.
    #[must_use]
    pub fn score(gold: Vec<LabeledSpan>, test: Vec<LabeledSpan>) -> Self {
        let gold_set: HashSet<&LabeledSpan> = gold.iter().collect();
        let test_set: HashSet<&LabeledSpan> = test.iter().collect();

        let mut correct: Vec<LabeledSpan> = gold
            .iter()
            .filter(|s| test_set.contains(*s))
            .cloned()
            .collect();
        let mut missed: Vec<LabeledSpan> = gold
            .iter()
            .filter(|s| !test_set.contains(*s))
            .cloned()
            .collect();
        let mut incorrect: Vec<LabeledSpan> = test
            .iter()
            .filter(|s| !gold_set.contains(*s))
            .cloned()
            .collect();

        correct.sort();
        missed.sort();
        incorrect.sort();

        Self {
            correct,
            missed,
            incorrect,
        }
    }

    /// Number of spans matched exactly in both annotations.
    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.correct.len()
    }

    /// Number of gold spans absent from the test annotation.
    #[must_use]
    pub fn missed_count(&self) -> usize {
        self.missed.len()
    }

    /// Number of test spans absent from the gold annotation.
    #[must_use]
    pub fn incorrect_count(&self) -> usize {
        self.incorrect.len()
    }

    /// Fraction of test spans that match gold. 0.0 when the test annotation
    /// has no spans.
    #[must_use]
    pub fn precision(&self) -> f64 {
        let guessed = self.correct.len() + self.incorrect.len();
        if guessed == 0 {
            return 0.0;
        }
        self.correct.len() as f64 / guessed as f64
    }

    /// Fraction of gold spans found by the test annotation. 0.0 when gold
    /// has no spans.
    #[must_use]
    pub fn recall(&self) -> f64 {
        let expected = self.correct.len() + self.missed.len();
        if expected == 0 {
            return 0.0;
        }
        self.correct.len() as f64 / expected as f64
    }

    /// Harmonic mean of precision and recall. 0.0 when both are zero.
    #[must_use]
    pub fn f_measure(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }
}

/// Compare two annotations of the same document, treating `gold` as the
/// gold standard.
///
/// When `labels` is `None`, the scored label set is the intersection of both
/// annotations' label vocabularies. Scoring is deterministic, and the
/// correct-span count is symmetric under argument swap even though precision
/// and recall trade places.
#[must_use]
pub fn compare(
    gold: &TokenAnnotation,
    test: &TokenAnnotation,
    labels: Option<&BTreeSet<String>>,
) -> ChunkScore {
    let intersection;
    let scored: &BTreeSet<String> = match labels {
        Some(set) => set,
        None => {
            intersection = gold
                .labels
                .intersection(&test.labels)
                .cloned()
                .collect::<BTreeSet<_>>();
            &intersection
        }
    };

    let gold_spans = parse_spans(&to_iob(gold).text, scored);
    let test_spans = parse_spans(&to_iob(test).text, scored);
    ChunkScore::score(gold_spans, test_spans)
}
