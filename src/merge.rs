//! Merging contiguous equally-labeled tokens into phrase tokens.
//!
//! [`group_and_merge`] collapses each maximal run of tokens sharing one
//! annotation into a single [`MergedToken`]. [`phrase_tokens`] additionally
//! runs an external phrase detector over each merged group and ungroups the
//! result back to one row per phrase element.
//!
//! Grouping followed by phrasing followed by ungrouping is deliberately
//! lossy: once the detector fuses adjacent words, the original token
//! boundaries, ids and offsets are not recoverable. Consumers that need them
//! must keep the pre-phrasing annotation.

use crate::error::{Error, Result};
use crate::token::{PhrasedToken, Token, TokenId};
use serde::{Deserialize, Serialize};

/// A run of contiguous tokens sharing one annotation, merged into a single
/// phrase token.
///
/// `ids`, `texts` and `pos` hold one element per original sub-token, in
/// order. `start`/`end` span the whole merged range. Fields not explicitly
/// merged are copied from the first member of the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedToken {
    /// Ids of the merged sub-tokens.
    pub ids: Vec<TokenId>,
    /// Surface texts of the merged sub-tokens.
    pub texts: Vec<String>,
    /// Part-of-speech tags of the merged sub-tokens.
    pub pos: Vec<Option<String>>,
    /// Shared entity label of every member.
    pub annotation: Option<String>,
    /// Minimum start offset over the merged range.
    pub start: usize,
    /// Maximum end offset over the merged range.
    pub end: usize,
}

impl MergedToken {
    /// Start a group from a single token.
    #[must_use]
    pub fn from_token(token: &Token) -> Self {
        Self {
            ids: vec![token.id.clone()],
            texts: vec![token.text.clone()],
            pos: vec![token.pos.clone()],
            annotation: token.annotation.clone(),
            start: token.start,
            end: token.end,
        }
    }

    /// Absorb another token into the group.
    ///
    /// Fails with [`Error::MergeConflict`] when the annotations differ;
    /// no data is dropped in that case.
    pub fn absorb(&mut self, token: &Token) -> Result<()> {
        if token.annotation != self.annotation {
            return Err(Error::merge_conflict(format!(
                "cannot merge {:?} into a {:?} group",
                token.annotation, self.annotation
            )));
        }
        self.ids.push(token.id.clone());
        self.texts.push(token.text.clone());
        self.pos.push(token.pos.clone());
        self.start = self.start.min(token.start);
        self.end = self.end.max(token.end);
        Ok(())
    }
}

/// Collapse each maximal run of equally-labeled tokens into one
/// [`MergedToken`], per sentence.
///
/// A new group starts whenever the current token's annotation differs from
/// the running group's, including at the very first token. Runs in the
/// output are maximal: no two adjacent groups share an annotation.
pub fn group_and_merge(sentences: &[Vec<Token>]) -> Result<Vec<Vec<MergedToken>>> {
    let mut merged = Vec::with_capacity(sentences.len());
    for sentence in sentences {
        let mut groups: Vec<MergedToken> = Vec::new();
        for token in sentence {
            match groups.last_mut() {
                Some(group) if group.annotation == token.annotation => {
                    group.absorb(token)?;
                }
                _ => groups.push(MergedToken::from_token(token)),
            }
        }
        merged.push(groups);
    }
    Ok(merged)
}

/// External phrase-detection capability.
///
/// Given an ordered word sequence, returns an ordered sequence of possibly
/// fused elements, fusions joined with `_`. Every input word must appear
/// inside exactly one output element (total coverage).
pub trait Phraser {
    /// Phrase a word sequence.
    fn phrase(&self, words: &[String]) -> Result<Vec<String>>;
}

/// A phraser that never fuses anything. Useful as a default and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPhraser;

impl Phraser for IdentityPhraser {
    fn phrase(&self, words: &[String]) -> Result<Vec<String>> {
        Ok(words.to_vec())
    }
}

/// Group the tokens, phrase each merged group and ungroup back to one row
/// per phrase element.
///
/// Part-of-speech tags are realigned to the phrased sequence with a running
/// cursor: an element fused from `k` words takes the underscore-join of the
/// next `k` original tags; an unfused element takes the next tag unchanged.
/// A phraser output that does not cover the input fails with
/// [`Error::InvalidInput`].
pub fn phrase_tokens(
    sentences: &[Vec<Token>],
    phraser: &dyn Phraser,
) -> Result<Vec<Vec<PhrasedToken>>> {
    let grouped = group_and_merge(sentences)?;
    let mut out = Vec::with_capacity(grouped.len());

    for sentence in &grouped {
        let mut rows = Vec::new();
        for group in sentence {
            let phrased = phraser.phrase(&group.texts)?;

            // Explicit cursor into the group's original pos tags.
            let mut cursor = 0usize;
            for element in &phrased {
                let width = if element.contains('_') {
                    element.split('_').count()
                } else {
                    1
                };
                if cursor + width > group.pos.len() {
                    return Err(Error::invalid_input(format!(
                        "phraser output {element:?} extends past the {} input words",
                        group.pos.len()
                    )));
                }
                let pos = if width == 1 {
                    group.pos[cursor].clone()
                } else {
                    Some(
                        group.pos[cursor..cursor + width]
                            .iter()
                            .map(|p| p.as_deref().unwrap_or("None"))
                            .collect::<Vec<_>>()
                            .join("_"),
                    )
                };
                cursor += width;
                rows.push(PhrasedToken {
                    text: element.clone(),
                    pos,
                    annotation: group.annotation.clone(),
                });
            }
            if cursor != group.pos.len() {
                return Err(Error::invalid_input(format!(
                    "phraser output covers {cursor} of {} input words",
                    group.pos.len()
                )));
            }
        }
        out.push(rows);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fuses every multi-word group into a single underscore-joined phrase.
    struct FuseAll;

    impl Phraser for FuseAll {
        fn phrase(&self, words: &[String]) -> Result<Vec<String>> {
            if words.len() > 1 {
                Ok(vec![words.join("_")])
            } else {
                Ok(words.to_vec())
            }
        }
    }

    fn material(text: &str, start: usize, end: usize) -> Token {
        Token::annotated(text, start, end, "material").with_pos("NN")
    }

    #[test]
    fn test_merge_adjacent_same_label() {
        let sentences = vec![vec![
            material("lithium", 0, 7),
            material("iron", 8, 12),
            Token::new("anode", 13, 18).with_pos("NN"),
        ]];

        let merged = group_and_merge(&sentences).unwrap();
        assert_eq!(merged[0].len(), 2);

        let group = &merged[0][0];
        assert_eq!(group.texts, vec!["lithium", "iron"]);
        assert_eq!(group.start, 0);
        assert_eq!(group.end, 12);
        assert_eq!(group.annotation.as_deref(), Some("material"));
        assert_eq!(group.ids.len(), 2);
    }

    #[test]
    fn test_unannotated_runs_also_merge() {
        let sentences = vec![vec![
            Token::new("is", 0, 2),
            Token::new("very", 3, 7),
            Token::new("stable", 8, 14),
        ]];
        let merged = group_and_merge(&sentences).unwrap();
        assert_eq!(merged[0].len(), 1);
        assert!(merged[0][0].annotation.is_none());
        assert_eq!(merged[0][0].texts.len(), 3);
    }

    #[test]
    fn test_runs_are_maximal() {
        let sentences = vec![vec![
            material("SnO2", 0, 4),
            Token::new("is", 5, 7),
            material("Li", 8, 10),
            material("metal", 11, 16),
        ]];
        let merged = group_and_merge(&sentences).unwrap();
        // No two adjacent groups share an annotation, so re-grouping the
        // output could not merge anything further.
        for sentence in &merged {
            for pair in sentence.windows(2) {
                assert_ne!(pair[0].annotation, pair[1].annotation);
            }
        }
    }

    #[test]
    fn test_merge_conflict_law() {
        let mut group = MergedToken::from_token(&material("SnO2", 0, 4));
        let err = group.absorb(&Token::new("is", 5, 7)).unwrap_err();
        assert!(matches!(err, Error::MergeConflict(_)));
        // Nothing was absorbed.
        assert_eq!(group.texts, vec!["SnO2"]);
        assert_eq!(group.end, 4);
    }

    #[test]
    fn test_phrase_tokens_identity() {
        let sentences = vec![vec![
            material("lithium", 0, 7),
            Token::new("anode", 8, 13).with_pos("NN"),
        ]];
        let rows = phrase_tokens(&sentences, &IdentityPhraser).unwrap();
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0][0].text, "lithium");
        assert_eq!(rows[0][0].pos.as_deref(), Some("NN"));
        assert_eq!(rows[0][0].annotation.as_deref(), Some("material"));
        assert!(rows[0][1].annotation.is_none());
    }

    #[test]
    fn test_phrase_tokens_fusion_realigns_pos() {
        let sentences = vec![vec![
            Token::annotated("lithium", 0, 7, "material").with_pos("NN"),
            Token::annotated("iron", 8, 12, "material").with_pos("NNP"),
            Token::new("cathode", 13, 20).with_pos("NN"),
        ]];

        let rows = phrase_tokens(&sentences, &FuseAll).unwrap();
        // Two sub-tokens fused into one phrase row; ungrouping does not
        // reproduce the original three-token sentence.
        assert_eq!(rows[0].len(), 2);
        assert_eq!(rows[0][0].text, "lithium_iron");
        assert_eq!(rows[0][0].pos.as_deref(), Some("NN_NNP"));
        assert_eq!(rows[0][0].annotation.as_deref(), Some("material"));
        assert_eq!(rows[0][1].text, "cathode");
        assert_eq!(rows[0][1].pos.as_deref(), Some("NN"));
    }

    #[test]
    fn test_phraser_coverage_violation() {
        struct Dropping;
        impl Phraser for Dropping {
            fn phrase(&self, words: &[String]) -> Result<Vec<String>> {
                Ok(words[..words.len().saturating_sub(1)].to_vec())
            }
        }

        let sentences = vec![vec![
            material("lithium", 0, 7),
            material("iron", 8, 12),
        ]];
        let err = phrase_tokens(&sentences, &Dropping).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_phraser_overlong_output() {
        struct Inflating;
        impl Phraser for Inflating {
            fn phrase(&self, words: &[String]) -> Result<Vec<String>> {
                let mut out = words.to_vec();
                out.push("extra_word_pair".to_string());
                Ok(out)
            }
        }

        let sentences = vec![vec![material("SnO2", 0, 4)]];
        let err = phrase_tokens(&sentences, &Inflating).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_missing_pos_joined_as_none() {
        let sentences = vec![vec![
            Token::annotated("lithium", 0, 7, "material"),
            Token::annotated("iron", 8, 12, "material").with_pos("NNP"),
        ]];
        let rows = phrase_tokens(&sentences, &FuseAll).unwrap();
        assert_eq!(rows[0][0].pos.as_deref(), Some("None_NNP"));
    }
}
