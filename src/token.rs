//! Token types shared by every other component.
//!
//! A [`Token`] is one word of a tokenized abstract: surface text, character
//! offsets into the source, an optional part-of-speech tag and an optional
//! entity label. Token ids are derived from the character span alone, so two
//! independently produced tokens over the same span compare equal by id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic token identifier derived from a character span.
///
/// Format is `token-<start>-<end>`.
///
/// # Example
///
/// ```rust
/// use matanno::TokenId;
///
/// let a = TokenId::from_span(0, 7);
/// let b = TokenId::from_span(0, 7);
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "token-0-7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(String);

impl TokenId {
    /// Derive the id for a character span.
    #[must_use]
    pub fn from_span(start: usize, end: usize) -> Self {
        TokenId(format!("token-{start}-{end}"))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single token of an abstract.
///
/// `start`/`end` are character offsets into the source text. Within one
/// sentence tokens are ordered by increasing `start` and do not overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Deterministic id derived from `start`/`end`.
    pub id: TokenId,
    /// Surface text.
    pub text: String,
    /// Part-of-speech tag, if the NLP toolkit supplied one.
    #[serde(default)]
    pub pos: Option<String>,
    /// Entity label, or `None` for an unannotated token.
    #[serde(default)]
    pub annotation: Option<String>,
    /// Start character offset (inclusive).
    pub start: usize,
    /// End character offset (exclusive).
    pub end: usize,
}

impl Token {
    /// Create an unannotated token.
    #[must_use]
    pub fn new(text: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            id: TokenId::from_span(start, end),
            text: text.into(),
            pos: None,
            annotation: None,
            start,
            end,
        }
    }

    /// Create a token carrying an entity label.
    #[must_use]
    pub fn annotated(
        text: impl Into<String>,
        start: usize,
        end: usize,
        annotation: impl Into<String>,
    ) -> Self {
        Self {
            annotation: Some(annotation.into()),
            ..Self::new(text, start, end)
        }
    }

    /// Set the part-of-speech tag.
    #[must_use]
    pub fn with_pos(mut self, pos: impl Into<String>) -> Self {
        self.pos = Some(pos.into());
        self
    }
}

/// A token row produced by phrasing, see [`crate::merge::phrase_tokens`].
///
/// Phrasing can fuse adjacent sub-tokens into one underscore-joined element,
/// after which the original ids and character offsets are no longer
/// recoverable. This type carries only what survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhrasedToken {
    /// Surface text, possibly an underscore-joined phrase.
    pub text: String,
    /// Part-of-speech tag, underscore-joined when the text was fused.
    pub pos: Option<String>,
    /// Entity label inherited from the merged group.
    pub annotation: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_deterministic_from_span() {
        let t1 = Token::new("LiFePO4", 0, 7);
        let t2 = Token::annotated("LiFePO4", 0, 7, "material");
        assert_eq!(t1.id, t2.id);
        assert_eq!(t1.id.as_str(), "token-0-7");
    }

    #[test]
    fn test_annotated_constructor() {
        let tok = Token::annotated("SnO2", 11, 15, "material").with_pos("NN");
        assert_eq!(tok.annotation.as_deref(), Some("material"));
        assert_eq!(tok.pos.as_deref(), Some("NN"));
        assert_eq!(tok.start, 11);
        assert_eq!(tok.end, 15);
    }

    #[test]
    fn test_serde_shape_matches_record() {
        let tok = Token::annotated("LiFePO4", 0, 7, "material");
        let value = serde_json::to_value(&tok).unwrap();
        assert_eq!(value["id"], "token-0-7");
        assert_eq!(value["text"], "LiFePO4");
        assert_eq!(value["annotation"], "material");
        assert_eq!(value["start"], 0);
        assert_eq!(value["end"], 7);

        let back: Token = serde_json::from_value(value).unwrap();
        assert_eq!(back, tok);
    }

    #[test]
    fn test_missing_pos_defaults_to_none() {
        // Records written before pos tagging existed have no "pos" key.
        let value = serde_json::json!({
            "id": "token-8-10", "text": "is", "annotation": null,
            "start": 8, "end": 10
        });
        let tok: Token = serde_json::from_value(value).unwrap();
        assert!(tok.pos.is_none());
    }
}
