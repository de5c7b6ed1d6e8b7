//! Conversion to the CoNLL-style IOB tagging scheme.
//!
//! Each token becomes one line `text<space>pos<space>label`, sentences are
//! separated by a blank line, and the label is `O` for unannotated tokens,
//! `B-<label>` at the start of an entity run and `I-<label>` inside one.
//!
//! # Example
//!
//! ```rust
//! use matanno::{iob, Token, TokenAnnotation};
//! use std::collections::BTreeSet;
//!
//! let tokens = vec![vec![
//!     Token::annotated("LiFePO4", 0, 7, "material").with_pos("NN"),
//!     Token::new("is", 8, 10).with_pos("VBZ"),
//!     Token::new("stable", 11, 17).with_pos("JJ"),
//! ]];
//! let ann = TokenAnnotation::new(
//!     "10.1000/xyz",
//!     tokens,
//!     BTreeSet::from(["material".to_string()]),
//!     vec![],
//!     None,
//! );
//!
//! let out = iob::to_iob(&ann);
//! assert_eq!(out.text, "LiFePO4 NN B-material\nis VBZ O\nstable JJ O\n\n");
//! ```

use crate::annotation::TokenAnnotation;
use crate::error::Result;
use crate::merge::{self, Phraser};
use crate::token::{PhrasedToken, Token};
use serde::{Deserialize, Serialize};

/// One token of the IOB representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IobRow {
    /// Surface text.
    pub text: String,
    /// Part-of-speech tag, if any.
    pub pos: Option<String>,
    /// IOB label: `O`, `B-<ann>` or `I-<ann>`.
    pub label: String,
}

/// The two representations of an IOB conversion, built in a single pass.
///
/// `sentences` is the structured form; `text` is the equivalent flattened
/// column-per-token block. The two always agree exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IobOutput {
    /// Rows per sentence.
    pub sentences: Vec<Vec<IobRow>>,
    /// Newline-delimited text block with a blank line after each sentence.
    pub text: String,
}

/// A word-like row that can be IOB-tagged.
trait Tagged {
    fn surface(&self) -> &str;
    fn pos(&self) -> Option<&str>;
    fn annotation(&self) -> Option<&str>;
}

impl Tagged for Token {
    fn surface(&self) -> &str {
        &self.text
    }
    fn pos(&self) -> Option<&str> {
        self.pos.as_deref()
    }
    fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }
}

impl Tagged for PhrasedToken {
    fn surface(&self) -> &str {
        &self.text
    }
    fn pos(&self) -> Option<&str> {
        self.pos.as_deref()
    }
    fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }
}

/// A missing pos tag renders as the literal `None` so the text block keeps
/// its three-column shape.
fn pos_column(pos: Option<&str>) -> &str {
    pos.unwrap_or("None")
}

fn convert<T: Tagged>(sentences: &[Vec<T>]) -> IobOutput {
    let mut rows = Vec::with_capacity(sentences.len());
    let mut text = String::new();

    for sentence in sentences {
        let mut sentence_rows = Vec::with_capacity(sentence.len());
        for (idx, token) in sentence.iter().enumerate() {
            let label = match token.annotation() {
                None => "O".to_string(),
                Some(ann) => {
                    let begins = idx == 0 || sentence[idx - 1].annotation() != Some(ann);
                    if begins {
                        format!("B-{ann}")
                    } else {
                        format!("I-{ann}")
                    }
                }
            };
            text.push_str(token.surface());
            text.push(' ');
            text.push_str(pos_column(token.pos()));
            text.push(' ');
            text.push_str(&label);
            text.push('\n');
            sentence_rows.push(IobRow {
                text: token.surface().to_string(),
                pos: token.pos().map(str::to_string),
                label,
            });
        }
        // Empty sentences contribute no rows but keep their blank line.
        text.push('\n');
        rows.push(sentence_rows);
    }

    IobOutput {
        sentences: rows,
        text,
    }
}

/// Convert an annotation to its IOB representation.
#[must_use]
pub fn to_iob(annotation: &TokenAnnotation) -> IobOutput {
    convert(&annotation.tokens)
}

/// Convert an annotation to its IOB representation after re-segmenting the
/// tokens through an external phrase detector.
///
/// Only useful when the downstream features come from the same word
/// embeddings that trained the phraser.
pub fn to_iob_phrased(annotation: &TokenAnnotation, phraser: &dyn Phraser) -> Result<IobOutput> {
    let phrased = merge::phrase_tokens(&annotation.tokens, phraser)?;
    Ok(convert(&phrased))
}
