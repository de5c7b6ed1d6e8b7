//! Glue at the tokenizer and persistence boundaries.
//!
//! The external NLP toolkit produces raw tokens and candidate entity starts;
//! [`build_tokens`] wraps them into [`Token`]s with the `material` label at
//! flagged offsets. [`AnnotationBuilder`] prepares and persists submission
//! documents and keeps the shared tag vocabulary up to date.

use crate::error::Result;
use crate::store::{AnnotationStore, TagStore};
use crate::token::Token;
use serde_json::json;
use std::collections::BTreeSet;

/// Label assigned to candidate entity tokens suggested by the toolkit.
pub const MATERIAL_LABEL: &str = "material";

/// A raw token as produced by the external tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    /// Start character offset (inclusive).
    pub start: usize,
    /// End character offset (exclusive).
    pub end: usize,
    /// Surface text.
    pub text: String,
}

impl RawToken {
    /// Create a raw token.
    #[must_use]
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// Output of the external tokenizer/entity-suggester for one document.
#[derive(Debug, Clone, Default)]
pub struct TokenizedDocument {
    /// Raw tokens per sentence, ordered by start offset.
    pub sentences: Vec<Vec<RawToken>>,
    /// Character offsets flagged as candidate entity starts.
    pub entity_starts: BTreeSet<usize>,
}

/// External tokenizer and entity-suggester boundary.
pub trait Tokenizer {
    /// Tokenize a document into sentences and flag candidate entity starts.
    fn tokenize(&self, text: &str) -> Result<TokenizedDocument>;
}

/// Wrap raw tokenizer output into the token model, assigning the
/// [`MATERIAL_LABEL`] annotation at flagged starts.
#[must_use]
pub fn build_tokens(doc: &TokenizedDocument) -> Vec<Vec<Token>> {
    doc.sentences
        .iter()
        .map(|sentence| {
            sentence
                .iter()
                .map(|raw| {
                    if doc.entity_starts.contains(&raw.start) {
                        Token::annotated(&raw.text, raw.start, raw.end, MATERIAL_LABEL)
                    } else {
                        Token::new(&raw.text, raw.start, raw.end)
                    }
                })
                .collect()
        })
        .collect()
}

/// Prepares and persists annotation submissions.
pub struct AnnotationBuilder<'a> {
    annotations: &'a dyn AnnotationStore,
    tags: &'a dyn TagStore,
}

impl<'a> AnnotationBuilder<'a> {
    /// Create a builder over store handles.
    #[must_use]
    pub fn new(annotations: &'a dyn AnnotationStore, tags: &'a dyn TagStore) -> Self {
        Self { annotations, tags }
    }

    /// Assemble the macro-style submission document,
    /// `{doi, tokens, tags, type, category, user}`.
    #[must_use]
    pub fn prepare_macro_record(
        doi: &str,
        tokens: &[Vec<Token>],
        tags: &[String],
        abs_type: &str,
        category: &str,
        user: &str,
    ) -> serde_json::Value {
        json!({
            "doi": doi,
            "tokens": tokens,
            "tags": tags,
            "type": abs_type,
            "category": category,
            "user": user,
        })
    }

    /// Persist a prepared submission document.
    pub fn insert_annotation(&self, record: &serde_json::Value) -> Result<()> {
        self.annotations.insert_macro(record)
    }

    /// Insert every missing tag into the shared vocabulary.
    ///
    /// One failing insert is logged and skipped; it never aborts the rest of
    /// the batch. Returns the number of newly inserted tags.
    pub fn update_tags(&self, tags: &[String]) -> usize {
        let mut inserted = 0;
        for tag in tags {
            match self.tags.insert_tag(tag) {
                Ok(true) => inserted += 1,
                Ok(false) => {}
                Err(e) => log::warn!("skipping tag {tag:?}: {e}"),
            }
        }
        inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemoryStore;

    fn doc() -> TokenizedDocument {
        TokenizedDocument {
            sentences: vec![
                vec![
                    RawToken::new(0, 7, "LiFePO4"),
                    RawToken::new(8, 10, "is"),
                    RawToken::new(11, 17, "stable"),
                ],
                vec![RawToken::new(18, 22, "SnO2")],
            ],
            entity_starts: BTreeSet::from([0, 18]),
        }
    }

    #[test]
    fn test_build_tokens_flags_materials() {
        let tokens = build_tokens(&doc());
        assert_eq!(tokens[0][0].annotation.as_deref(), Some("material"));
        assert!(tokens[0][1].annotation.is_none());
        assert!(tokens[0][2].annotation.is_none());
        assert_eq!(tokens[1][0].annotation.as_deref(), Some("material"));
        assert_eq!(tokens[0][0].id.as_str(), "token-0-7");
    }

    #[test]
    fn test_prepare_and_insert_macro_record() {
        let store = MemoryStore::new();
        let builder = AnnotationBuilder::new(&store, &store);

        let tokens = build_tokens(&doc());
        let record = AnnotationBuilder::prepare_macro_record(
            "10.1000/xyz",
            &tokens,
            &["battery".to_string()],
            "experiment",
            "relevant",
            "key-1",
        );
        assert_eq!(record["doi"], "10.1000/xyz");
        assert_eq!(record["type"], "experiment");
        assert_eq!(record["tokens"][0][0]["text"], "LiFePO4");

        builder.insert_annotation(&record).unwrap();
        assert_eq!(store.macro_count(), 1);
    }

    #[test]
    fn test_update_tags_dedup_and_skip() {
        let store = MemoryStore::new();
        let builder = AnnotationBuilder::new(&store, &store);

        let inserted = builder.update_tags(&[
            "battery".to_string(),
            "cathode".to_string(),
            "battery".to_string(),
        ]);
        assert_eq!(inserted, 2);
        assert_eq!(store.all_tags().unwrap(), vec!["battery", "cathode"]);
    }

    #[test]
    fn test_update_tags_continues_after_failure() {
        struct FlakyTags {
            inner: MemoryStore,
        }
        impl TagStore for FlakyTags {
            fn all_tags(&self) -> Result<Vec<String>> {
                self.inner.all_tags()
            }
            fn insert_tag(&self, tag: &str) -> Result<bool> {
                if tag == "bad" {
                    return Err(Error::store("write refused"));
                }
                self.inner.insert_tag(tag)
            }
        }

        let store = MemoryStore::new();
        let tags = FlakyTags {
            inner: MemoryStore::new(),
        };
        let builder = AnnotationBuilder::new(&store, &tags);

        let inserted = builder.update_tags(&[
            "battery".to_string(),
            "bad".to_string(),
            "cathode".to_string(),
        ]);
        // The failing tag is skipped, the rest land.
        assert_eq!(inserted, 2);
        assert_eq!(tags.all_tags().unwrap(), vec!["battery", "cathode"]);
    }
}
