//! Annotation records: document-level judgments and per-token entity labels.
//!
//! Two kinds of annotation exist, sharing common metadata ([`AnnotationMeta`]):
//!
//! - [`MacroAnnotation`]: a document-level judgment (relevance, abstract type,
//!   a free-form flag) with no tokens.
//! - [`TokenAnnotation`]: one entity label per token of the abstract, plus the
//!   label vocabulary used and free-form document tags.
//!
//! Annotations are created by a human submitting a tagging pass, optionally
//! authenticated once against a user-key registry, persisted once, and never
//! updated in place. Corrections are new records.

use crate::error::{Error, Result};
use crate::store::UserKeyStore;
use crate::token::Token;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::str::FromStr;

/// Metadata shared by every annotation variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationMeta {
    /// DOI of the annotated abstract.
    pub doi: String,
    /// Key of the submitting user, if known.
    pub user: Option<String>,
    /// Submission timestamp.
    pub date: DateTime<Utc>,
    /// Whether `user` was verified against the user-key registry.
    pub authenticated: bool,
}

impl AnnotationMeta {
    /// Create metadata for a fresh, unauthenticated annotation.
    #[must_use]
    pub fn new(doi: impl Into<String>, user: Option<String>) -> Self {
        Self {
            doi: doi.into(),
            user,
            date: Utc::now(),
            authenticated: false,
        }
    }

    /// Verify `user` against the key registry.
    ///
    /// Returns `Ok(false)` without querying the store when `user` is `None`.
    /// Absence of a matching key is a normal `false` result, never an error;
    /// store failures propagate unchanged. Calling twice is idempotent.
    pub fn authenticate(&mut self, keys: &dyn UserKeyStore) -> Result<bool> {
        let Some(user) = self.user.as_deref() else {
            return Ok(false);
        };
        if self.authenticated {
            return Ok(true);
        }
        if keys.contains(user)? {
            self.authenticated = true;
        }
        Ok(self.authenticated)
    }
}

/// Kind of study an abstract describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbstractType {
    /// Experimental work.
    Experiment,
    /// Theoretical work.
    Theory,
    /// Both experimental and theoretical.
    Both,
}

impl AbstractType {
    /// String form used in persisted records.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AbstractType::Experiment => "experiment",
            AbstractType::Theory => "theory",
            AbstractType::Both => "both",
        }
    }
}

impl FromStr for AbstractType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "experiment" => Ok(AbstractType::Experiment),
            "theory" => Ok(AbstractType::Theory),
            "both" => Ok(AbstractType::Both),
            other => Err(Error::invalid_input(format!(
                "unknown abstract type {other:?}"
            ))),
        }
    }
}

impl std::fmt::Display for AbstractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document-level judgment about an abstract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroAnnotation {
    /// Shared metadata.
    pub meta: AnnotationMeta,
    /// Whether the abstract is relevant to the corpus.
    pub relevant: bool,
    /// Free-form flag for strange or incomplete abstracts.
    pub flag: String,
    /// Kind of study the abstract describes.
    pub abs_type: AbstractType,
}

impl MacroAnnotation {
    /// Create a new macro annotation.
    #[must_use]
    pub fn new(
        doi: impl Into<String>,
        relevant: bool,
        flag: impl Into<String>,
        abs_type: AbstractType,
        user: Option<String>,
    ) -> Self {
        Self {
            meta: AnnotationMeta::new(doi, user),
            relevant,
            flag: flag.into(),
            abs_type,
        }
    }

    /// See [`AnnotationMeta::authenticate`].
    pub fn authenticate(&mut self, keys: &dyn UserKeyStore) -> Result<bool> {
        self.meta.authenticate(keys)
    }
}

/// One element of an agreement list: `(user, running token index, label)`.
///
/// The index is assigned by a single counter across the whole document, not
/// reset per sentence, as required by inter-annotator-agreement statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementItem {
    /// Key of the annotating user.
    pub user: Option<String>,
    /// Position of the token in document order.
    pub index: usize,
    /// Entity label of the token, `None` if unannotated.
    pub annotation: Option<String>,
}

/// A per-token entity annotation of one abstract.
///
/// `tokens` is sentence-major: the outer vec holds sentences, the inner vecs
/// hold the tokens of each sentence in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAnnotation {
    /// Shared metadata.
    pub meta: AnnotationMeta,
    /// Tokens per sentence.
    pub tokens: Vec<Vec<Token>>,
    /// Label vocabulary used for this pass.
    pub labels: BTreeSet<String>,
    /// Free-form document tags.
    pub tags: Vec<String>,
}

impl TokenAnnotation {
    /// Create a new token annotation.
    #[must_use]
    pub fn new(
        doi: impl Into<String>,
        tokens: Vec<Vec<Token>>,
        labels: BTreeSet<String>,
        tags: Vec<String>,
        user: Option<String>,
    ) -> Self {
        Self {
            meta: AnnotationMeta::new(doi, user),
            tokens,
            labels,
            tags,
        }
    }

    /// Reconstruct an annotation from a persisted document-store record.
    ///
    /// The record must carry the keys `doi`, `user`, `tokens`, `labels` and
    /// `tags`; a missing or mistyped key fails with
    /// [`Error::MalformedRecord`].
    pub fn from_record(record: &serde_json::Value) -> Result<Self> {
        let doi = require(record, "doi")?
            .as_str()
            .ok_or_else(|| Error::malformed_record("key \"doi\" is not a string"))?
            .to_string();

        let user = match require(record, "user")? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            _ => {
                return Err(Error::malformed_record(
                    "key \"user\" is neither a string nor null",
                ))
            }
        };

        let tokens: Vec<Vec<Token>> = serde_json::from_value(require(record, "tokens")?.clone())
            .map_err(|e| Error::malformed_record(format!("key \"tokens\": {e}")))?;

        let labels: BTreeSet<String> = serde_json::from_value(require(record, "labels")?.clone())
            .map_err(|e| Error::malformed_record(format!("key \"labels\": {e}")))?;

        let tags: Vec<String> = serde_json::from_value(require(record, "tags")?.clone())
            .map_err(|e| Error::malformed_record(format!("key \"tags\": {e}")))?;

        Ok(Self {
            meta: AnnotationMeta::new(doi, user),
            tokens,
            labels,
            tags,
        })
    }

    /// Document-store record shape: `{doi, tokens, labels, tags, user}`.
    ///
    /// `from_record(to_record(a))` is lossless for `doi`, `user`, `tokens`,
    /// `labels` and `tags`.
    #[must_use]
    pub fn to_record(&self) -> serde_json::Value {
        json!({
            "doi": self.meta.doi,
            "tokens": self.tokens,
            "labels": self.labels,
            "tags": self.tags,
            "user": self.meta.user,
        })
    }

    /// See [`AnnotationMeta::authenticate`].
    pub fn authenticate(&mut self, keys: &dyn UserKeyStore) -> Result<bool> {
        self.meta.authenticate(keys)
    }

    /// Convert to the IOB representation, see [`crate::iob::to_iob`].
    #[must_use]
    pub fn to_iob(&self) -> crate::iob::IobOutput {
        crate::iob::to_iob(self)
    }

    /// Convert to the IOB representation after phrasing the tokens,
    /// see [`crate::iob::to_iob_phrased`].
    pub fn to_iob_phrased(&self, phraser: &dyn crate::merge::Phraser) -> Result<crate::iob::IobOutput> {
        crate::iob::to_iob_phrased(self, phraser)
    }

    /// Collapse contiguous equally-labeled tokens into merged phrase tokens,
    /// see [`crate::merge::group_and_merge`].
    pub fn group_and_merge(&self) -> Result<Vec<Vec<crate::merge::MergedToken>>> {
        crate::merge::group_and_merge(&self.tokens)
    }

    /// Re-segment the tokens through an external phrase detector,
    /// see [`crate::merge::phrase_tokens`].
    pub fn phrase_tokens(
        &self,
        phraser: &dyn crate::merge::Phraser,
    ) -> Result<Vec<Vec<crate::token::PhrasedToken>>> {
        crate::merge::phrase_tokens(&self.tokens, phraser)
    }

    /// Score agreement with another annotation of the same document,
    /// treating `self` as gold. See [`crate::agreement::compare`].
    #[must_use]
    pub fn compare(
        &self,
        other: &TokenAnnotation,
        labels: Option<&BTreeSet<String>>,
    ) -> crate::agreement::ChunkScore {
        crate::agreement::compare(self, other, labels)
    }

    /// Flatten all tokens into agreement triples for external
    /// inter-annotator-agreement statistics.
    #[must_use]
    pub fn to_agreement_list(&self) -> Vec<AgreementItem> {
        let mut items = Vec::new();
        let mut counter = 0usize;
        for sentence in &self.tokens {
            for token in sentence {
                items.push(AgreementItem {
                    user: self.meta.user.clone(),
                    index: counter,
                    annotation: token.annotation.clone(),
                });
                counter += 1;
            }
        }
        items
    }

    /// Flatten all token labels into strings for confusion-matrix
    /// construction. An absent label renders as `"None"`.
    #[must_use]
    pub fn to_annotation_list(&self) -> Vec<String> {
        self.tokens
            .iter()
            .flatten()
            .map(|t| t.annotation.clone().unwrap_or_else(|| "None".to_string()))
            .collect()
    }
}

/// An annotation of either kind.
///
/// Variant hierarchy as a sum type: shared fields live in
/// [`AnnotationMeta`], accessible through [`Annotation::meta`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Annotation {
    /// Document-level judgment.
    Macro(MacroAnnotation),
    /// Per-token entity labels.
    Tokens(TokenAnnotation),
}

impl Annotation {
    /// Shared metadata of either variant.
    #[must_use]
    pub fn meta(&self) -> &AnnotationMeta {
        match self {
            Annotation::Macro(a) => &a.meta,
            Annotation::Tokens(a) => &a.meta,
        }
    }

    /// See [`AnnotationMeta::authenticate`].
    pub fn authenticate(&mut self, keys: &dyn UserKeyStore) -> Result<bool> {
        match self {
            Annotation::Macro(a) => a.meta.authenticate(keys),
            Annotation::Tokens(a) => a.meta.authenticate(keys),
        }
    }
}

fn require<'a>(record: &'a serde_json::Value, key: &str) -> Result<&'a serde_json::Value> {
    record
        .get(key)
        .ok_or_else(|| Error::malformed_record(format!("missing key {key:?}")))
}
