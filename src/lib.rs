//! # matanno
//!
//! Annotation data model and inter-annotator agreement engine for
//! materials-science NER over scientific abstracts.
//!
//! - **Token model**: tokenized documents with per-token entity labels and
//!   deterministic span-derived ids
//! - **IOB conversion**: CoNLL-style inside/outside/begin tagging, structured
//!   and flat text forms from a single pass
//! - **Phrase merging**: contiguous same-label runs collapsed into phrase
//!   tokens, with optional re-segmentation through an external phrase
//!   detector
//! - **Agreement scoring**: span-exact precision/recall/F-measure between two
//!   annotations of one document
//!
//! ## Quick Start
//!
//! ```rust
//! use matanno::{Token, TokenAnnotation};
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
//!     vec!["battery".to_string()],
//!     Some("user-key".to_string()),
//! );
//!
//! let iob = ann.to_iob();
//! assert!(iob.text.starts_with("LiFePO4 NN B-material\n"));
//! ```
//!
//! ## Agreement
//!
//! ```rust
//! use matanno::{compare, Token, TokenAnnotation};
//! use std::collections::BTreeSet;
//!
//! let labels = BTreeSet::from(["material".to_string()]);
//! let gold = TokenAnnotation::new(
//!     "10.1000/xyz",
//!     vec![vec![Token::annotated("SnO2", 0, 4, "material")]],
//!     labels.clone(),
//!     vec![],
//!     None,
//! );
//! let other = gold.clone();
//!
//! let score = compare(&gold, &other, None);
//! assert_eq!(score.f_measure(), 1.0);
//! ```
//!
//! ## Boundaries
//!
//! Tokenization, entity suggestion, persistence and phrase detection are
//! external collaborators behind the [`builder::Tokenizer`], store
//! ([`store::AnnotationStore`], [`store::TagStore`], [`store::UserKeyStore`])
//! and [`merge::Phraser`] traits. The core is synchronous and owns no shared
//! mutable state beyond the one-shot authentication flag on each annotation.

#![warn(missing_docs)]

pub mod agreement;
pub mod annotation;
pub mod builder;
mod error;
pub mod iob;
pub mod merge;
pub mod store;
pub mod token;

pub use agreement::{compare, ChunkScore, LabeledSpan};
pub use annotation::{
    AbstractType, AgreementItem, Annotation, AnnotationMeta, MacroAnnotation, TokenAnnotation,
};
pub use builder::{build_tokens, AnnotationBuilder, RawToken, TokenizedDocument, Tokenizer};
pub use error::{Error, Result};
pub use iob::{IobOutput, IobRow};
pub use merge::{group_and_merge, phrase_tokens, IdentityPhraser, MergedToken, Phraser};
pub use store::{AnnotationStore, MemoryStore, TagStore, UserKeyStore};
pub use token::{PhrasedToken, Token, TokenId};
