//! Persistence boundary: store traits and an in-memory implementation.
//!
//! The core never opens database connections; it receives handles
//! implementing these traits. Registries are append-mostly from the core's
//! perspective, and read-after-write consistency is the store's concern.

use crate::annotation::TokenAnnotation;
use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::sync::Mutex;

/// Store of annotation documents.
pub trait AnnotationStore {
    /// Insert a macro-style submission document,
    /// `{doi, tokens, tags, type, category, user}`.
    fn insert_macro(&self, record: &serde_json::Value) -> Result<()>;

    /// Insert a full token annotation, persisted in its record shape
    /// (`{doi, tokens, labels, tags, user}`).
    fn insert_tokens(&self, annotation: &TokenAnnotation) -> Result<()>;

    /// Find a persisted token-annotation record by document and user.
    fn find_tokens(&self, doi: &str, user: &str) -> Result<Option<serde_json::Value>>;
}

/// Shared tag vocabulary, deduplicated by exact string match.
pub trait TagStore {
    /// All known tags.
    fn all_tags(&self) -> Result<Vec<String>>;

    /// Insert a tag if absent. Returns whether it was newly inserted.
    fn insert_tag(&self, tag: &str) -> Result<bool>;
}

/// Registry of user keys.
pub trait UserKeyStore {
    /// Whether a record with this exact key exists.
    fn contains(&self, key: &str) -> Result<bool>;
}

/// In-process store implementing all three trait boundaries.
///
/// Backed by mutexes so independent worker threads can share one handle.
/// Used by tests and demos; production deployments substitute a
/// document-store-backed implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    macros: Mutex<Vec<serde_json::Value>>,
    token_annotations: Mutex<Vec<serde_json::Value>>,
    tags: Mutex<BTreeSet<String>>,
    user_keys: Mutex<BTreeSet<String>>,
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user key.
    pub fn add_user_key(&self, key: impl Into<String>) -> Result<()> {
        lock(&self.user_keys).insert(key.into());
        Ok(())
    }

    /// Number of persisted macro documents.
    #[must_use]
    pub fn macro_count(&self) -> usize {
        lock(&self.macros).len()
    }

    /// Number of persisted token-annotation documents.
    #[must_use]
    pub fn token_annotation_count(&self) -> usize {
        lock(&self.token_annotations).len()
    }
}

impl AnnotationStore for MemoryStore {
    fn insert_macro(&self, record: &serde_json::Value) -> Result<()> {
        if !record.is_object() {
            return Err(Error::store("macro record must be an object"));
        }
        lock(&self.macros).push(record.clone());
        Ok(())
    }

    fn insert_tokens(&self, annotation: &TokenAnnotation) -> Result<()> {
        let record = annotation.to_record();
        log::debug!(
            "persisting token annotation for doi {}",
            annotation.meta.doi
        );
        lock(&self.token_annotations).push(record);
        Ok(())
    }

    fn find_tokens(&self, doi: &str, user: &str) -> Result<Option<serde_json::Value>> {
        let found = lock(&self.token_annotations)
            .iter()
            .find(|r| {
                r.get("doi").and_then(|v| v.as_str()) == Some(doi)
                    && r.get("user").and_then(|v| v.as_str()) == Some(user)
            })
            .cloned();
        Ok(found)
    }
}

impl TagStore for MemoryStore {
    fn all_tags(&self) -> Result<Vec<String>> {
        Ok(lock(&self.tags).iter().cloned().collect())
    }

    fn insert_tag(&self, tag: &str) -> Result<bool> {
        Ok(lock(&self.tags).insert(tag.to_string()))
    }
}

impl UserKeyStore for MemoryStore {
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(lock(&self.user_keys).contains(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;
    use serde_json::json;

    #[test]
    fn test_tag_dedup() {
        let store = MemoryStore::new();
        assert!(store.insert_tag("battery").unwrap());
        assert!(!store.insert_tag("battery").unwrap());
        assert!(store.insert_tag("cathode").unwrap());
        assert_eq!(store.all_tags().unwrap(), vec!["battery", "cathode"]);
    }

    #[test]
    fn test_user_key_lookup() {
        let store = MemoryStore::new();
        store.add_user_key("key-1").unwrap();
        assert!(store.contains("key-1").unwrap());
        assert!(!store.contains("key-2").unwrap());
    }

    #[test]
    fn test_token_annotation_round_trip_through_store() {
        let store = MemoryStore::new();
        let ann = TokenAnnotation::new(
            "10.1000/xyz",
            vec![vec![Token::annotated("SnO2", 0, 4, "material")]],
            BTreeSet::from(["material".to_string()]),
            vec![],
            Some("key-1".to_string()),
        );
        store.insert_tokens(&ann).unwrap();

        let record = store.find_tokens("10.1000/xyz", "key-1").unwrap().unwrap();
        let back = TokenAnnotation::from_record(&record).unwrap();
        assert_eq!(back.tokens, ann.tokens);

        assert!(store.find_tokens("10.1000/xyz", "other").unwrap().is_none());
    }

    #[test]
    fn test_macro_record_must_be_object() {
        let store = MemoryStore::new();
        assert!(store.insert_macro(&json!("not an object")).is_err());
        store
            .insert_macro(&json!({"doi": "10.1000/xyz", "user": "u"}))
            .unwrap();
        assert_eq!(store.macro_count(), 1);
    }
}
