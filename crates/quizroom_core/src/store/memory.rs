//! In-memory document engine.
//!
//! Thread-safe and cheap to clone; clones share the same collections. Used by
//! tests and by callers that do not need durability.

use super::{
    document_id, replacement_id, DocumentFilter, DocumentStore, StoreError, StoreResult,
};
use crate::model::EntityId;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

type Collection = BTreeMap<EntityId, Value>;

#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        let inner = self.inner.read().expect("in-memory store lock poisoned");
        inner.get(collection).map_or(0, BTreeMap::len)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn insert(&self, collection: &str, document: &Value) -> StoreResult<()> {
        let id = document_id(collection, document)?;
        let mut inner = self.inner.write().expect("in-memory store lock poisoned");
        let documents = inner.entry(collection.to_string()).or_default();
        if documents.contains_key(&id) {
            return Err(StoreError::DuplicateId {
                collection: collection.to_string(),
                id,
            });
        }
        documents.insert(id, document.clone());
        Ok(())
    }

    fn find(&self, collection: &str, id: EntityId) -> StoreResult<Option<Value>> {
        let inner = self.inner.read().expect("in-memory store lock poisoned");
        Ok(inner
            .get(collection)
            .and_then(|documents| documents.get(&id))
            .cloned())
    }

    fn find_and_replace(
        &self,
        collection: &str,
        snapshot: &Value,
        replacement: &Value,
    ) -> StoreResult<Option<Value>> {
        let id = replacement_id(collection, snapshot, replacement)?;
        let mut inner = self.inner.write().expect("in-memory store lock poisoned");
        let Some(stored) = inner
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(&id))
        else {
            return Ok(None);
        };

        if stored != snapshot {
            return Ok(None);
        }
        *stored = replacement.clone();
        Ok(Some(replacement.clone()))
    }

    fn delete(&self, collection: &str, id: EntityId) -> StoreResult<bool> {
        let mut inner = self.inner.write().expect("in-memory store lock poisoned");
        Ok(inner
            .get_mut(collection)
            .and_then(|documents| documents.remove(&id))
            .is_some())
    }

    fn find_many(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Vec<Value>> {
        filter.validate()?;

        let inner = self.inner.read().expect("in-memory store lock poisoned");
        let Some(documents) = inner.get(collection) else {
            return Ok(Vec::new());
        };

        let limit = filter.limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(documents
            .values()
            .filter(|document| filter.matches(document))
            .skip(filter.offset as usize)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryDocumentStore;
    use crate::store::{DocumentFilter, DocumentStore, StoreError};
    use serde_json::json;

    #[test]
    fn insert_rejects_duplicate_identity() {
        let store = MemoryDocumentStore::new();
        store.insert("quizzes", &json!({"_id": 1})).unwrap();

        assert!(matches!(
            store.insert("quizzes", &json!({"_id": 1})),
            Err(StoreError::DuplicateId { id: 1, .. })
        ));
        assert_eq!(store.len("quizzes"), 1);
    }

    #[test]
    fn collections_are_isolated() {
        let store = MemoryDocumentStore::new();
        store.insert("quizzes", &json!({"_id": 1})).unwrap();

        assert!(store.find("rooms", 1).unwrap().is_none());
        assert!(!store.delete("rooms", 1).unwrap());
        assert!(store.delete("quizzes", 1).unwrap());
    }

    #[test]
    fn replace_requires_full_snapshot_match() {
        let store = MemoryDocumentStore::new();
        store.insert("rooms", &json!({"_id": 2, "is_active": true})).unwrap();

        let stale = json!({"_id": 2, "is_active": false});
        assert!(store
            .find_and_replace("rooms", &stale, &json!({"_id": 2, "is_active": true}))
            .unwrap()
            .is_none());

        let current = store.find("rooms", 2).unwrap().unwrap();
        let next = json!({"_id": 2, "is_active": false});
        assert_eq!(
            store.find_and_replace("rooms", &current, &next).unwrap(),
            Some(next.clone())
        );
        assert_eq!(store.find("rooms", 2).unwrap(), Some(next));
    }

    #[test]
    fn find_many_paginates_in_identity_order() {
        let store = MemoryDocumentStore::new();
        for id in [3, 1, 2] {
            store.insert("quizzes", &json!({"_id": id, "owner": 7})).unwrap();
        }

        let page = store
            .find_many("quizzes", &DocumentFilter::new().field_eq("owner", 7).offset(1).limit(1))
            .unwrap();
        assert_eq!(page, vec![json!({"_id": 2, "owner": 7})]);
    }
}
