//! Keyed document storage contract and engines.
//!
//! # Responsibility
//! - Define the storage primitives the repository layer relies on, most
//!   importantly the atomic conditional replace.
//! - Provide a SQLite engine and an in-memory engine.
//!
//! # Invariants
//! - Documents are JSON objects keyed by an integer `_id` within a collection.
//! - `find_and_replace` compares the entire stored document with the given
//!   snapshot and swaps it atomically; it never falls back to an id-only match.
//! - Engines never retry.

mod memory;
mod sqlite;

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

use crate::db::DbError;
use crate::model::EntityId;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Member holding the identity of every stored document.
pub const ID_FIELD: &str = "_id";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serialization(serde_json::Error),
    /// Connection has not been migrated to the version this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    /// Document has no integer `_id` member.
    MissingIdentity {
        collection: String,
    },
    DuplicateId {
        collection: String,
        id: EntityId,
    },
    /// Replacement document carries a different `_id` than the snapshot.
    IdentityChanged {
        expected: EntityId,
        found: EntityId,
    },
    UnsupportedFilter(String),
    /// Stored body could not be decoded as JSON.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "document serialization failed: {err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it through db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingIdentity { collection } => {
                write!(f, "document for `{collection}` has no integer `{ID_FIELD}`")
            }
            Self::DuplicateId { collection, id } => {
                write!(f, "document {id} already exists in `{collection}`")
            }
            Self::IdentityChanged { expected, found } => write!(
                f,
                "replacement document identity {found} does not match snapshot identity {expected}"
            ),
            Self::UnsupportedFilter(message) => write!(f, "unsupported filter: {message}"),
            Self::InvalidData(message) => write!(f, "invalid stored document: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Equality filter over top-level document members plus pagination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilter {
    pub equals: Vec<(String, Value)>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl DocumentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `field == value` condition. A missing member compares as `null`.
    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Rejects conditions engines cannot evaluate consistently.
    pub fn validate(&self) -> StoreResult<()> {
        for (field, value) in &self.equals {
            if field.is_empty() || field.contains('"') {
                return Err(StoreError::UnsupportedFilter(format!(
                    "invalid field name `{field}`"
                )));
            }
            if value.is_array() || value.is_object() {
                return Err(StoreError::UnsupportedFilter(format!(
                    "field `{field}` must be compared with a scalar"
                )));
            }
            if value.is_u64() && value.as_i64().is_none() {
                return Err(StoreError::UnsupportedFilter(format!(
                    "field `{field}` compared with an integer outside the i64 range"
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.equals
            .iter()
            .all(|(field, value)| document.get(field).unwrap_or(&Value::Null) == value)
    }
}

/// Durable keyed document storage.
pub trait DocumentStore {
    /// Inserts a new document; fails with `DuplicateId` when the identity exists.
    fn insert(&self, collection: &str, document: &Value) -> StoreResult<()>;

    fn find(&self, collection: &str, id: EntityId) -> StoreResult<Option<Value>>;

    /// Replaces the document that still equals `snapshot` in full.
    ///
    /// Returns the stored replacement, or `None` when no document matches
    /// (deleted or concurrently modified).
    fn find_and_replace(
        &self,
        collection: &str,
        snapshot: &Value,
        replacement: &Value,
    ) -> StoreResult<Option<Value>>;

    /// Returns whether a document was actually removed.
    fn delete(&self, collection: &str, id: EntityId) -> StoreResult<bool>;

    /// Documents matching `filter`, ordered by identity.
    fn find_many(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Vec<Value>>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn insert(&self, collection: &str, document: &Value) -> StoreResult<()> {
        (**self).insert(collection, document)
    }

    fn find(&self, collection: &str, id: EntityId) -> StoreResult<Option<Value>> {
        (**self).find(collection, id)
    }

    fn find_and_replace(
        &self,
        collection: &str,
        snapshot: &Value,
        replacement: &Value,
    ) -> StoreResult<Option<Value>> {
        (**self).find_and_replace(collection, snapshot, replacement)
    }

    fn delete(&self, collection: &str, id: EntityId) -> StoreResult<bool> {
        (**self).delete(collection, id)
    }

    fn find_many(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Vec<Value>> {
        (**self).find_many(collection, filter)
    }
}

impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    fn insert(&self, collection: &str, document: &Value) -> StoreResult<()> {
        (**self).insert(collection, document)
    }

    fn find(&self, collection: &str, id: EntityId) -> StoreResult<Option<Value>> {
        (**self).find(collection, id)
    }

    fn find_and_replace(
        &self,
        collection: &str,
        snapshot: &Value,
        replacement: &Value,
    ) -> StoreResult<Option<Value>> {
        (**self).find_and_replace(collection, snapshot, replacement)
    }

    fn delete(&self, collection: &str, id: EntityId) -> StoreResult<bool> {
        (**self).delete(collection, id)
    }

    fn find_many(&self, collection: &str, filter: &DocumentFilter) -> StoreResult<Vec<Value>> {
        (**self).find_many(collection, filter)
    }
}

/// Reads the integer `_id` of a document.
pub fn document_id(collection: &str, document: &Value) -> StoreResult<EntityId> {
    document
        .get(ID_FIELD)
        .and_then(Value::as_i64)
        .ok_or_else(|| StoreError::MissingIdentity {
            collection: collection.to_string(),
        })
}

/// Ensures a replacement keeps the snapshot's identity; returns that identity.
pub(crate) fn replacement_id(
    collection: &str,
    snapshot: &Value,
    replacement: &Value,
) -> StoreResult<EntityId> {
    let expected = document_id(collection, snapshot)?;
    let found = document_id(collection, replacement)?;
    if expected != found {
        return Err(StoreError::IdentityChanged { expected, found });
    }
    Ok(expected)
}

#[cfg(test)]
mod tests {
    use super::{document_id, replacement_id, DocumentFilter, StoreError};
    use serde_json::json;

    #[test]
    fn filter_treats_missing_member_as_null() {
        let filter = DocumentFilter::new().field_eq("description", json!(null));
        assert!(filter.matches(&json!({"_id": 1})));
        assert!(!filter.matches(&json!({"_id": 1, "description": "x"})));
    }

    #[test]
    fn filter_rejects_structured_values_and_quoted_fields() {
        assert!(DocumentFilter::new()
            .field_eq("players", json!(["a"]))
            .validate()
            .is_err());
        assert!(DocumentFilter::new()
            .field_eq("a\"b", json!(1))
            .validate()
            .is_err());
        assert!(DocumentFilter::new()
            .field_eq("owner", u64::MAX)
            .validate()
            .is_err());
        assert!(DocumentFilter::new().field_eq("code", "ABC").validate().is_ok());
    }

    #[test]
    fn document_id_requires_integer_identity() {
        assert_eq!(document_id("quizzes", &json!({"_id": 5})).unwrap(), 5);
        assert!(matches!(
            document_id("quizzes", &json!({"_id": "5"})),
            Err(StoreError::MissingIdentity { .. })
        ));
    }

    #[test]
    fn replacement_must_keep_identity() {
        let err = replacement_id("rooms", &json!({"_id": 1}), &json!({"_id": 2})).unwrap_err();
        assert!(matches!(
            err,
            StoreError::IdentityChanged {
                expected: 1,
                found: 2
            }
        ));
    }
}
