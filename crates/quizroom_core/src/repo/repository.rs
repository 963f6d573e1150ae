//! Generic entity repository over a document store.
//!
//! # Responsibility
//! - Provide create/get/patch/delete/list for any entity kind described by
//!   an `EntitySchema`.
//! - Run the guarded, optimistic patch protocol.
//!
//! # Invariants
//! - Write paths run documents through the schema before persistence.
//! - Read paths reject stored documents that fail the schema instead of
//!   masking them.
//! - `patch` replaces only when the stored document still equals the snapshot
//!   it read, and never retries.
//! - Repository configuration is immutable after construction.

use crate::guard::{check_patch, FieldPolicy, GuardViolation};
use crate::model::{EntityId, EntityKind, EntitySchema, SchemaError};
use crate::patch::{PatchApplyError, PatchFormatError, PatchRequest};
use crate::store::{DocumentFilter, DocumentStore, StoreError};
use log::{error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type RepoResult<T> = Result<T, RepoError>;

/// Failure kinds surfaced by repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Request body is not a well-formed operation sequence.
    MalformedPatch(PatchFormatError),
    /// One or more operations target a protected or empty path.
    ProtectedField(GuardViolation),
    NotFound(EntityId),
    /// An operation's path or `test` precondition does not hold.
    PatchApplication(PatchApplyError),
    /// Input or patched document does not satisfy the schema.
    Validation(SchemaError),
    /// The stored document changed between read and replace.
    Conflict(EntityId),
    Store(StoreError),
    /// A stored document does not satisfy the schema.
    InvalidData(String),
}

impl RepoError {
    /// Stable snake_case code for logs and API mapping.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedPatch(_) => "malformed_patch",
            Self::ProtectedField(_) => "protected_field",
            Self::NotFound(_) => "not_found",
            Self::PatchApplication(_) => "patch_application_failed",
            Self::Validation(_) => "validation_failed",
            Self::Conflict(_) => "conflict",
            Self::Store(_) => "store_error",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedPatch(err) => write!(f, "{err}"),
            Self::ProtectedField(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "entity not found: {id}"),
            Self::PatchApplication(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Conflict(id) => write!(
                f,
                "entity {id} was modified concurrently; reload it and resubmit the patch"
            ),
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid stored entity: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedPatch(err) => Some(err),
            Self::ProtectedField(err) => Some(err),
            Self::PatchApplication(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::NotFound(_) | Self::Conflict(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<PatchFormatError> for RepoError {
    fn from(value: PatchFormatError) -> Self {
        Self::MalformedPatch(value)
    }
}

impl From<GuardViolation> for RepoError {
    fn from(value: GuardViolation) -> Self {
        Self::ProtectedField(value)
    }
}

impl From<PatchApplyError> for RepoError {
    fn from(value: PatchApplyError) -> Self {
        Self::PatchApplication(value)
    }
}

impl From<SchemaError> for RepoError {
    fn from(value: SchemaError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Construction-time settings of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub collection: String,
}

impl RepositoryConfig {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }

    /// Uses the kind's default collection name.
    pub fn for_kind(kind: EntityKind) -> Self {
        Self::new(kind.default_collection())
    }
}

/// Repository for one entity kind in one collection.
pub struct Repository<S, St> {
    collection: String,
    schema: S,
    store: St,
}

impl<S, St> Repository<S, St>
where
    S: EntitySchema + FieldPolicy,
    St: DocumentStore,
{
    pub fn new(config: RepositoryConfig, schema: S, store: St) -> Self {
        Self {
            collection: config.collection,
            schema,
            store,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn kind(&self) -> EntityKind {
        self.schema.kind()
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    /// Validates and stores a new entity, returning the stored form.
    ///
    /// # Errors
    /// - `Validation` when the entity does not satisfy the schema.
    /// - `Store(DuplicateId)` when the identity is already taken.
    pub fn create(&self, entity: &S::Entity) -> RepoResult<S::Entity> {
        let document = self.schema.to_document(entity)?;
        self.create_document(document)
    }

    /// Same as [`Repository::create`] for untyped input.
    pub fn create_document(&self, document: Value) -> RepoResult<S::Entity> {
        let (entity, canonical) = self.schema.canonicalize(document)?;
        let id = self.schema.identity(&entity);

        if let Err(err) = self.store.insert(&self.collection, &canonical) {
            warn!(
                "event=entity_create module=repo status=error collection={} id={id} error={err}",
                self.collection
            );
            return Err(err.into());
        }
        info!(
            "event=entity_create module=repo status=ok collection={} id={id}",
            self.collection
        );

        let stored = self
            .store
            .find(&self.collection, id)?
            .ok_or(RepoError::NotFound(id))?;
        self.decode(stored)
    }

    /// Returns `None` when no entity has this identity.
    pub fn get(&self, id: EntityId) -> RepoResult<Option<S::Entity>> {
        self.store
            .find(&self.collection, id)?
            .map(|document| self.decode(document))
            .transpose()
    }

    /// Returns whether an entity was removed; missing identities yield `false`.
    pub fn delete(&self, id: EntityId) -> RepoResult<bool> {
        let removed = self.store.delete(&self.collection, id)?;
        info!(
            "event=entity_delete module=repo status=ok collection={} id={id} removed={removed}",
            self.collection
        );
        Ok(removed)
    }

    /// Entities matching `filter`, ordered by identity.
    pub fn list(&self, filter: &DocumentFilter) -> RepoResult<Vec<S::Entity>> {
        self.store
            .find_many(&self.collection, filter)?
            .into_iter()
            .map(|document| self.decode(document))
            .collect()
    }

    /// Applies a JSON Patch request to the entity `id`.
    ///
    /// Steps: parse, guard every pointer, read the snapshot, apply to a copy,
    /// re-validate through the schema, then conditionally replace the stored
    /// document only if it still equals the snapshot.
    ///
    /// # Errors
    /// - `MalformedPatch`, `ProtectedField`: rejected before storage is read.
    /// - `NotFound`: no entity with this identity.
    /// - `PatchApplication`: an operation could not be applied.
    /// - `Validation`: the patched document violates the schema.
    /// - `Conflict`: another writer changed the entity first. Not retried.
    pub fn patch(&self, id: EntityId, raw_patch: &Value) -> RepoResult<S::Entity> {
        let started_at = Instant::now();
        let result = self.apply_patch(id, raw_patch);
        let duration_ms = started_at.elapsed().as_millis();

        match &result {
            Ok(_) => info!(
                "event=entity_patch module=repo status=ok collection={} id={id} duration_ms={duration_ms}",
                self.collection
            ),
            Err(err @ (RepoError::Store(_) | RepoError::InvalidData(_))) => error!(
                "event=entity_patch module=repo status=error collection={} id={id} duration_ms={duration_ms} error_code={} error={err}",
                self.collection,
                err.code()
            ),
            Err(RepoError::Conflict(_)) => warn!(
                "event=entity_patch module=repo status=conflict collection={} id={id} duration_ms={duration_ms}",
                self.collection
            ),
            Err(err) => warn!(
                "event=entity_patch module=repo status=rejected collection={} id={id} duration_ms={duration_ms} error_code={}",
                self.collection,
                err.code()
            ),
        }

        result
    }

    fn apply_patch(&self, id: EntityId, raw_patch: &Value) -> RepoResult<S::Entity> {
        let patch = PatchRequest::parse(raw_patch)?;
        check_patch(&self.schema, &patch)?;

        let snapshot = self
            .store
            .find(&self.collection, id)?
            .ok_or(RepoError::NotFound(id))?;
        self.decode(snapshot.clone())?;

        let patched = patch.apply(&snapshot)?;
        let (_, replacement) = self.schema.canonicalize(patched)?;

        let stored = self
            .store
            .find_and_replace(&self.collection, &snapshot, &replacement)?
            .ok_or(RepoError::Conflict(id))?;
        self.decode(stored)
    }

    fn decode(&self, document: Value) -> RepoResult<S::Entity> {
        self.schema.from_document(document).map_err(|err| {
            RepoError::InvalidData(format!(
                "{} document in `{}`: {err}",
                self.schema.kind(),
                self.collection
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{RepoError, Repository, RepositoryConfig};
    use crate::model::quiz::{Quiz, QuizSchema};
    use crate::model::EntityKind;
    use crate::store::{DocumentStore, MemoryDocumentStore};
    use serde_json::json;

    fn quiz_repo(store: &MemoryDocumentStore) -> Repository<QuizSchema, &MemoryDocumentStore> {
        Repository::new(RepositoryConfig::for_kind(EntityKind::Quiz), QuizSchema, store)
    }

    #[test]
    fn guard_rejects_before_storage_is_read() {
        let store = MemoryDocumentStore::new();
        let repo = quiz_repo(&store);

        // Entity 1 does not exist, yet the protected path wins.
        let err = repo
            .patch(1, &json!([{"op": "replace", "path": "/owner", "value": 99}]))
            .unwrap_err();
        assert!(matches!(err, RepoError::ProtectedField(_)));
    }

    #[test]
    fn malformed_patch_is_rejected_before_not_found() {
        let store = MemoryDocumentStore::new();
        let repo = quiz_repo(&store);

        let err = repo.patch(1, &json!({"op": "remove"})).unwrap_err();
        assert_eq!(err.code(), "malformed_patch");
    }

    #[test]
    fn corrupt_stored_document_is_reported_as_invalid_data() {
        let store = MemoryDocumentStore::new();
        store
            .insert("quizzes", &json!({"_id": 1, "owner": 2}))
            .unwrap();
        let repo = quiz_repo(&store);

        assert!(matches!(repo.get(1), Err(RepoError::InvalidData(_))));
        assert!(matches!(
            repo.patch(1, &json!([])),
            Err(RepoError::InvalidData(_))
        ));
    }

    #[test]
    fn validation_error_leaves_stored_document_untouched() {
        let store = MemoryDocumentStore::new();
        let repo = quiz_repo(&store);
        repo.create(&Quiz::new(1, 42, "A")).unwrap();
        let before = store.find("quizzes", 1).unwrap();

        let err = repo
            .patch(1, &json!([{"op": "remove", "path": "/title"}]))
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
        assert_eq!(store.find("quizzes", 1).unwrap(), before);
    }

    #[test]
    fn conflict_message_asks_caller_to_reload() {
        assert!(RepoError::Conflict(3).to_string().contains("reload"));
    }
}
