//! Core domain logic for quiz rooms.
//! This crate is the single source of truth for entity invariants and for the
//! guarded patch protocol.

pub mod config;
pub mod db;
pub mod guard;
pub mod logging;
pub mod model;
pub mod patch;
pub mod repo;
pub mod service;
pub mod store;

pub use config::{ConfigError, CoreConfig};
pub use guard::{check_patch, is_protected, FieldPolicy, GuardViolation};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::quiz::{Question, Quiz, QuizSchema, QuizTitle};
pub use model::room::{Room, RoomSchema};
pub use model::{EntityId, EntityKind, EntitySchema, SchemaError};
pub use patch::{PatchApplyError, PatchFormatError, PatchRequest};
pub use repo::quiz_repo::QuizRepository;
pub use repo::repository::{RepoError, RepoResult, Repository, RepositoryConfig};
pub use repo::room_repo::RoomRepository;
pub use service::Repositories;
pub use store::{
    DocumentFilter, DocumentStore, MemoryDocumentStore, SqliteDocumentStore, StoreError,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
