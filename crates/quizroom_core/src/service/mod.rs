//! Repository wiring for core callers.
//!
//! # Responsibility
//! - Build the quiz and room repositories from one configuration and one
//!   document store.
//! - Keep CLI/API layers decoupled from storage details.
//!
//! # Invariants
//! - Both repositories share the same store instance.
//! - Configuration is validated before any repository is built.

use crate::config::{ConfigError, CoreConfig};
use crate::model::quiz::QuizSchema;
use crate::model::room::RoomSchema;
use crate::repo::quiz_repo::QuizRepository;
use crate::repo::room_repo::RoomRepository;
use crate::store::DocumentStore;

/// Quiz and room repositories over a shared store.
pub struct Repositories<St> {
    pub quizzes: QuizRepository<St>,
    pub rooms: RoomRepository<St>,
}

impl<St> Repositories<St>
where
    St: DocumentStore + Clone,
{
    /// # Errors
    /// - Any `ConfigError` reported by [`CoreConfig::validate`].
    pub fn new(store: St, config: &CoreConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            quizzes: QuizRepository::new(config.quiz_repository(), QuizSchema, store.clone()),
            rooms: RoomRepository::new(config.room_repository(), RoomSchema, store),
        })
    }
}
