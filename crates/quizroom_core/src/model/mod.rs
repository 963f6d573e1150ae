//! Entity schemas for documents managed by the repository layer.
//!
//! # Responsibility
//! - Define the typed shape of every entity kind (Quiz, Room).
//! - Own shape coercion, derived fields and invariant checks, so the patch
//!   and repository layers can stay generic over untyped JSON.
//!
//! # Invariants
//! - Every entity is keyed by a caller-supplied `EntityId` stored as `_id`.
//! - `from_document` is the only way untyped JSON becomes an entity.
//! - Normalization is idempotent: normalizing a normalized entity is a no-op.

pub mod quiz;
pub mod room;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Opaque 64-bit identity ("snowflake") of a stored entity.
pub type EntityId = i64;

/// Fixed set of document shapes managed by the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Quiz,
    Room,
}

impl EntityKind {
    /// Stable lowercase name used in logs and errors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Room => "room",
        }
    }

    /// Collection name used when configuration does not override it.
    pub fn default_collection(self) -> &'static str {
        match self {
            Self::Quiz => "quizzes",
            Self::Room => "rooms",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape or invariant violation detected while validating an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Document could not be decoded into the entity shape.
    Shape(String),
    /// Entity could not be encoded back into a document.
    Encoding(String),
    BlankField(String),
    AnswerCountOutOfRange {
        question: usize,
        count: usize,
    },
    CorrectAnswerOutOfRange {
        question: usize,
        index: usize,
        answers: usize,
    },
    TimeLimitOutOfRange {
        question: usize,
        secs: u32,
    },
    InvalidJoinCode(String),
    DuplicatePlayer(String),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shape(message) => write!(f, "document does not match schema: {message}"),
            Self::Encoding(message) => write!(f, "entity could not be encoded: {message}"),
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::AnswerCountOutOfRange { question, count } => write!(
                f,
                "questions[{question}] has {count} answers; expected between {} and {}",
                quiz::MIN_ANSWERS,
                quiz::MAX_ANSWERS
            ),
            Self::CorrectAnswerOutOfRange {
                question,
                index,
                answers,
            } => write!(
                f,
                "questions[{question}].correct_answer ({index}) is out of range for {answers} answers"
            ),
            Self::TimeLimitOutOfRange { question, secs } => write!(
                f,
                "questions[{question}].time_limit_secs ({secs}) must be within {}..={}",
                quiz::MIN_TIME_LIMIT_SECS,
                quiz::MAX_TIME_LIMIT_SECS
            ),
            Self::InvalidJoinCode(code) => write!(
                f,
                "join code `{code}` must be 3-8 uppercase letters or digits"
            ),
            Self::DuplicatePlayer(name) => write!(f, "player `{name}` joined more than once"),
        }
    }
}

impl Error for SchemaError {}

/// Validate-and-normalize capability for one entity kind.
///
/// Implementations are stateless values handed to a `Repository` at
/// construction time.
pub trait EntitySchema {
    type Entity: Serialize + DeserializeOwned + Clone + Debug;

    fn kind(&self) -> EntityKind;

    fn identity(&self, entity: &Self::Entity) -> EntityId;

    /// Recomputes derived fields and checks invariants in place.
    fn normalize(&self, entity: &mut Self::Entity) -> Result<(), SchemaError>;

    /// Decodes untyped JSON into a normalized entity.
    ///
    /// Aliased identity fields (`id`) are coerced to `_id` here.
    fn from_document(&self, document: Value) -> Result<Self::Entity, SchemaError> {
        let mut entity: Self::Entity =
            serde_json::from_value(document).map_err(|err| SchemaError::Shape(err.to_string()))?;
        self.normalize(&mut entity)?;
        Ok(entity)
    }

    /// Encodes an entity as the document persisted in storage.
    fn to_document(&self, entity: &Self::Entity) -> Result<Value, SchemaError> {
        serde_json::to_value(entity).map_err(|err| SchemaError::Encoding(err.to_string()))
    }

    /// Runs a document through the schema and returns both typed and
    /// canonical untyped forms.
    fn canonicalize(&self, document: Value) -> Result<(Self::Entity, Value), SchemaError> {
        let entity = self.from_document(document)?;
        let canonical = self.to_document(&entity)?;
        Ok((entity, canonical))
    }
}

pub(crate) fn ensure_not_blank(field: impl Into<String>, value: &str) -> Result<(), SchemaError> {
    if value.trim().is_empty() {
        return Err(SchemaError::BlankField(field.into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{EntityKind, SchemaError};

    #[test]
    fn kinds_have_stable_names_and_collections() {
        assert_eq!(EntityKind::Quiz.as_str(), "quiz");
        assert_eq!(EntityKind::Room.default_collection(), "rooms");
        assert_eq!(EntityKind::Quiz.to_string(), "quiz");
    }

    #[test]
    fn schema_error_messages_name_the_field() {
        let err = SchemaError::CorrectAnswerOutOfRange {
            question: 1,
            index: 4,
            answers: 2,
        };
        assert!(err.to_string().contains("questions[1].correct_answer"));
    }
}
