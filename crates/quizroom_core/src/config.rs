//! Process configuration for core wiring.
//!
//! # Responsibility
//! - Collect database, logging and collection settings in one value.
//! - Read overrides from `QUIZROOM_*` environment variables.
//!
//! # Invariants
//! - Collection names are non-blank and distinct per entity kind.
//! - The configuration is read once at process start and never mutated by
//!   repositories.

use crate::logging::{default_log_level, normalize_level};
use crate::model::EntityKind;
use crate::repo::repository::RepositoryConfig;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "QUIZROOM_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "QUIZROOM_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "QUIZROOM_LOG_DIR";
pub const ENV_QUIZ_COLLECTION: &str = "QUIZROOM_QUIZ_COLLECTION";
pub const ENV_ROOM_COLLECTION: &str = "QUIZROOM_ROOM_COLLECTION";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    BlankCollection(EntityKind),
    SharedCollection(String),
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankCollection(kind) => write!(f, "{kind} collection name must not be blank"),
            Self::SharedCollection(name) => write!(
                f,
                "quiz and room repositories cannot share collection `{name}`"
            ),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite file; `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub quiz_collection: String,
    pub room_collection: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            quiz_collection: EntityKind::Quiz.default_collection().to_string(),
            room_collection: EntityKind::Room.default_collection().to_string(),
        }
    }
}

impl CoreConfig {
    /// Defaults overridden by `QUIZROOM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by values returned from `lookup`.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(collection) = read(ENV_QUIZ_COLLECTION) {
            config.quiz_collection = collection;
        }
        if let Some(collection) = read(ENV_ROOM_COLLECTION) {
            config.room_collection = collection;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(|err| ConfigError::InvalidLogLevel(err.to_string()))?;

        if self.quiz_collection.trim().is_empty() {
            return Err(ConfigError::BlankCollection(EntityKind::Quiz));
        }
        if self.room_collection.trim().is_empty() {
            return Err(ConfigError::BlankCollection(EntityKind::Room));
        }
        if self.quiz_collection == self.room_collection {
            return Err(ConfigError::SharedCollection(self.quiz_collection.clone()));
        }
        Ok(())
    }

    pub fn quiz_repository(&self) -> RepositoryConfig {
        RepositoryConfig::new(self.quiz_collection.as_str())
    }

    pub fn room_repository(&self) -> RepositoryConfig {
        RepositoryConfig::new(self.room_collection.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, ENV_LOG_LEVEL, ENV_QUIZ_COLLECTION, ENV_ROOM_COLLECTION};
    use crate::model::EntityKind;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_use_kind_collections_and_memory_db() {
        let config = CoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.quiz_collection, "quizzes");
        assert_eq!(config.room_collection, "rooms");
        assert!(config.db_path.is_none());
        assert_eq!(config.room_repository().collection, "rooms");
    }

    #[test]
    fn overrides_are_trimmed_and_blank_values_ignored() {
        let config = CoreConfig::from_lookup(lookup(&[
            (ENV_QUIZ_COLLECTION, " quiz_v2 "),
            (ENV_ROOM_COLLECTION, "   "),
            (ENV_LOG_LEVEL, "WARN"),
        ]))
        .unwrap();
        assert_eq!(config.quiz_collection, "quiz_v2");
        assert_eq!(config.room_collection, "rooms");
        assert_eq!(config.log_level, "WARN");
    }

    #[test]
    fn shared_collection_is_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[
            (ENV_QUIZ_COLLECTION, "docs"),
            (ENV_ROOM_COLLECTION, "docs"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::SharedCollection("docs".to_string()));
    }

    #[test]
    fn blank_collection_set_directly_is_rejected() {
        let config = CoreConfig {
            room_collection: String::new(),
            ..CoreConfig::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::BlankCollection(EntityKind::Room)
        );
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let err = CoreConfig::from_lookup(lookup(&[(ENV_LOG_LEVEL, "loud")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(_)));
    }
}
