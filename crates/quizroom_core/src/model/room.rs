//! Room entity schema.
//!
//! A room is one live session of a quiz, joined by players through a short
//! code.
//!
//! # Invariants
//! - `id`, `code`, `owner_id` and `quiz_id` never change after creation.
//! - `code` is stored uppercase and matches `^[A-Z0-9]{3,8}$`.
//! - Player names are trimmed, non-blank and unique.

use super::{ensure_not_blank, EntityId, EntityKind, EntitySchema, SchemaError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static JOIN_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{3,8}$").expect("valid join code regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Room {
    /// Stored as `_id`; `id` is accepted on input.
    #[serde(rename = "_id", alias = "id")]
    pub id: EntityId,
    pub code: String,
    pub owner_id: EntityId,
    pub quiz_id: EntityId,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Zero-based index of the question currently shown, if a round is running.
    #[serde(default)]
    pub current_question: Option<u32>,
    #[serde(default)]
    pub players: Vec<String>,
}

fn default_active() -> bool {
    true
}

impl Room {
    pub fn new(
        id: EntityId,
        code: impl Into<String>,
        owner_id: EntityId,
        quiz_id: EntityId,
    ) -> Self {
        Self {
            id,
            code: code.into(),
            owner_id,
            quiz_id,
            is_active: true,
            current_question: None,
            players: Vec::new(),
        }
    }
}

/// Uppercases and trims a user-typed join code.
pub fn normalize_join_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Schema value for [`Room`] documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoomSchema;

impl EntitySchema for RoomSchema {
    type Entity = Room;

    fn kind(&self) -> EntityKind {
        EntityKind::Room
    }

    fn identity(&self, entity: &Room) -> EntityId {
        entity.id
    }

    fn normalize(&self, room: &mut Room) -> Result<(), SchemaError> {
        room.code = normalize_join_code(&room.code);
        if !JOIN_CODE_RE.is_match(&room.code) {
            return Err(SchemaError::InvalidJoinCode(room.code.clone()));
        }

        let mut seen = HashSet::with_capacity(room.players.len());
        for (index, player) in room.players.iter_mut().enumerate() {
            ensure_not_blank(format!("players[{index}]"), player)?;
            let trimmed = player.trim();
            if trimmed.len() != player.len() {
                *player = trimmed.to_string();
            }
            if !seen.insert(player.clone()) {
                return Err(SchemaError::DuplicatePlayer(player.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Room, RoomSchema};
    use crate::model::{EntitySchema, SchemaError};
    use serde_json::json;

    #[test]
    fn from_document_defaults_live_fields() {
        let room = RoomSchema
            .from_document(json!({"_id": 2, "code": "xyz1", "owner_id": 42, "quiz_id": 1}))
            .unwrap();

        assert_eq!(room.code, "XYZ1");
        assert!(room.is_active);
        assert_eq!(room.current_question, None);
        assert!(room.players.is_empty());
    }

    #[test]
    fn join_code_shape_is_enforced() {
        let mut room = Room::new(2, "no!", 42, 1);
        assert_eq!(
            RoomSchema.normalize(&mut room).unwrap_err(),
            SchemaError::InvalidJoinCode("NO!".to_string())
        );
    }

    #[test]
    fn players_are_trimmed_and_unique() {
        let mut room = Room::new(2, "ABCD", 42, 1);
        room.players = vec![" ada ".to_string(), "grace".to_string()];
        RoomSchema.normalize(&mut room).unwrap();
        assert_eq!(room.players, vec!["ada", "grace"]);

        room.players.push("ada".to_string());
        assert_eq!(
            RoomSchema.normalize(&mut room).unwrap_err(),
            SchemaError::DuplicatePlayer("ada".to_string())
        );
    }

    #[test]
    fn wrong_field_type_is_a_shape_error() {
        let err = RoomSchema
            .from_document(json!({
                "_id": 2, "code": "ABCD", "owner_id": 42, "quiz_id": 1, "is_active": "yes"
            }))
            .unwrap_err();
        assert!(matches!(err, SchemaError::Shape(_)));
    }
}
