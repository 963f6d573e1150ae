//! Quiz entity schema.
//!
//! # Invariants
//! - `id` and `owner` never change after creation (enforced by the field
//!   guard, not here).
//! - `question_count` is derived and always equals `questions.len()`.
//! - Every question has 2..=8 answers and a `correct_answer` indexing into them.

use super::{ensure_not_blank, EntityId, EntityKind, EntitySchema, SchemaError};
use serde::{Deserialize, Serialize};

pub const MIN_ANSWERS: usize = 2;
pub const MAX_ANSWERS: usize = 8;
pub const MIN_TIME_LIMIT_SECS: u32 = 5;
pub const MAX_TIME_LIMIT_SECS: u32 = 300;
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 30;

/// Quiz authored by one owner and played in rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Quiz {
    /// Stored as `_id`; `id` is accepted on input.
    #[serde(rename = "_id", alias = "id")]
    pub id: EntityId,
    pub owner: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Derived from `questions`; any incoming value is overwritten.
    #[serde(default)]
    pub question_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Question {
    pub prompt: String,
    pub answers: Vec<String>,
    pub correct_answer: usize,
    #[serde(default = "default_time_limit")]
    pub time_limit_secs: u32,
}

fn default_time_limit() -> u32 {
    DEFAULT_TIME_LIMIT_SECS
}

impl Quiz {
    pub fn new(id: EntityId, owner: EntityId, title: impl Into<String>) -> Self {
        Self {
            id,
            owner,
            title: title.into(),
            description: None,
            questions: Vec::new(),
            question_count: 0,
        }
    }
}

impl Question {
    pub fn new(
        prompt: impl Into<String>,
        answers: impl IntoIterator<Item = impl Into<String>>,
        correct_answer: usize,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            answers: answers.into_iter().map(Into::into).collect(),
            correct_answer,
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
        }
    }

    fn validate(&self, position: usize) -> Result<(), SchemaError> {
        ensure_not_blank(format!("questions[{position}].prompt"), &self.prompt)?;

        let count = self.answers.len();
        if !(MIN_ANSWERS..=MAX_ANSWERS).contains(&count) {
            return Err(SchemaError::AnswerCountOutOfRange {
                question: position,
                count,
            });
        }
        for (index, answer) in self.answers.iter().enumerate() {
            ensure_not_blank(format!("questions[{position}].answers[{index}]"), answer)?;
        }
        if self.correct_answer >= count {
            return Err(SchemaError::CorrectAnswerOutOfRange {
                question: position,
                index: self.correct_answer,
                answers: count,
            });
        }
        if !(MIN_TIME_LIMIT_SECS..=MAX_TIME_LIMIT_SECS).contains(&self.time_limit_secs) {
            return Err(SchemaError::TimeLimitOutOfRange {
                question: position,
                secs: self.time_limit_secs,
            });
        }
        Ok(())
    }
}

/// Summary row returned by owner listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizTitle {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub title: String,
}

impl From<&Quiz> for QuizTitle {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title.clone(),
        }
    }
}

/// Schema value for [`Quiz`] documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuizSchema;

impl EntitySchema for QuizSchema {
    type Entity = Quiz;

    fn kind(&self) -> EntityKind {
        EntityKind::Quiz
    }

    fn identity(&self, entity: &Quiz) -> EntityId {
        entity.id
    }

    fn normalize(&self, quiz: &mut Quiz) -> Result<(), SchemaError> {
        ensure_not_blank("title", &quiz.title)?;
        if matches!(quiz.description.as_deref(), Some(text) if text.trim().is_empty()) {
            quiz.description = None;
        }
        for (position, question) in quiz.questions.iter().enumerate() {
            question.validate(position)?;
        }
        quiz.question_count = quiz.questions.len();
        Ok(())
    }
}
