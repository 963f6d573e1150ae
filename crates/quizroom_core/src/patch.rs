//! Parsed JSON Patch (RFC 6902) requests.
//!
//! # Responsibility
//! - Turn untrusted request bodies into an ordered operation list.
//! - Apply that list to a document snapshot without touching the snapshot.
//!
//! # Invariants
//! - A request is always a JSON array; a single operation object is rejected.
//! - Application is all-or-nothing: the first failing operation aborts and no
//!   partial result escapes.
//! - This module knows nothing about entity kinds or protected fields.

use json_patch::PatchOperation;
use serde::Deserialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Request body could not be read as a patch operation sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFormatError {
    message: String,
}

impl PatchFormatError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for PatchFormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed patch request: {}", self.message)
    }
}

impl Error for PatchFormatError {}

/// One operation could not be applied to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchApplyError {
    /// Zero-based index of the failing operation.
    pub operation: usize,
    pub message: String,
}

impl Display for PatchApplyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "patch operation {} could not be applied: {}",
            self.operation, self.message
        )
    }
}

impl Error for PatchApplyError {}

/// Which pointer of an operation a [`PatchTarget`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerRole {
    /// The `path` member, written (or asserted, for `test`).
    Path,
    /// The `from` member of a `move`, which removes its source.
    MoveSource,
    /// The `from` member of a `copy`, read only.
    CopySource,
}

/// A JSON pointer named by one operation of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchTarget<'a> {
    pub operation: usize,
    pub op: &'static str,
    pub role: PointerRole,
    pub pointer: &'a str,
}

impl PatchTarget<'_> {
    /// Whether applying the operation can change the value at this pointer.
    pub fn is_mutating(&self) -> bool {
        !matches!(self.role, PointerRole::CopySource)
    }
}

/// Ordered, validated patch request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatchRequest {
    operations: Vec<PatchOperation>,
}

impl PatchRequest {
    /// Parses a raw request body.
    ///
    /// # Errors
    /// - Body is not a JSON array.
    /// - Any element is not a well-formed operation (unknown `op`, missing
    ///   members, pointer not starting with `/`).
    pub fn parse(raw: &Value) -> Result<Self, PatchFormatError> {
        if !raw.is_array() {
            return Err(PatchFormatError::new(format!(
                "expected a JSON array of operations, got {}",
                json_type_name(raw)
            )));
        }

        let operations = Vec::<PatchOperation>::deserialize(raw)
            .map_err(|err| PatchFormatError::new(err.to_string()))?;
        Ok(Self { operations })
    }

    pub fn from_operations(operations: Vec<PatchOperation>) -> Self {
        Self { operations }
    }

    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Iterates every pointer named by the request, in operation order.
    pub fn targets(&self) -> impl Iterator<Item = PatchTarget<'_>> {
        self.operations
            .iter()
            .enumerate()
            .flat_map(|(operation, op)| operation_targets(operation, op))
    }

    /// Applies the operations in order to a copy of `document`.
    pub fn apply(&self, document: &Value) -> Result<Value, PatchApplyError> {
        let mut patched = document.clone();
        json_patch::patch(&mut patched, &self.operations).map_err(|err| PatchApplyError {
            operation: err.operation,
            message: err.to_string(),
        })?;
        Ok(patched)
    }
}

fn operation_targets(operation: usize, op: &PatchOperation) -> Vec<PatchTarget<'_>> {
    let target = |name, role, pointer| PatchTarget {
        operation,
        op: name,
        role,
        pointer,
    };

    match op {
        PatchOperation::Add(add) => vec![target("add", PointerRole::Path, add.path.as_str())],
        PatchOperation::Remove(remove) => {
            vec![target("remove", PointerRole::Path, remove.path.as_str())]
        }
        PatchOperation::Replace(replace) => {
            vec![target("replace", PointerRole::Path, replace.path.as_str())]
        }
        PatchOperation::Move(mv) => vec![
            target("move", PointerRole::Path, mv.path.as_str()),
            target("move", PointerRole::MoveSource, mv.from.as_str()),
        ],
        PatchOperation::Copy(copy) => vec![
            target("copy", PointerRole::Path, copy.path.as_str()),
            target("copy", PointerRole::CopySource, copy.from.as_str()),
        ],
        PatchOperation::Test(test) => vec![target("test", PointerRole::Path, test.path.as_str())],
    }
}

/// Splits a JSON pointer into decoded reference tokens.
///
/// The root pointer `""` yields no tokens; `"/"` yields one empty token.
pub fn pointer_segments(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .strip_prefix('/')
        .unwrap_or(pointer)
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
