//! Field write-protection for patch requests.
//!
//! # Responsibility
//! - Declare, per entity kind, the field names no patch may touch.
//! - Reject a whole patch request when any of its pointers is protected.
//!
//! # Invariants
//! - Checking is exhaustive: every pointer is inspected before reporting, and
//!   nothing is applied when one is rejected.
//! - The root pointer and pointers with an empty token are always rejected.
//! - A pointer is protected when any decoded token equals a protected name,
//!   so nested paths below a protected member are covered too.

use crate::model::quiz::QuizSchema;
use crate::model::room::RoomSchema;
use crate::model::EntityKind;
use crate::patch::{pointer_segments, PatchRequest};
use std::error::Error;
use std::fmt::{Display, Formatter};

const QUIZ_PROTECTED: &[&str] = &["owner", "id", "_id"];
const ROOM_PROTECTED: &[&str] = &["_id", "id", "code", "owner_id", "quiz_id"];

/// Capability exposing the protected field names of one entity kind.
pub trait FieldPolicy {
    fn protected_paths(&self) -> &'static [&'static str];
}

impl FieldPolicy for EntityKind {
    fn protected_paths(&self) -> &'static [&'static str] {
        match self {
            Self::Quiz => QUIZ_PROTECTED,
            Self::Room => ROOM_PROTECTED,
        }
    }
}

impl FieldPolicy for QuizSchema {
    fn protected_paths(&self) -> &'static [&'static str] {
        EntityKind::Quiz.protected_paths()
    }
}

impl FieldPolicy for RoomSchema {
    fn protected_paths(&self) -> &'static [&'static str] {
        EntityKind::Room.protected_paths()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Root pointer or a pointer containing an empty key.
    EmptyPath,
    Protected(&'static str),
}

/// One pointer rejected by the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedPath {
    pub operation: usize,
    pub op: &'static str,
    pub path: String,
    pub reason: RejectReason,
}

impl Display for RejectedPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            RejectReason::EmptyPath => write!(
                f,
                "operation {} ({}) targets an empty path `{}`",
                self.operation, self.op, self.path
            ),
            RejectReason::Protected(field) => write!(
                f,
                "operation {} ({}) path `{}` disallows patching `{field}`",
                self.operation, self.op, self.path
            ),
        }
    }
}

/// Patch request touches at least one protected or empty path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardViolation {
    pub rejected: Vec<RejectedPath>,
}

impl Display for GuardViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "patch rejected:")?;
        for (index, rejected) in self.rejected.iter().enumerate() {
            let separator = if index == 0 { " " } else { "; " };
            write!(f, "{separator}{rejected}")?;
        }
        Ok(())
    }
}

impl Error for GuardViolation {}

/// Returns the protected name matched by `pointer`, if any.
pub fn protected_match<P: FieldPolicy + ?Sized>(policy: &P, pointer: &str) -> Option<&'static str> {
    let segments = pointer_segments(pointer);
    policy
        .protected_paths()
        .iter()
        .copied()
        .find(|field| segments.iter().any(|segment| segment.as_str() == *field))
}

/// Whether a patch may never target `pointer` under `policy`.
pub fn is_protected<P: FieldPolicy + ?Sized>(policy: &P, pointer: &str) -> bool {
    is_empty_path(pointer) || protected_match(policy, pointer).is_some()
}

/// Checks every pointer of `patch` and reports all violations at once.
pub fn check_patch<P: FieldPolicy + ?Sized>(
    policy: &P,
    patch: &PatchRequest,
) -> Result<(), GuardViolation> {
    let rejected: Vec<RejectedPath> = patch
        .targets()
        .filter(|target| target.is_mutating())
        .filter_map(|target| reject_reason(policy, target.pointer).map(|reason| (target, reason)))
        .map(|(target, reason)| RejectedPath {
            operation: target.operation,
            op: target.op,
            path: target.pointer.to_string(),
            reason,
        })
        .collect();

    if rejected.is_empty() {
        Ok(())
    } else {
        Err(GuardViolation { rejected })
    }
}

fn reject_reason<P: FieldPolicy + ?Sized>(policy: &P, pointer: &str) -> Option<RejectReason> {
    if is_empty_path(pointer) {
        return Some(RejectReason::EmptyPath);
    }
    protected_match(policy, pointer).map(RejectReason::Protected)
}

fn is_empty_path(pointer: &str) -> bool {
    pointer.is_empty() || pointer_segments(pointer).iter().any(String::is_empty)
}
