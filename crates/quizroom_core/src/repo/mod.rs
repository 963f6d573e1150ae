//! Repository layer over the document store.
//!
//! # Responsibility
//! - Provide one generic repository for every entity kind.
//! - Add the per-kind lookups callers need (owner listings, join codes).
//!
//! # Invariants
//! - Identity and ownership fields only change through `create`; patches are
//!   guarded by each schema's `FieldPolicy`.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to storage errors.

pub mod quiz_repo;
pub mod repository;
pub mod room_repo;
