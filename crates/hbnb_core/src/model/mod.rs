//! Entity model shared by both storage backends.
//!
//! # Responsibility
//! - Define the entity record, its kinds and attribute values.
//! - Keep kind dispatch on a static table (no name-based reflection).
//!
//! # Invariants
//! - Every entity is identified by the composite key `"<Kind>.<id>"`.
//! - Relationships are plain id attributes; only storage enforces them.

pub mod entity;
pub mod kind;
pub mod value;
