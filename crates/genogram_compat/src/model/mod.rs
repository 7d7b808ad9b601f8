//! Document model consumed and produced by the migration engine.
//!
//! # Responsibility
//! - Wrap the decoded document and its collections.
//! - Define closed enumerations and typed records shared with the scene model.
//!
//! # Invariants
//! - Every entity is identified by an integer `ItemId`, unique per document.
//! - `lastItemId` is never below the largest id present.

pub mod document;
pub mod geometry;
pub mod kinds;
pub mod records;
