//! Version-gated document migration.
//!
//! # Responsibility
//! - Register migration steps in their historical order.
//! - Apply every step whose gate passes, exactly once, in order.
//! - Thread the id counter and dedup caches explicitly through the steps.
//!
//! # Invariants
//! - Steps are never reordered or re-run; later steps assume earlier ones ran.
//! - `lastItemId >= max(id)` holds after every applied step.
//! - A failed step leaves the document undefined; callers must discard it.

use crate::model::document::ItemId;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod context;
mod fields;
pub mod parents;
mod pipeline;
pub mod steps;

pub use context::{MigrateOptions, MigrationContext, MigrationReport};
pub use pipeline::{latest_threshold, migrate_document, MigrationStep, Pipeline, STEPS};

pub type MigrationResult<T> = Result<T, MigrationError>;

/// Fatal migration failure. The document must not be used afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationError {
    /// A field every record of this shape must carry is absent.
    MissingField {
        step: &'static str,
        entity_id: Option<ItemId>,
        field: &'static str,
    },
    /// A field is present with an unusable type or value.
    InvalidField {
        step: &'static str,
        entity_id: Option<ItemId>,
        field: &'static str,
        reason: String,
    },
    /// A reference names an entity that does not exist.
    DanglingReference {
        step: &'static str,
        entity_id: Option<ItemId>,
        field: &'static str,
        target: ItemId,
    },
    /// The document was written by a newer application.
    UnsupportedVersion {
        document_version: String,
        latest_supported: String,
    },
}

impl MigrationError {
    /// Name of the step that failed, when the failure belongs to one.
    pub fn step(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { step, .. }
            | Self::InvalidField { step, .. }
            | Self::DanglingReference { step, .. } => Some(step),
            Self::UnsupportedVersion { .. } => None,
        }
    }
}

impl Display for MigrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField {
                step,
                entity_id,
                field,
            } => write!(
                f,
                "migration step `{step}`: {} is missing required field `{field}`",
                describe_entity(*entity_id)
            ),
            Self::InvalidField {
                step,
                entity_id,
                field,
                reason,
            } => write!(
                f,
                "migration step `{step}`: {} has invalid field `{field}`: {reason}",
                describe_entity(*entity_id)
            ),
            Self::DanglingReference {
                step,
                entity_id,
                field,
                target,
            } => write!(
                f,
                "migration step `{step}`: {} field `{field}` references missing item {target}",
                describe_entity(*entity_id)
            ),
            Self::UnsupportedVersion {
                document_version,
                latest_supported,
            } => write!(
                f,
                "document version {document_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for MigrationError {}

fn describe_entity(entity_id: Option<ItemId>) -> String {
    match entity_id {
        Some(id) => format!("item {id}"),
        None => "item without id".to_string(),
    }
}
