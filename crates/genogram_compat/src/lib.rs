//! Compatibility engine for persisted genogram documents.
//! Every document passes through this crate before the rest of the
//! application reads it.

pub mod integrity;
pub mod loader;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod scene;
pub mod version;

pub use integrity::{check_integrity, IntegrityIssue};
pub use loader::{
    load_document_file, save_document_file, LoadError, LoadErrorKind, LoadResult, LoadedDocument,
};
pub use logging::{
    default_log_level, init_logging, init_logging_with, logging_status, LoggingConfig,
    LoggingError,
};
pub use migrate::{
    migrate_document, MigrateOptions, MigrationContext, MigrationError, MigrationReport,
    MigrationResult, MigrationStep, Pipeline, STEPS,
};
pub use model::document::{Document, DocumentShapeError, ItemId, Record};
pub use model::kinds::{EventKind, RelationshipKind};
pub use scene::{update_scene, DetailsItem};
pub use version::{should_run, AppVersion, VersionParseError, CURRENT_VERSION};

/// Returns the crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, AppVersion, CURRENT_VERSION};

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn current_version_parses() {
        assert!(CURRENT_VERSION.parse::<AppVersion>().is_ok());
    }
}
