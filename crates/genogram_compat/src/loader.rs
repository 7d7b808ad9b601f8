//! Document file loading and saving.
//!
//! # Responsibility
//! - Decode a JSON document file, migrate it and check its integrity.
//! - Stamp the current version when writing a document back.
//!
//! # Invariants
//! - A document whose migration failed is never returned.
//! - Integrity issues are logged, not fatal.
//! - Every load failure names the file and the stored version.

use crate::integrity::{check_integrity, IntegrityIssue};
use crate::migrate::{migrate_document, MigrateOptions, MigrationError, MigrationReport};
use crate::model::document::{Document, DocumentShapeError};
use crate::version::CURRENT_VERSION;
use log::{error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub type LoadResult<T> = Result<T, LoadError>;

/// Why a document could not be loaded.
#[derive(Debug)]
pub enum LoadErrorKind {
    Io(std::io::Error),
    Decode(serde_json::Error),
    Shape(DocumentShapeError),
    Migration(MigrationError),
}

impl LoadErrorKind {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "read_failed",
            Self::Decode(_) => "decode_failed",
            Self::Shape(_) => "invalid_shape",
            Self::Migration(_) => "migration_failed",
        }
    }
}

impl Display for LoadErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Decode(err) => write!(f, "invalid JSON: {err}"),
            Self::Shape(err) => write!(f, "{err}"),
            Self::Migration(err) => write!(f, "{err}"),
        }
    }
}

/// Document load failure naming the file and its stored version.
#[derive(Debug)]
pub struct LoadError {
    pub path: PathBuf,
    /// Stamp read from the file, when decoding got that far.
    pub version: Option<String>,
    pub kind: LoadErrorKind,
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to load `{}` (version {}): {}",
            self.path.display(),
            self.version.as_deref().unwrap_or("unknown"),
            self.kind
        )
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            LoadErrorKind::Io(err) => Some(err),
            LoadErrorKind::Decode(err) => Some(err),
            LoadErrorKind::Shape(err) => Some(err),
            LoadErrorKind::Migration(err) => Some(err),
        }
    }
}

/// A migrated document plus what happened on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub document: Document,
    pub report: MigrationReport,
    pub issues: Vec<IntegrityIssue>,
}

/// Reads, migrates and checks the document at `path`.
///
/// # Side effects
/// - Emits `document_load` events with duration and status.
/// - Emits one `integrity_issue` warning per issue found.
pub fn load_document_file(
    path: impl AsRef<Path>,
    options: &MigrateOptions,
) -> LoadResult<LoadedDocument> {
    let path = path.as_ref();
    let started_at = Instant::now();
    info!(
        "event=document_load module=loader status=start path={}",
        path.display()
    );

    let result = std::fs::read_to_string(path)
        .map_err(|err| (None, LoadErrorKind::Io(err)))
        .and_then(|text| load_document_str(&text, options));

    match result {
        Ok(loaded) => {
            for issue in &loaded.issues {
                warn!(
                    "event=integrity_issue module=loader status=warning path={} issue={}",
                    path.display(),
                    issue
                );
            }
            info!(
                "event=document_load module=loader status=ok path={} version={} applied={} issues={} duration_ms={}",
                path.display(),
                loaded.report.document_version.as_deref().unwrap_or("none"),
                loaded.report.applied.len(),
                loaded.issues.len(),
                started_at.elapsed().as_millis()
            );
            Ok(loaded)
        }
        Err((version, kind)) => {
            error!(
                "event=document_load module=loader status=error path={} version={} duration_ms={} error_code={} error={}",
                path.display(),
                version.as_deref().unwrap_or("unknown"),
                started_at.elapsed().as_millis(),
                kind.code(),
                kind
            );
            Err(LoadError {
                path: path.to_path_buf(),
                version,
                kind,
            })
        }
    }
}

fn load_document_str(
    text: &str,
    options: &MigrateOptions,
) -> Result<LoadedDocument, (Option<String>, LoadErrorKind)> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| (None, LoadErrorKind::Decode(err)))?;
    let version = value
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string);
    let mut document = Document::from_value(value)
        .map_err(|err| (version.clone(), LoadErrorKind::Shape(err)))?;
    let report = migrate_document(&mut document, options)
        .map_err(|err| (version.clone(), LoadErrorKind::Migration(err)))?;
    let issues = check_integrity(&document);
    Ok(LoadedDocument {
        document,
        report,
        issues,
    })
}

/// Stamps `doc` with the current version and writes it as pretty JSON.
pub fn save_document_file(path: impl AsRef<Path>, doc: &mut Document) -> std::io::Result<()> {
    let path = path.as_ref();
    doc.set_version(CURRENT_VERSION);
    let text = serde_json::to_string_pretty(&*doc)?;
    std::fs::write(path, text + "\n")?;
    info!(
        "event=document_save module=loader status=ok path={} version={}",
        path.display(),
        CURRENT_VERSION
    );
    Ok(())
}
