//! Explicit state threaded through one pipeline run.

use crate::model::document::{Document, ItemId};
use crate::model::records::MultipleBirth;
use crate::version::AppVersion;
use chrono::NaiveDateTime;
use log::warn;

/// Caller-provided migration settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrateOptions {
    /// Newest version this build understands.
    pub current_version: AppVersion,
    /// Run anyway when the document is stamped newer than `current_version`.
    pub allow_future_versions: bool,
    /// Clock reading used where a step must invent a timestamp.
    pub now: NaiveDateTime,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            current_version: AppVersion::current(),
            allow_future_versions: false,
            now: chrono::Local::now().naive_local(),
        }
    }
}

/// Mutable state shared by all steps of one run.
#[derive(Debug)]
pub struct MigrationContext {
    next_id: ItemId,
    minted: usize,
    multiple_births: Vec<MultipleBirth>,
    warnings: Vec<String>,
    now: NaiveDateTime,
}

impl MigrationContext {
    /// Seeds the id counter above both `lastItemId` and every id present, so
    /// minted ids can never collide even when the stored counter is stale.
    pub fn for_document(doc: &Document, now: NaiveDateTime) -> Self {
        let floor = doc
            .last_item_id()
            .unwrap_or(0)
            .max(doc.max_item_id().unwrap_or(0))
            .max(0);
        Self {
            next_id: floor + 1,
            minted: 0,
            multiple_births: Vec::new(),
            warnings: Vec::new(),
            now,
        }
    }

    /// Issues a fresh document-unique id.
    pub fn mint_id(&mut self) -> ItemId {
        let id = self.next_id;
        self.next_id += 1;
        self.minted += 1;
        id
    }

    /// Highest id issued or already present when the run started.
    pub fn last_issued_id(&self) -> ItemId {
        self.next_id - 1
    }

    pub fn minted_count(&self) -> usize {
        self.minted
    }

    /// Writes the counter back to `lastItemId`.
    pub fn commit_last_item_id(&self, doc: &mut Document) {
        if doc.last_item_id() != Some(self.last_issued_id()) {
            doc.set_last_item_id(self.last_issued_id());
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// Returns the id of a multiple birth sharing any of `children`, creating
    /// one under `parents` when none matches.
    pub fn multiple_birth_for(&mut self, parents: ItemId, children: &[ItemId]) -> ItemId {
        if let Some(existing) = self
            .multiple_births
            .iter()
            .find(|birth| birth.shares_child(children))
        {
            return existing.id;
        }
        let id = self.mint_id();
        self.multiple_births.push(MultipleBirth {
            id,
            children: children.to_vec(),
            parents,
        });
        id
    }

    /// Drains multiple births created since the last call.
    pub fn take_multiple_births(&mut self) -> Vec<MultipleBirth> {
        std::mem::take(&mut self.multiple_births)
    }

    /// Records a recovered data problem.
    pub fn warn(&mut self, step: &'static str, message: String) {
        warn!(
            "event=migrate_warning module=migrate status=recovered step={} message={}",
            step, message
        );
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub(crate) fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Stamp the document carried before migration.
    pub document_version: Option<String>,
    /// Steps applied, in order.
    pub applied: Vec<&'static str>,
    /// Steps whose gate did not pass.
    pub skipped: Vec<&'static str>,
    /// Ids minted for synthesized records.
    pub minted_ids: usize,
    /// Recovered problems, in the order they were met.
    pub warnings: Vec<String>,
}

impl MigrationReport {
    pub fn changed(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Fixed clock reading for tests.
#[cfg(test)]
pub(crate) fn fixed_now() -> NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("valid fixed date")
}
