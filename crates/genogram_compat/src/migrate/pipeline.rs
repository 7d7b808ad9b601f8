//! Migration step registry and executor.
//!
//! # Invariants
//! - `STEPS` is append-only; entries are never reordered or removed.
//! - Thresholds are the historical version stamps and must not change.
//! - Every gate is evaluated against the stamp the document was loaded with.

use super::context::{MigrateOptions, MigrationContext, MigrationReport};
use super::steps;
use super::{MigrationError, MigrationResult};
use crate::model::document::Document;
use crate::version::{should_run, AppVersion};
use log::{debug, error, info};
use std::time::Instant;

/// Signature of a step body.
pub type StepFn = fn(&mut Document, &mut MigrationContext) -> MigrationResult<()>;

/// One version-gated transformation.
#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    pub name: &'static str,
    /// Documents stamped at or below this version need the step.
    pub threshold: &'static str,
    pub apply: StepFn,
}

impl MigrationStep {
    pub fn threshold_version(&self) -> AppVersion {
        self.threshold
            .parse()
            .expect("step thresholds are valid version stamps")
    }
}

pub const STEPS: &[MigrationStep] = &[
    MigrationStep {
        name: steps::emotion_targets::NAME,
        threshold: "1.0.0b5",
        apply: steps::emotion_targets::apply,
    },
    MigrationStep {
        name: steps::person_positions::NAME,
        threshold: "1.0.0b7",
        apply: steps::person_positions::apply,
    },
    MigrationStep {
        name: steps::details_and_births::NAME,
        threshold: "1.0.0a16",
        apply: steps::details_and_births::apply,
    },
    MigrationStep {
        name: steps::marriage_events::NAME,
        threshold: "1.1.4a7",
        apply: steps::marriage_events::apply,
    },
    MigrationStep {
        name: steps::date_times::NAME,
        threshold: "1.2.8",
        apply: steps::date_times::apply,
    },
    MigrationStep {
        name: steps::emotion_tags::NAME,
        threshold: "1.4.5",
        apply: steps::emotion_tags::apply,
    },
    MigrationStep {
        name: steps::emotion_notes::NAME,
        threshold: "2.0.0",
        apply: steps::emotion_notes::apply,
    },
    MigrationStep {
        name: steps::normalize::NAME,
        threshold: "2.0.12b1",
        apply: steps::normalize::apply,
    },
];

/// Highest threshold known by this binary.
pub fn latest_threshold() -> AppVersion {
    STEPS
        .iter()
        .map(MigrationStep::threshold_version)
        .max()
        .unwrap_or_else(|| AppVersion::new(0, 0, 0))
}

/// An ordered run of steps: the full registry or a prefix of it.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    steps: &'static [MigrationStep],
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl Pipeline {
    /// Every registered step.
    pub fn standard() -> Self {
        Self { steps: STEPS }
    }

    /// Steps up to and including `step_name`. Returns `None` for unknown names.
    pub fn through(step_name: &str) -> Option<Self> {
        let end = STEPS.iter().position(|step| step.name == step_name)?;
        Some(Self {
            steps: &STEPS[..=end],
        })
    }

    pub fn steps(&self) -> &'static [MigrationStep] {
        self.steps
    }

    /// Applies every step whose gate passes, in order.
    ///
    /// # Errors
    /// - `UnsupportedVersion` when the stamp is newer than
    ///   `options.current_version` and future versions are not allowed.
    /// - The first step failure; the document is then left partially
    ///   migrated and must be discarded.
    pub fn run(
        &self,
        doc: &mut Document,
        options: &MigrateOptions,
    ) -> MigrationResult<MigrationReport> {
        let started_at = Instant::now();
        let document_version = doc.version().map(str::to_string);
        reject_future_version(document_version.as_deref(), options)?;

        info!(
            "event=migrate_document module=migrate status=start version={}",
            document_version.as_deref().unwrap_or("none")
        );

        let mut ctx = MigrationContext::for_document(doc, options.now);
        let mut report = MigrationReport {
            document_version,
            ..MigrationReport::default()
        };

        for step in self.steps {
            if !should_run(report.document_version.as_deref(), &step.threshold_version()) {
                debug!(
                    "event=migrate_step module=migrate status=skipped step={} threshold={}",
                    step.name, step.threshold
                );
                report.skipped.push(step.name);
                continue;
            }

            let step_started_at = Instant::now();
            if let Err(err) = (step.apply)(doc, &mut ctx) {
                error!(
                    "event=migrate_step module=migrate status=error step={} threshold={} duration_ms={} error={}",
                    step.name,
                    step.threshold,
                    step_started_at.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
            info!(
                "event=migrate_step module=migrate status=ok step={} threshold={} duration_ms={}",
                step.name,
                step.threshold,
                step_started_at.elapsed().as_millis()
            );
            report.applied.push(step.name);
        }

        report.minted_ids = ctx.minted_count();
        report.warnings = ctx.into_warnings();
        info!(
            "event=migrate_document module=migrate status=ok applied={} skipped={} minted_ids={} warnings={} duration_ms={}",
            report.applied.len(),
            report.skipped.len(),
            report.minted_ids,
            report.warnings.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }
}

/// Runs the standard pipeline on `doc`.
pub fn migrate_document(
    doc: &mut Document,
    options: &MigrateOptions,
) -> MigrationResult<MigrationReport> {
    Pipeline::standard().run(doc, options)
}

fn reject_future_version(
    document_version: Option<&str>,
    options: &MigrateOptions,
) -> MigrationResult<()> {
    if options.allow_future_versions {
        return Ok(());
    }
    let Some(Ok(version)) = document_version.map(str::parse::<AppVersion>) else {
        return Ok(());
    };
    if version > options.current_version {
        error!(
            "event=migrate_document module=migrate status=error error_code=unsupported_version version={} latest_supported={}",
            version, options.current_version
        );
        return Err(MigrationError::UnsupportedVersion {
            document_version: version.to_string(),
            latest_supported: options.current_version.to_string(),
        });
    }
    Ok(())
}
