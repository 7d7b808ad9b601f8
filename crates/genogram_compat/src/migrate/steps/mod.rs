//! Migration step bodies, one module per historical schema change.
//!
//! Each module exposes `NAME` and `apply`; the registry in `pipeline.rs`
//! pairs them with their version thresholds.

pub mod date_times;
pub mod details_and_births;
pub mod emotion_notes;
pub mod emotion_tags;
pub mod emotion_targets;
pub mod marriage_events;
pub mod normalize;
pub mod person_positions;

use crate::model::document::{record_kind, Record};
use crate::model::kinds::is_emotion_slug;

/// Item kinds positioned on a layer rather than in the family graph.
pub(crate) const LAYER_ITEM_KINDS: [&str; 2] = ["Callout", "PencilStroke"];

/// Emotions stored under their legacy slug in `items`.
pub(crate) fn is_legacy_emotion(record: &Record) -> bool {
    is_emotion_slug(record_kind(record))
}
