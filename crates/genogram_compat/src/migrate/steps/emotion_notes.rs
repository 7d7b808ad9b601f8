//! Mirror notes between an emotion and its start event.
//!
//! Only one direction runs per emotion: emotion notes fill an empty start
//! event first; otherwise start event notes fill an empty emotion. When both
//! sides carry different notes nothing is merged and a warning is recorded.

use super::is_legacy_emotion;
use crate::migrate::fields::{is_set, require_object_mut};
use crate::migrate::{MigrationContext, MigrationResult};
use crate::model::document::{record_id, Document, ITEMS};
use log::info;
use serde_json::Value;

pub const NAME: &str = "mirror_emotion_notes";

pub fn apply(doc: &mut Document, ctx: &mut MigrationContext) -> MigrationResult<()> {
    for emotion in doc.records_mut(ITEMS).filter(|item| is_legacy_emotion(item)) {
        let entity_id = record_id(emotion);
        let notes = emotion.get("notes").cloned().unwrap_or(Value::Null);
        let start = require_object_mut(emotion, NAME, entity_id, "startEvent")?;
        let start_notes = start.get("notes").cloned().unwrap_or(Value::Null);
        let dated = is_set(start.get("dateTime"));
        let id = entity_id.map_or_else(|| "without id".to_string(), |id| id.to_string());

        if is_set(Some(&notes)) && dated && !is_set(Some(&start_notes)) {
            info!(
                "event=mirror_notes module=migrate status=ok emotion={} direction=emotion_to_event",
                id
            );
            start.insert("notes".to_string(), notes);
        } else if dated && is_set(Some(&start_notes)) && !is_set(Some(&notes)) {
            info!(
                "event=mirror_notes module=migrate status=ok emotion={} direction=event_to_emotion",
                id
            );
            emotion.insert("notes".to_string(), start_notes);
        } else if is_set(Some(&notes)) && is_set(Some(&start_notes)) && notes != start_notes {
            ctx.warn(
                NAME,
                format!("emotion {id} keeps differing notes on itself and its start event"),
            );
        }
    }
    Ok(())
}
