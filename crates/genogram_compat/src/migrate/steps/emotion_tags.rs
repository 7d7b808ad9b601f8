//! One sorted tag set shared by an emotion and both of its events.

use super::is_legacy_emotion;
use crate::migrate::fields::{require_object_mut, string_list};
use crate::migrate::{MigrationContext, MigrationResult};
use crate::model::document::{record_id, Document, ITEMS};
use serde_json::Value;
use std::collections::BTreeSet;

pub const NAME: &str = "coalesce_emotion_tags";

pub fn apply(doc: &mut Document, _ctx: &mut MigrationContext) -> MigrationResult<()> {
    for emotion in doc.records_mut(ITEMS).filter(|item| is_legacy_emotion(item)) {
        let entity_id = record_id(emotion);
        let mut tags: BTreeSet<String> = string_list(emotion, "tags").into_iter().collect();
        for field in ["startEvent", "endEvent"] {
            let event = require_object_mut(emotion, NAME, entity_id, field)?;
            tags.extend(string_list(event, "tags"));
        }

        let coalesced = Value::from(tags.into_iter().collect::<Vec<_>>());
        for field in ["startEvent", "endEvent"] {
            require_object_mut(emotion, NAME, entity_id, field)?
                .insert("tags".to_string(), coalesced.clone());
        }
        emotion.insert("tags".to_string(), coalesced);
    }
    Ok(())
}
