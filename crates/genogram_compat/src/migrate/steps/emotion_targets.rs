//! Split the single legacy emotion `person` into subject and target.

use crate::migrate::{MigrationContext, MigrationResult};
use crate::model::document::{record_kind, Document, ITEMS};
use crate::model::kinds::is_emotion_slug;
use serde_json::Value;

pub const NAME: &str = "split_emotion_targets";

pub fn apply(doc: &mut Document, _ctx: &mut MigrationContext) -> MigrationResult<()> {
    for item in doc.records_mut(ITEMS) {
        let kind = record_kind(item);
        if kind != "Emotion" && !is_emotion_slug(kind) {
            continue;
        }
        match item.remove("person") {
            None => {}
            Some(Value::Null) => {
                item.insert("person".to_string(), Value::Null);
            }
            Some(person) => {
                item.insert("person_a".to_string(), person);
                item.insert("person_b".to_string(), Value::Null);
            }
        }
    }
    Ok(())
}
