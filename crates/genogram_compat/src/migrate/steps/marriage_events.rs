//! Dated marriage sub-records join the marriage's `events` list.

use crate::migrate::fields::{array_field_mut, is_set, take_object};
use crate::migrate::{MigrationContext, MigrationResult};
use crate::model::document::{record_kind, Document, ITEMS};
use serde_json::Value;

pub const NAME: &str = "flatten_marriage_events";

const EMBEDDED_EVENTS: [&str; 3] = ["marriedEvent", "separatedEvent", "divorcedEvent"];

pub fn apply(doc: &mut Document, _ctx: &mut MigrationContext) -> MigrationResult<()> {
    for item in doc.records_mut(ITEMS) {
        if record_kind(item) != "Marriage" {
            continue;
        }
        let mut dated = Vec::new();
        for field in EMBEDDED_EVENTS {
            if let Some(event) = take_object(item, NAME, field)? {
                if is_set(event.get("date")) {
                    dated.push(Value::Object(event));
                }
            }
        }
        array_field_mut(item, NAME, "events")?.extend(dated);
    }
    Ok(())
}
