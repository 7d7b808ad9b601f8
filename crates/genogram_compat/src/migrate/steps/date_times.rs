//! `date` becomes `dateTime`, emotions gain start/end events.
//!
//! # Responsibility
//! - Rename `Toward`/`Away` emotions to `Inside`/`Outside`.
//! - Convert every legacy `date` into a `dateTime`.
//! - Resolve person tags against layer tags into explicit `layers` lists.
//! - Build emotion `startEvent`/`endEvent` records from the flat date fields.
//!
//! # Invariants
//! - Person `tags` are consumed; layer membership is the only trace left.

use super::is_legacy_emotion;
use crate::migrate::fields::{
    array_field_mut, date_time_from_legacy, is_set, migrate_date_field, string_list,
    DATE_TIME_FORMAT,
};
use crate::migrate::{MigrationContext, MigrationResult};
use crate::model::document::{record_id, record_kind, Document, ItemId, Record, ITEMS};
use serde_json::{json, Value};
use std::collections::BTreeSet;

pub const NAME: &str = "generalize_date_times";

const BUILTIN_PERSON_EVENTS: [&str; 3] = ["birthEvent", "adoptedEvent", "deathEvent"];

struct LayerTags {
    id: ItemId,
    tags: BTreeSet<String>,
}

pub fn apply(doc: &mut Document, ctx: &mut MigrationContext) -> MigrationResult<()> {
    let layers: Vec<LayerTags> = doc
        .records(ITEMS)
        .filter(|item| record_kind(item) == "Layer")
        .filter_map(|layer| {
            Some(LayerTags {
                id: record_id(layer)?,
                tags: string_list(layer, "tags").into_iter().collect(),
            })
        })
        .filter(|layer| !layer.tags.is_empty())
        .collect();

    migrate_document_fields(doc, ctx);

    for item in doc.records_mut(ITEMS) {
        rename_direction_kind(item);
        let kind = record_kind(item).to_string();
        match kind.as_str() {
            "Event" => migrate_date_field(item, NAME, ctx),
            "Person" => {
                migrate_embedded_dates(item, ctx)?;
                for field in BUILTIN_PERSON_EVENTS {
                    if let Some(Value::Object(event)) = item.get_mut(field) {
                        if !event.is_empty() {
                            migrate_date_field(event, NAME, ctx);
                        }
                    }
                }
                assign_layers_by_tag(item, &layers)?;
            }
            "Marriage" => migrate_embedded_dates(item, ctx)?,
            _ if is_legacy_emotion(item) => build_emotion_events(item, ctx),
            _ => {}
        }
    }
    Ok(())
}

fn migrate_document_fields(doc: &mut Document, ctx: &mut MigrationContext) {
    match doc.remove("currentDate") {
        Some(legacy) => {
            let value = date_time_from_legacy(Some(legacy)).unwrap_or_else(|raw| {
                ctx.warn(NAME, format!("document keeps unparseable currentDate {raw}"));
                raw
            });
            doc.insert("currentDateTime", value);
        }
        None if !doc.contains("currentDateTime") => {
            let now = ctx.now().format(DATE_TIME_FORMAT).to_string();
            doc.insert("currentDateTime", Value::String(now));
        }
        None => {}
    }
    match doc.remove("hideNames") {
        Some(hide_names) => {
            doc.insert("showAliases", hide_names);
        }
        None if !doc.contains("showAliases") => {
            doc.insert("showAliases", Value::Bool(false));
        }
        None => {}
    }
}

fn rename_direction_kind(item: &mut Record) {
    let renamed = match record_kind(item) {
        "Toward" => "Inside",
        "Away" => "Outside",
        _ => return,
    };
    item.insert("kind".to_string(), Value::String(renamed.to_string()));
}

fn migrate_embedded_dates(item: &mut Record, ctx: &mut MigrationContext) -> MigrationResult<()> {
    if !item.contains_key("events") {
        return Ok(());
    }
    for event in array_field_mut(item, NAME, "events")?
        .iter_mut()
        .filter_map(Value::as_object_mut)
    {
        migrate_date_field(event, NAME, ctx);
    }
    Ok(())
}

fn assign_layers_by_tag(person: &mut Record, layers: &[LayerTags]) -> MigrationResult<()> {
    let tags: BTreeSet<String> = string_list(person, "tags").into_iter().collect();
    person.remove("tags");
    if tags.is_empty() {
        return Ok(());
    }
    let matching: Vec<ItemId> = layers
        .iter()
        .filter(|layer| !layer.tags.is_disjoint(&tags))
        .map(|layer| layer.id)
        .collect();
    if matching.is_empty() {
        return Ok(());
    }
    array_field_mut(person, NAME, "layers")?.extend(matching.into_iter().map(Value::from));
    Ok(())
}

fn build_emotion_events(emotion: &mut Record, ctx: &mut MigrationContext) {
    let start_date = converted_date(emotion, "startDate", ctx);
    let end_date = converted_date(emotion, "endDate", ctx);
    let notes = emotion.get("notes").cloned().unwrap_or(Value::Null);
    let start_unsure = emotion.get("startDateUnsure").cloned().unwrap_or(Value::Null);
    let end_unsure = emotion.get("endDateUnsure").cloned().unwrap_or(Value::Null);

    emotion.insert(
        "startEvent".to_string(),
        json!({
            "dateTime": start_date,
            "unsure": start_unsure,
            "uniqueId": "emotionStartEvent",
            "notes": notes,
        }),
    );
    emotion.insert(
        "endEvent".to_string(),
        json!({
            "dateTime": end_date,
            "unsure": end_unsure,
            "uniqueId": "emotionEndEvent",
        }),
    );
}

fn converted_date(emotion: &mut Record, field: &str, ctx: &mut MigrationContext) -> Value {
    let legacy = emotion.remove(field).filter(|value| is_set(Some(value)));
    date_time_from_legacy(legacy).unwrap_or_else(|raw| {
        ctx.warn(
            NAME,
            format!(
                "emotion {} keeps unparseable {field} {raw}",
                record_id(emotion).map_or_else(|| "without id".to_string(), |id| id.to_string())
            ),
        );
        raw
    })
}
