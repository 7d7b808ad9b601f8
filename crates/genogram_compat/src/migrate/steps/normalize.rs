//! Split the item bag into typed collections and externalize every event.
//!
//! # Responsibility
//! - Route `items` into `people`, `marriages`, `emotions`, `events`,
//!   `layerItems`, `layers` and `multipleBirths`.
//! - Move embedded person, marriage and emotion events into the flat
//!   top-level `events` collection, translating `uniqueId` into `kind`.
//! - Link birth and adoption events to the child's parents, synthesizing
//!   parents when none are recorded.
//! - Normalize emotion kinds to `RelationshipKind` values.
//!
//! # Invariants
//! - `items` survives only when it still holds unrecognized kinds.
//! - Event order is: person built-ins, person custom events, marriage
//!   events, emotion events, then events that were already top-level.
//! - An event without an id is given one before its parents are synthesized.

use super::LAYER_ITEM_KINDS;
use crate::migrate::fields::{is_set, require_id, require_item_ref, take_object, take_records};
use crate::migrate::parents::ensure_parents;
use crate::migrate::{MigrationContext, MigrationError, MigrationResult};
use crate::model::document::{
    record_id, record_kind, Document, ItemId, Record, EMOTIONS, EVENTS, ITEMS, LAYERS,
    LAYER_ITEMS, MARRIAGES, MULTIPLE_BIRTHS, PEOPLE, TYPED_COLLECTIONS,
};
use crate::model::kinds::{is_emotion_kind, EventKind, RelationshipKind};
use serde_json::{json, Value};

pub const NAME: &str = "normalize_collections";

const BUILTIN_PERSON_EVENTS: [(&str, EventKind); 3] = [
    ("birthEvent", EventKind::Birth),
    ("adoptedEvent", EventKind::Adopted),
    ("deathEvent", EventKind::Death),
];

/// Typed collection an item of `kind` belongs to, or `None` when the kind is
/// not recognized.
pub fn collection_for_kind(kind: &str) -> Option<&'static str> {
    match kind {
        "Person" => Some(PEOPLE),
        "Marriage" => Some(MARRIAGES),
        "Event" => Some(EVENTS),
        "Layer" => Some(LAYERS),
        "MultipleBirth" => Some(MULTIPLE_BIRTHS),
        "Emotion" => Some(EMOTIONS),
        other if LAYER_ITEM_KINDS.contains(&other) => Some(LAYER_ITEMS),
        other if is_emotion_kind(other) => Some(EMOTIONS),
        _ => None,
    }
}

pub fn apply(doc: &mut Document, ctx: &mut MigrationContext) -> MigrationResult<()> {
    split_items(doc);

    let mut events = Vec::new();
    extract_builtin_person_events(doc, ctx, &mut events)?;
    extract_custom_person_events(doc, ctx, &mut events)?;
    extract_marriage_events(doc, ctx, &mut events)?;
    extract_emotion_events(doc, ctx, &mut events)?;
    adopt_existing_events(doc, ctx, &mut events)?;

    *doc.collection_mut(EVENTS) = events.into_iter().map(Value::Object).collect();
    ctx.commit_last_item_id(doc);
    Ok(())
}

fn split_items(doc: &mut Document) {
    for name in TYPED_COLLECTIONS {
        doc.collection_mut(name);
    }
    let Some(items) = doc.take_collection(ITEMS) else {
        return;
    };

    let mut residue = Vec::new();
    for item in items {
        let target = item
            .as_object()
            .and_then(|record| collection_for_kind(record_kind(record)));
        match target {
            Some(name) => doc.collection_mut(name).push(item),
            None => residue.push(item),
        }
    }
    if !residue.is_empty() {
        doc.insert(ITEMS, Value::Array(residue));
    }
}

fn record_at<'a>(doc: &'a mut Document, collection: &str, index: usize) -> Option<&'a mut Record> {
    doc.collection_mut(collection)
        .get_mut(index)
        .and_then(Value::as_object_mut)
}

fn extract_builtin_person_events(
    doc: &mut Document,
    ctx: &mut MigrationContext,
    events: &mut Vec<Record>,
) -> MigrationResult<()> {
    let count = doc.collection_mut(PEOPLE).len();
    for index in 0..count {
        for (field, builtin) in BUILTIN_PERSON_EVENTS {
            let Some(person) = record_at(doc, PEOPLE, index) else {
                break;
            };
            let Some(mut event) = take_object(person, NAME, field)? else {
                continue;
            };
            if event.is_empty() {
                continue;
            }
            let person_id = require_id(person, NAME)?;
            let kind = resolve_event_kind(&mut event, EventKind::from_person_unique_id, builtin);
            ensure_event_id(&mut event, ctx)?;
            link_person_event(doc, index, person_id, &mut event, kind, ctx)?;
            events.push(event);
        }
    }
    Ok(())
}

fn extract_custom_person_events(
    doc: &mut Document,
    ctx: &mut MigrationContext,
    events: &mut Vec<Record>,
) -> MigrationResult<()> {
    let count = doc.collection_mut(PEOPLE).len();
    for index in 0..count {
        let Some(person) = record_at(doc, PEOPLE, index) else {
            continue;
        };
        let Some(custom) = take_records(person, NAME, "events")? else {
            continue;
        };
        if custom.is_empty() {
            continue;
        }
        let person_id = require_id(person, NAME)?;
        for mut event in custom {
            let kind =
                resolve_event_kind(&mut event, EventKind::from_person_unique_id, EventKind::Shift);
            ensure_event_id(&mut event, ctx)?;
            link_person_event(doc, index, person_id, &mut event, kind, ctx)?;
            events.push(event);
        }
    }
    Ok(())
}

fn extract_marriage_events(
    doc: &mut Document,
    ctx: &mut MigrationContext,
    events: &mut Vec<Record>,
) -> MigrationResult<()> {
    for marriage in doc.records_mut(MARRIAGES) {
        let Some(embedded) = take_records(marriage, NAME, "events")? else {
            continue;
        };
        if embedded.is_empty() {
            continue;
        }
        let person_a = require_item_ref(marriage, NAME, "person_a")?;
        let person_b = require_item_ref(marriage, NAME, "person_b")?;
        for mut event in embedded {
            let kind = resolve_event_kind(
                &mut event,
                EventKind::from_marriage_unique_id,
                EventKind::Shift,
            );
            event.insert("kind".to_string(), Value::from(kind.as_str()));
            ensure_event_id(&mut event, ctx)?;
            event.insert("person".to_string(), Value::from(person_a));
            event.insert("spouse".to_string(), Value::from(person_b));
            events.push(event);
        }
    }
    Ok(())
}

fn extract_emotion_events(
    doc: &mut Document,
    ctx: &mut MigrationContext,
    events: &mut Vec<Record>,
) -> MigrationResult<()> {
    for emotion in doc.records_mut(EMOTIONS) {
        let relationship = normalize_emotion_kind(emotion, ctx);
        let Some(mut event) = take_object(emotion, NAME, "startEvent")? else {
            continue;
        };
        let end_event = take_object(emotion, NAME, "endEvent")?;

        let kind = resolve_event_kind(&mut event, EventKind::from_any_unique_id, EventKind::Shift);
        event.insert("kind".to_string(), Value::from(kind.as_str()));
        let event_id = ensure_event_id(&mut event, ctx)?;

        if let Some(person_a) = emotion.get("person_a") {
            event.insert("person".to_string(), person_a.clone());
        }
        if let Some(intensity) = emotion.remove("intensity") {
            event.insert("relationshipIntensity".to_string(), intensity);
        }
        if let Some(notes) = emotion.remove("notes") {
            if is_set(Some(&notes)) || !event.contains_key("notes") {
                event.insert("notes".to_string(), notes);
            }
        }
        if let Some(target) = emotion.get("person_b").filter(|target| !target.is_null()) {
            event.insert("relationshipTargets".to_string(), json!([target]));
        }
        set_dynamic_relationship(&mut event, relationship)?;

        let end_date_time = end_event
            .as_ref()
            .and_then(|end| end.get("dateTime"))
            .filter(|value| is_set(Some(value)));
        if let Some(end_date_time) = end_date_time {
            event.insert("endDateTime".to_string(), end_date_time.clone());
        } else if is_set(emotion.get("isDateRange")) {
            event.insert("endDateTime".to_string(), Value::Null);
        }

        emotion.insert("event".to_string(), Value::from(event_id));
        if let Some(target) = emotion.remove("person_b") {
            emotion.insert("target".to_string(), target);
        }
        for field in ["person_a", "isDateRange", "isSingularDate"] {
            emotion.remove(field);
        }
        events.push(event);
    }
    Ok(())
}

fn adopt_existing_events(
    doc: &mut Document,
    ctx: &mut MigrationContext,
    events: &mut Vec<Record>,
) -> MigrationResult<()> {
    for value in doc.take_collection(EVENTS).unwrap_or_default() {
        let mut event = match value {
            Value::Object(event) => event,
            other => {
                return Err(MigrationError::InvalidField {
                    step: NAME,
                    entity_id: None,
                    field: "events",
                    reason: format!("expected event records, found {other}"),
                })
            }
        };
        let kind = resolve_event_kind(&mut event, EventKind::from_any_unique_id, EventKind::Shift);
        event.insert("kind".to_string(), Value::from(kind.as_str()));
        ensure_event_id(&mut event, ctx)?;
        events.push(event);
    }
    Ok(())
}

/// Translates `uniqueId` through `table` when present; otherwise keeps a
/// valid `kind` or falls back.
fn resolve_event_kind(
    event: &mut Record,
    table: fn(Option<&str>) -> EventKind,
    fallback: EventKind,
) -> EventKind {
    if let Some(unique_id) = event.remove("uniqueId") {
        return table(unique_id.as_str());
    }
    event
        .get("kind")
        .and_then(Value::as_str)
        .and_then(EventKind::parse)
        .unwrap_or(fallback)
}

fn ensure_event_id(event: &mut Record, ctx: &mut MigrationContext) -> MigrationResult<ItemId> {
    match event.get("id") {
        None | Some(Value::Null) => {
            let id = ctx.mint_id();
            event.insert("id".to_string(), Value::from(id));
            Ok(id)
        }
        Some(_) => require_id(event, NAME),
    }
}

/// Birth and adoption events point at the parents and the child; every other
/// person event only at the person.
fn link_person_event(
    doc: &mut Document,
    person_index: usize,
    person_id: ItemId,
    event: &mut Record,
    kind: EventKind,
    ctx: &mut MigrationContext,
) -> MigrationResult<()> {
    event.insert("kind".to_string(), Value::from(kind.as_str()));
    if !kind.is_parental() {
        event.insert("person".to_string(), Value::from(person_id));
        return Ok(());
    }
    let resolution = ensure_parents(doc, person_index, NAME, ctx)?;
    event.insert("child".to_string(), Value::from(person_id));
    event.insert(
        "person".to_string(),
        Value::from(resolution.parents.person_a),
    );
    event.insert(
        "spouse".to_string(),
        Value::from(resolution.parents.person_b),
    );
    Ok(())
}

fn normalize_emotion_kind(emotion: &mut Record, ctx: &mut MigrationContext) -> RelationshipKind {
    let stored = emotion.get("kind").cloned().unwrap_or(Value::Null);
    let kind = stored
        .as_str()
        .and_then(RelationshipKind::from_legacy)
        .unwrap_or_else(|| {
            ctx.warn(
                NAME,
                format!(
                    "emotion {} has unknown kind {stored}, using {}",
                    record_id(emotion).map_or_else(|| "without id".to_string(), |id| id.to_string()),
                    RelationshipKind::Conflict
                ),
            );
            RelationshipKind::Conflict
        });
    emotion.insert("kind".to_string(), Value::from(kind.as_str()));
    kind
}

fn set_dynamic_relationship(
    event: &mut Record,
    relationship: RelationshipKind,
) -> MigrationResult<()> {
    let entity_id = record_id(event);
    let slot = event
        .entry("dynamicProperties".to_string())
        .or_insert_with(|| json!({}));
    if slot.is_null() {
        *slot = json!({});
    }
    match slot {
        Value::Object(properties) => {
            properties.insert(
                "relationship".to_string(),
                Value::from(relationship.as_str()),
            );
            Ok(())
        }
        other => Err(MigrationError::InvalidField {
            step: NAME,
            entity_id,
            field: "dynamicProperties",
            reason: format!("expected an object, found {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{apply, collection_for_kind};
    use crate::migrate::context::fixed_now;
    use crate::migrate::{MigrationContext, MigrationError};
    use crate::model::document::Document;
    use serde_json::{json, Value};

    fn run(input: Value) -> Result<(Value, Vec<String>), MigrationError> {
        let mut doc = Document::from_value(input).unwrap();
        let mut ctx = MigrationContext::for_document(&doc, fixed_now());
        apply(&mut doc, &mut ctx)?;
        Ok((doc.into_value(), ctx.warnings().to_vec()))
    }

    #[test]
    fn kinds_route_to_collections() {
        assert_eq!(collection_for_kind("Person"), Some("people"));
        assert_eq!(collection_for_kind("Reciprocity"), Some("emotions"));
        assert_eq!(collection_for_kind("defined-self"), Some("emotions"));
        assert_eq!(collection_for_kind("PencilStroke"), Some("layerItems"));
        assert_eq!(collection_for_kind("UnknownFutureType"), None);
    }

    #[test]
    fn unknown_items_stay_in_items() {
        let (value, _) = run(json!({
            "version": "2.0.11",
            "lastItemId": 3,
            "items": [
                {"kind": "Person", "id": 1},
                {"kind": "UnknownFutureType", "id": 2},
                {"kind": "AnotherUnknown", "id": 3}
            ]
        }))
        .unwrap();

        assert_eq!(
            value,
            json!({
                "version": "2.0.11",
                "lastItemId": 3,
                "people": [{"kind": "Person", "id": 1}],
                "marriages": [],
                "emotions": [],
                "events": [],
                "layerItems": [],
                "layers": [],
                "multipleBirths": [],
                "items": [
                    {"kind": "UnknownFutureType", "id": 2},
                    {"kind": "AnotherUnknown", "id": 3}
                ]
            })
        );
    }

    #[test]
    fn missing_event_ids_are_minted_before_parents() {
        let (value, _) = run(json!({
            "version": "2.0.11",
            "lastItemId": 5,
            "items": [{
                "kind": "Person",
                "id": 1,
                "birthEvent": {"uniqueId": "birth", "dateTime": "2000-01-01T00:00:00"},
                "events": [{"uniqueId": "CustomIndividual", "dateTime": "2020-01-01T00:00:00"}]
            }]
        }))
        .unwrap();

        assert_eq!(
            value,
            json!({
                "version": "2.0.11",
                "lastItemId": 10,
                "people": [
                    {
                        "kind": "Person",
                        "id": 1,
                        "childOf": {"person": 1, "parents": 9, "multipleBirth": null}
                    },
                    {
                        "kind": "Person",
                        "id": 7,
                        "gender": "male",
                        "size": 4,
                        "itemPos": {"x": -160.0, "y": -240.0},
                        "layers": []
                    },
                    {
                        "kind": "Person",
                        "id": 8,
                        "gender": "female",
                        "size": 4,
                        "itemPos": {"x": 160.0, "y": -240.0},
                        "layers": []
                    }
                ],
                "marriages": [{"kind": "Marriage", "id": 9, "person_a": 7, "person_b": 8}],
                "emotions": [],
                "events": [
                    {
                        "id": 6,
                        "kind": "birth",
                        "dateTime": "2000-01-01T00:00:00",
                        "child": 1,
                        "person": 7,
                        "spouse": 8
                    },
                    {"id": 10, "kind": "shift", "dateTime": "2020-01-01T00:00:00", "person": 1}
                ],
                "layerItems": [],
                "layers": [],
                "multipleBirths": []
            })
        );
    }

    #[test]
    fn marriage_events_carry_the_pair() {
        let (value, _) = run(json!({
            "lastItemId": 20,
            "items": [{
                "kind": "Marriage",
                "id": 10,
                "person_a": 1,
                "person_b": 2,
                "events": [
                    {"id": 15, "uniqueId": "bonded"},
                    {"id": 17, "uniqueId": "moved", "location": "NYC"},
                    {"id": 18, "uniqueId": "emotionStartEvent"}
                ]
            }]
        }))
        .unwrap();

        assert_eq!(
            value["events"],
            json!([
                {"id": 15, "kind": "bonded", "person": 1, "spouse": 2},
                {"id": 17, "kind": "moved", "location": "NYC", "person": 1, "spouse": 2},
                {"id": 18, "kind": "shift", "person": 1, "spouse": 2}
            ])
        );
        assert_eq!(
            value["marriages"],
            json!([{"kind": "Marriage", "id": 10, "person_a": 1, "person_b": 2}])
        );
    }

    #[test]
    fn marriage_events_without_partner_fail() {
        let err = run(json!({
            "items": [{"kind": "Marriage", "id": 4, "person_b": 2, "events": [{"id": 5}]}]
        }))
        .unwrap_err();
        assert_eq!(
            err,
            MigrationError::MissingField {
                step: "normalize_collections",
                entity_id: Some(4),
                field: "person_a",
            }
        );
    }

    #[test]
    fn emotion_date_range_becomes_one_event() {
        let (value, warnings) = run(json!({
            "lastItemId": 30,
            "items": [{
                "kind": "Conflict",
                "id": 20,
                "person_a": 1,
                "person_b": 2,
                "intensity": 7,
                "notes": "Test conflict",
                "isDateRange": true,
                "startEvent": {
                    "id": 25,
                    "uniqueId": "emotionStartEvent",
                    "dateTime": "2020-01-01T00:00:00"
                },
                "endEvent": {
                    "id": 26,
                    "uniqueId": "emotionEndEvent",
                    "dateTime": "2020-12-31T00:00:00"
                }
            }]
        }))
        .unwrap();

        assert!(warnings.is_empty());
        assert_eq!(
            value["emotions"],
            json!([{"kind": "conflict", "id": 20, "event": 25, "target": 2}])
        );
        assert_eq!(
            value["events"],
            json!([{
                "id": 25,
                "kind": "shift",
                "dateTime": "2020-01-01T00:00:00",
                "endDateTime": "2020-12-31T00:00:00",
                "person": 1,
                "relationshipTargets": [2],
                "relationshipIntensity": 7,
                "dynamicProperties": {"relationship": "conflict"},
                "notes": "Test conflict"
            }])
        );
    }

    #[test]
    fn open_date_range_gets_null_end() {
        let (value, _) = run(json!({
            "items": [{
                "kind": "Reciprocity",
                "id": 3,
                "person_a": 1,
                "person_b": null,
                "isDateRange": true,
                "startEvent": {"id": 4, "dateTime": "2020-01-01T00:00:00"},
                "endEvent": {"dateTime": null}
            }]
        }))
        .unwrap();

        assert_eq!(
            value["emotions"],
            json!([{"kind": "underfunctioning", "id": 3, "event": 4, "target": null}])
        );
        assert_eq!(
            value["events"],
            json!([{
                "id": 4,
                "kind": "shift",
                "dateTime": "2020-01-01T00:00:00",
                "endDateTime": null,
                "person": 1,
                "dynamicProperties": {"relationship": "underfunctioning"}
            }])
        );
    }

    #[test]
    fn unknown_emotion_kind_defaults_to_conflict() {
        let (value, warnings) = run(json!({
            "emotions": [{"kind": "Jealousy", "id": 1}],
            "items": [{"kind": "Emotion", "id": 2}]
        }))
        .unwrap();

        assert_eq!(
            value["emotions"],
            json!([{"kind": "conflict", "id": 1}, {"kind": "conflict", "id": 2}])
        );
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("Jealousy"));
    }

    #[test]
    fn existing_events_keep_valid_kinds() {
        let (value, _) = run(json!({
            "lastItemId": 3,
            "events": [
                {"id": 1, "kind": "married", "person": 4, "spouse": 5},
                {"id": 2, "uniqueId": "death", "person": 4},
                {"kind": "Event", "person": 4}
            ]
        }))
        .unwrap();

        assert_eq!(
            value["events"],
            json!([
                {"id": 1, "kind": "married", "person": 4, "spouse": 5},
                {"id": 2, "kind": "death", "person": 4},
                {"id": 4, "kind": "shift", "person": 4}
            ])
        );
        assert_eq!(value["lastItemId"], 4);
    }
}
