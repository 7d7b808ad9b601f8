use genogram_compat::model::geometry::Point;
use genogram_compat::{migrate_document, Document, MigrateOptions, MigrationError};
use serde_json::{json, Value};

fn migrate(value: Value) -> Document {
    let mut doc = Document::from_value(value).unwrap();
    migrate_document(&mut doc, &MigrateOptions::default()).unwrap();
    doc
}

fn item_pos(record: &serde_json::Map<String, Value>) -> Point {
    Point::from_value(&record["itemPos"]).unwrap()
}

#[test]
fn birth_with_recorded_union_uses_its_partners() {
    let doc = migrate(json!({
        "version": "2.0.11",
        "lastItemId": 5,
        "items": [
            {
                "kind": "Person",
                "id": 1,
                "name": "Alice",
                "size": 3,
                "birthEvent": {"id": 4, "uniqueId": "birth", "dateTime": "2000-01-01T00:00:00"},
                "childOf": {"person": 1, "parents": 5, "multipleBirth": null}
            },
            {"kind": "Person", "id": 2, "name": "Parent1"},
            {"kind": "Person", "id": 3, "name": "Parent2"},
            {"kind": "Marriage", "id": 5, "person_a": 2, "person_b": 3}
        ]
    }));

    assert_eq!(doc.last_item_id(), Some(5));
    assert_eq!(doc.records("people").count(), 3);
    assert_eq!(doc.records("marriages").count(), 1);
    assert_eq!(
        doc.get("events"),
        Some(&json!([{
            "id": 4,
            "kind": "birth",
            "dateTime": "2000-01-01T00:00:00",
            "child": 1,
            "person": 2,
            "spouse": 3
        }]))
    );
}

#[test]
fn adoption_with_recorded_union_uses_its_partners() {
    let doc = migrate(json!({
        "version": "2.0.11",
        "lastItemId": 5,
        "items": [
            {
                "kind": "Person",
                "id": 1,
                "adoptedEvent": {"id": 4, "uniqueId": "adopted", "dateTime": "2005-06-15T00:00:00"},
                "childOf": {"person": 1, "parents": 5, "multipleBirth": null}
            },
            {"kind": "Person", "id": 2},
            {"kind": "Person", "id": 3},
            {"kind": "Marriage", "id": 5, "person_a": 2, "person_b": 3}
        ]
    }));

    let event = doc.records("events").next().unwrap();
    assert_eq!(event["kind"], json!("adopted"));
    assert_eq!(event["child"], json!(1));
    assert_eq!(event["person"], json!(2));
    assert_eq!(event["spouse"], json!(3));
}

#[test]
fn birth_without_union_places_smaller_parents_above_child() {
    let doc = migrate(json!({
        "version": "2.0.11",
        "lastItemId": 2,
        "items": [{
            "kind": "Person",
            "id": 1,
            "name": "Orphan",
            "size": 3,
            "itemPos": {"x": 100, "y": 100},
            "layers": [7],
            "birthEvent": {"id": 2, "uniqueId": "birth", "dateTime": "2000-01-01T00:00:00"}
        }]
    }));

    assert_eq!(doc.last_item_id(), Some(5));
    let people: Vec<_> = doc.records("people").collect();
    assert_eq!(people.len(), 3);
    assert_eq!(
        people[0]["childOf"],
        json!({"person": 1, "parents": 5, "multipleBirth": null})
    );

    let (father, mother) = (people[1], people[2]);
    assert_eq!(father["id"], json!(3));
    assert_eq!(father["gender"], json!("male"));
    assert_eq!(father["size"], json!(2));
    assert_eq!(father["layers"], json!([7]));
    assert_eq!(item_pos(father), Point::new(68.0, 52.0));
    assert_eq!(mother["id"], json!(4));
    assert_eq!(mother["gender"], json!("female"));
    assert_eq!(item_pos(mother), Point::new(132.0, 52.0));

    assert_eq!(
        doc.get("marriages"),
        Some(&json!([{"kind": "Marriage", "id": 5, "person_a": 3, "person_b": 4}]))
    );
    let event = doc.records("events").next().unwrap();
    assert_eq!(event["child"], json!(1));
    assert_eq!(event["person"], json!(3));
    assert_eq!(event["spouse"], json!(4));
}

#[test]
fn death_event_only_names_the_person() {
    let doc = migrate(json!({
        "version": "2.0.11",
        "lastItemId": 2,
        "items": [{
            "kind": "Person",
            "id": 1,
            "deathEvent": {"id": 2, "uniqueId": "death", "dateTime": "2080-01-01T00:00:00"}
        }]
    }));

    assert_eq!(doc.records("people").count(), 1);
    assert_eq!(doc.get("marriages"), Some(&json!([])));
    assert_eq!(
        doc.get("events"),
        Some(&json!([{"id": 2, "kind": "death", "dateTime": "2080-01-01T00:00:00", "person": 1}]))
    );
}

#[test]
fn custom_birth_event_also_synthesizes_parents() {
    let doc = migrate(json!({
        "version": "2.0.11",
        "lastItemId": 5,
        "items": [{
            "kind": "Person",
            "id": 1,
            "size": 2,
            "events": [{"id": 5, "uniqueId": "birth", "dateTime": "1990-01-01T00:00:00"}]
        }]
    }));

    assert_eq!(doc.last_item_id(), Some(8));
    let people: Vec<_> = doc.records("people").collect();
    assert_eq!(people[0]["childOf"]["parents"], json!(8));
    assert_eq!(people[1]["size"], json!(1));
    assert_eq!(item_pos(people[1]), Point::new(-12.8, -19.2));
    assert_eq!(item_pos(people[2]), Point::new(12.8, -19.2));
    assert!(!people[0].contains_key("events"));

    let event = doc.records("events").next().unwrap();
    assert_eq!(event["id"], json!(5));
    assert_eq!(event["kind"], json!("birth"));
    assert_eq!(event["person"], json!(6));
    assert_eq!(event["spouse"], json!(7));
}

#[test]
fn inferred_parents_never_shrink_below_size_one() {
    let doc = migrate(json!({
        "version": "2.0.11",
        "lastItemId": 2,
        "items": [{
            "kind": "Person",
            "id": 1,
            "size": 1,
            "birthEvent": {"id": 2, "uniqueId": "birth", "dateTime": "2000-01-01T00:00:00"}
        }]
    }));

    let people: Vec<_> = doc.records("people").collect();
    assert_eq!(people[1]["size"], json!(1));
    assert_eq!(people[2]["size"], json!(1));
    assert_eq!(item_pos(people[1]), Point::new(-12.8, -19.2));
}

#[test]
fn birth_and_adoption_share_one_synthesized_union() {
    let doc = migrate(json!({
        "version": "2.0.11",
        "lastItemId": 3,
        "items": [{
            "kind": "Person",
            "id": 1,
            "birthEvent": {"id": 2, "uniqueId": "birth"},
            "adoptedEvent": {"id": 3, "uniqueId": "adopted"}
        }]
    }));

    assert_eq!(doc.records("marriages").count(), 1);
    assert_eq!(doc.records("people").count(), 3);
    let events: Vec<_> = doc.records("events").collect();
    assert_eq!(events[0]["person"], events[1]["person"]);
    assert_eq!(events[0]["spouse"], events[1]["spouse"]);
}

#[test]
fn union_missing_from_document_fails_migration() {
    let mut doc = Document::from_value(json!({
        "version": "2.0.11",
        "lastItemId": 2,
        "items": [{
            "kind": "Person",
            "id": 1,
            "birthEvent": {"id": 2, "uniqueId": "birth"},
            "childOf": {"person": 1, "parents": 40, "multipleBirth": null}
        }]
    }))
    .unwrap();

    let err = migrate_document(&mut doc, &MigrateOptions::default()).unwrap_err();
    assert_eq!(
        err,
        MigrationError::DanglingReference {
            step: "normalize_collections",
            entity_id: Some(1),
            field: "childOf.parents",
            target: 40,
        }
    );
}
