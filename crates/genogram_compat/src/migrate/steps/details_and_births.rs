//! Details text restructuring and `childOf` synthesis.
//!
//! # Responsibility
//! - Collapse the scattered details/separation positions into nested
//!   `detailsText` and `separationIndicator` records.
//! - Replace legacy `parents`/`birthPartners` with `childOf`, minting
//!   `MultipleBirth` records for twins and triplets.
//!
//! # Invariants
//! - Coordinates past the sanity limits are reset to the origin.
//! - New `MultipleBirth` records are appended to `items` and counted in
//!   `lastItemId`.

use super::LAYER_ITEM_KINDS;
use crate::migrate::fields::{point_field, require_id, require_object_mut};
use crate::migrate::{MigrationContext, MigrationError, MigrationResult};
use crate::model::document::{record_id, record_kind, Document, ItemId, Record, ITEMS};
use crate::model::geometry::Point;
use crate::model::records::ChildOf;
use serde_json::{json, Value};

pub const NAME: &str = "restructure_details_and_births";

/// Details text further than this from the origin is corrupt.
pub const DETAILS_POS_LIMIT: f64 = 15_000.0;
/// Separation indicators further than this from the origin are corrupt.
pub const SEPARATION_POS_LIMIT: f64 = 100_000.0;

const LAYER_PROPERTY_RENAMES: [(&str, &str); 3] = [
    ("layerPos", "itemPos"),
    ("layerSize", "size"),
    ("layerOpacity", "itemOpacity"),
];

pub fn apply(doc: &mut Document, ctx: &mut MigrationContext) -> MigrationResult<()> {
    for item in doc.records_mut(ITEMS) {
        let kind = record_kind(item).to_string();
        if kind == "Person" || kind == "Marriage" {
            restructure_details(item)?;
        }
        item.remove("layerPos");

        match kind.as_str() {
            "Marriage" => {
                item.remove("nonLayerPos");
            }
            "Person" => {
                if let Some(pos) = item.remove("nonLayerPos") {
                    item.insert("itemPos".to_string(), pos);
                }
                if !item.contains_key("childOf") {
                    let child_of = child_of_from_parents(item, ctx)?;
                    item.insert("childOf".to_string(), child_of);
                }
            }
            "Layer" => rename_layer_properties(item)?,
            other if LAYER_ITEM_KINDS.contains(&other) => {
                if let Some(pos) = point_field(item, NAME, "pos")? {
                    item.remove("pos");
                    item.insert("itemPos".to_string(), pos.to_value());
                }
            }
            _ => {}
        }
    }

    let births = ctx.take_multiple_births();
    if !births.is_empty() {
        doc.collection_mut(ITEMS)
            .extend(births.iter().map(|birth| birth.to_value()));
    }
    ctx.commit_last_item_id(doc);
    Ok(())
}

fn restructure_details(item: &mut Record) -> MigrationResult<()> {
    let entity_id = record_id(item);
    let details_pos = point_field(item, NAME, "detailsPos")?;
    item.remove("detailsPos");
    let separation_pos = point_field(item, NAME, "separationIndicatorPos")?;
    item.remove("separationIndicatorPos");

    if !item.contains_key("detailsText") {
        item.insert(
            "detailsText".to_string(),
            json!({ "itemPos": Point::ORIGIN.to_value() }),
        );
    }
    let details = require_object_mut(item, NAME, entity_id, "detailsText")?;
    let mut item_pos = match details_pos {
        Some(pos) => Some(pos),
        None => match point_field(details, NAME, "itemPos")? {
            Some(pos) => Some(pos),
            None => point_field(details, NAME, "nonLayerPos")?,
        },
    }
    .unwrap_or(Point::ORIGIN);
    if item_pos.exceeds(DETAILS_POS_LIMIT) {
        item_pos = Point::ORIGIN;
    }
    details.remove("layerPos");
    details.remove("nonLayerPos");
    details.insert("itemPos".to_string(), item_pos.to_value());

    if let Some(mut pos) = separation_pos {
        if pos.exceeds(SEPARATION_POS_LIMIT) {
            pos = Point::ORIGIN;
        }
        item.insert(
            "separationIndicator".to_string(),
            json!({ "itemPos": pos.to_value() }),
        );
    }
    Ok(())
}

fn child_of_from_parents(person: &Record, ctx: &mut MigrationContext) -> MigrationResult<Value> {
    let Some(parents) = person.get("parents").filter(|value| !value.is_null()) else {
        return Ok(ChildOf::empty_value());
    };
    let person_id = require_id(person, NAME)?;
    let parents = parents
        .as_i64()
        .ok_or_else(|| MigrationError::InvalidField {
            step: NAME,
            entity_id: Some(person_id),
            field: "parents",
            reason: format!("expected an integer id, found {parents}"),
        })?;

    let mut child_of = ChildOf::new(person_id, parents);
    let partners = birth_partners(person, person_id)?;
    if !partners.is_empty() {
        let children: Vec<ItemId> = std::iter::once(person_id).chain(partners).collect();
        child_of.multiple_birth = Some(ctx.multiple_birth_for(parents, &children));
    }
    Ok(child_of.to_value())
}

fn birth_partners(person: &Record, person_id: ItemId) -> MigrationResult<Vec<ItemId>> {
    let invalid = |value: &Value| MigrationError::InvalidField {
        step: NAME,
        entity_id: Some(person_id),
        field: "birthPartners",
        reason: format!("expected a list of ids, found {value}"),
    };
    match person.get("birthPartners") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(values)) => values
            .iter()
            .map(|value| value.as_i64().ok_or_else(|| invalid(value)))
            .collect(),
        Some(other) => Err(invalid(other)),
    }
}

fn rename_layer_properties(layer: &mut Record) -> MigrationResult<()> {
    let entity_id = record_id(layer);
    let properties = match layer.get_mut("itemProperties") {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Object(properties)) => properties,
        Some(other) => {
            return Err(MigrationError::InvalidField {
                step: NAME,
                entity_id,
                field: "itemProperties",
                reason: format!("expected an object, found {other}"),
            })
        }
    };
    for entry in properties.values_mut().filter_map(Value::as_object_mut) {
        for (from, to) in LAYER_PROPERTY_RENAMES {
            if let Some(value) = entry.remove(from) {
                entry.insert(to.to_string(), value);
            }
        }
    }
    Ok(())
}
