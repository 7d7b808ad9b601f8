//! Parent resolution for birth and adoption events.
//!
//! # Responsibility
//! - Resolve the union a child belongs to through `childOf.parents`.
//! - Synthesize a father, a mother and their union when no union exists.
//!
//! # Invariants
//! - An existing parent union always wins over synthesis.
//! - Synthesized ids are minted father, mother, union, in that order.
//! - Once synthesized, the child's `childOf` points at the new union, so later
//!   events of the same child reuse it.

use super::context::MigrationContext;
use super::fields::require_item_ref;
use super::{MigrationError, MigrationResult};
use crate::model::document::{record_id, Document, ItemId, Record, MARRIAGES, PEOPLE};
use crate::model::geometry::{person_width, Point, DEFAULT_PERSON_SIZE};
use crate::model::records::ChildOf;
use log::debug;
use serde_json::{json, Value};

pub const GENDER_MALE: &str = "male";
pub const GENDER_FEMALE: &str = "female";

/// What the synthesized parents inherit from the child.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildPlacement {
    pub position: Point,
    pub size: i64,
    pub layers: Vec<Value>,
}

impl ChildPlacement {
    pub fn of(person: &Record) -> Self {
        Self {
            position: person
                .get("itemPos")
                .and_then(Point::from_value)
                .unwrap_or(Point::ORIGIN),
            size: person
                .get("size")
                .and_then(Value::as_i64)
                .unwrap_or(DEFAULT_PERSON_SIZE),
            layers: person
                .get("layers")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
        }
    }
}

/// Size and placement of synthesized parents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentSpec {
    pub size: i64,
    pub male_pos: Point,
    pub female_pos: Point,
}

/// Parents are one size smaller than the child (never below 1) and sit two
/// widths to either side and three widths above it.
pub fn inferred_parent_spec(child_pos: Point, child_size: i64) -> ParentSpec {
    let size = child_size.saturating_sub(1).max(1);
    let width = person_width(size);
    ParentSpec {
        size,
        male_pos: child_pos.offset(-2.0 * width, -3.0 * width).snapped(),
        female_pos: child_pos.offset(2.0 * width, -3.0 * width).snapped(),
    }
}

/// The union a child belongs to and its two partners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parents {
    pub person_a: ItemId,
    pub person_b: ItemId,
    pub marriage: ItemId,
}

/// Which of the three records a resolution created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Created {
    pub person_a: bool,
    pub person_b: bool,
    pub marriage: bool,
}

impl Created {
    pub fn any(&self) -> bool {
        self.person_a || self.person_b || self.marriage
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentResolution {
    pub parents: Parents,
    pub created: Created,
}

/// Synthesized parent records, not yet attached to a document.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredParents {
    pub parents: Parents,
    pub father: Record,
    pub mother: Record,
    pub marriage: Record,
}

/// Mints ids and builds the father, mother and union records for a child.
pub fn synthesize_parents(child: &ChildPlacement, ctx: &mut MigrationContext) -> InferredParents {
    let spec = inferred_parent_spec(child.position, child.size);
    let parents = Parents {
        person_a: ctx.mint_id(),
        person_b: ctx.mint_id(),
        marriage: ctx.mint_id(),
    };
    let person = |id: ItemId, gender: &str, pos: Point| -> Record {
        let value = json!({
            "kind": "Person",
            "id": id,
            "gender": gender,
            "size": spec.size,
            "itemPos": pos.to_value(),
            "layers": child.layers,
        });
        value.as_object().cloned().unwrap_or_default()
    };
    let marriage = json!({
        "kind": "Marriage",
        "id": parents.marriage,
        "person_a": parents.person_a,
        "person_b": parents.person_b,
    });

    InferredParents {
        parents,
        father: person(parents.person_a, GENDER_MALE, spec.male_pos),
        mother: person(parents.person_b, GENDER_FEMALE, spec.female_pos),
        marriage: marriage.as_object().cloned().unwrap_or_default(),
    }
}

/// Resolves the parents of `people[child_index]`, synthesizing them when the
/// child has no recorded union.
///
/// # Errors
/// - `DanglingReference` when `childOf.parents` names a missing union.
/// - `MissingField`/`InvalidField` when that union lacks its partners.
pub fn ensure_parents(
    doc: &mut Document,
    child_index: usize,
    step: &'static str,
    ctx: &mut MigrationContext,
) -> MigrationResult<ParentResolution> {
    let child = doc
        .collection_mut(PEOPLE)
        .get(child_index)
        .and_then(Value::as_object)
        .cloned()
        .ok_or(MigrationError::MissingField {
            step,
            entity_id: None,
            field: "people",
        })?;
    let child_id = require_item_ref(&child, step, "id")?;

    if let Some(child_of) = child.get("childOf").and_then(ChildOf::from_value) {
        let marriage = doc
            .records(MARRIAGES)
            .find(|marriage| record_id(marriage) == Some(child_of.parents))
            .ok_or(MigrationError::DanglingReference {
                step,
                entity_id: Some(child_id),
                field: "childOf.parents",
                target: child_of.parents,
            })?;
        return Ok(ParentResolution {
            parents: Parents {
                person_a: require_item_ref(marriage, step, "person_a")?,
                person_b: require_item_ref(marriage, step, "person_b")?,
                marriage: child_of.parents,
            },
            created: Created::default(),
        });
    }

    let inferred = synthesize_parents(&ChildPlacement::of(&child), ctx);
    debug!(
        "event=infer_parents module=migrate status=ok child={} person_a={} person_b={} marriage={}",
        child_id, inferred.parents.person_a, inferred.parents.person_b, inferred.parents.marriage
    );

    let people = doc.collection_mut(PEOPLE);
    if let Some(record) = people.get_mut(child_index).and_then(Value::as_object_mut) {
        record.insert(
            "childOf".to_string(),
            ChildOf::new(child_id, inferred.parents.marriage).to_value(),
        );
    }
    people.push(Value::Object(inferred.father));
    people.push(Value::Object(inferred.mother));
    doc.collection_mut(MARRIAGES)
        .push(Value::Object(inferred.marriage));

    Ok(ParentResolution {
        parents: inferred.parents,
        created: Created {
            person_a: true,
            person_b: true,
            marriage: true,
        },
    })
}
