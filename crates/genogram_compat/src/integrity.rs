//! Post-migration integrity checks.
//!
//! # Responsibility
//! - Report id collisions, a stale `lastItemId`, dangling event and emotion
//!   references, and typed items left behind in `items`.
//!
//! # Invariants
//! - Checks never mutate the document.
//! - Issues are reported in a stable order: ids, counter, events, emotions,
//!   residue.

use crate::migrate::steps::normalize::collection_for_kind;
use crate::model::document::{
    record_id, record_kind, Document, ItemId, EMOTIONS, EVENTS, ITEMS, PEOPLE, TYPED_COLLECTIONS,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

/// Event fields that must name a person.
const EVENT_PERSON_REFS: [&str; 3] = ["person", "spouse", "child"];

/// One integrity violation in a migrated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    DuplicateId {
        id: ItemId,
        occurrences: usize,
    },
    StaleLastItemId {
        last_item_id: Option<ItemId>,
        max_id: ItemId,
    },
    DanglingEventReference {
        event: Option<ItemId>,
        field: &'static str,
        target: String,
    },
    DanglingEmotionEvent {
        emotion: Option<ItemId>,
        target: String,
    },
    /// A recognized kind still sits in the untyped `items` bag.
    UntypedResidue {
        id: Option<ItemId>,
        kind: String,
    },
}

impl Display for IntegrityIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateId { id, occurrences } => {
                write!(f, "id {id} is used by {occurrences} items")
            }
            Self::StaleLastItemId {
                last_item_id,
                max_id,
            } => match last_item_id {
                Some(last) => write!(f, "lastItemId {last} is below max id {max_id}"),
                None => write!(f, "lastItemId is missing; max id is {max_id}"),
            },
            Self::DanglingEventReference {
                event,
                field,
                target,
            } => write!(
                f,
                "event {} field `{field}` names missing person {target}",
                describe(*event)
            ),
            Self::DanglingEmotionEvent { emotion, target } => write!(
                f,
                "emotion {} names missing event {target}",
                describe(*emotion)
            ),
            Self::UntypedResidue { id, kind } => {
                write!(f, "item {} of kind `{kind}` left in items", describe(*id))
            }
        }
    }
}

/// Runs every check and returns the issues found.
pub fn check_integrity(doc: &Document) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();
    check_ids(doc, &mut issues);
    check_event_references(doc, &mut issues);
    check_emotion_references(doc, &mut issues);
    check_residue(doc, &mut issues);
    issues
}

fn check_ids(doc: &Document, issues: &mut Vec<IntegrityIssue>) {
    let mut counts = BTreeMap::<ItemId, usize>::new();
    for name in std::iter::once(ITEMS).chain(TYPED_COLLECTIONS) {
        for id in doc.records(name).filter_map(record_id) {
            *counts.entry(id).or_default() += 1;
        }
    }
    issues.extend(
        counts
            .iter()
            .filter(|(_, occurrences)| **occurrences > 1)
            .map(|(id, occurrences)| IntegrityIssue::DuplicateId {
                id: *id,
                occurrences: *occurrences,
            }),
    );

    if let Some(max_id) = counts.keys().next_back().copied() {
        let last_item_id = doc.last_item_id();
        if last_item_id.map_or(true, |last| last < max_id) {
            issues.push(IntegrityIssue::StaleLastItemId {
                last_item_id,
                max_id,
            });
        }
    }
}

fn check_event_references(doc: &Document, issues: &mut Vec<IntegrityIssue>) {
    let people: BTreeSet<ItemId> = doc.records(PEOPLE).filter_map(record_id).collect();
    for event in doc.records(EVENTS) {
        for field in EVENT_PERSON_REFS {
            let Some(target) = event.get(field).filter(|value| !value.is_null()) else {
                continue;
            };
            if target.as_i64().is_some_and(|id| people.contains(&id)) {
                continue;
            }
            issues.push(IntegrityIssue::DanglingEventReference {
                event: record_id(event),
                field,
                target: target.to_string(),
            });
        }
    }
}

fn check_emotion_references(doc: &Document, issues: &mut Vec<IntegrityIssue>) {
    let events: BTreeSet<ItemId> = doc.records(EVENTS).filter_map(record_id).collect();
    for emotion in doc.records(EMOTIONS) {
        let Some(target) = emotion.get("event").filter(|value| !value.is_null()) else {
            continue;
        };
        if !target.as_i64().is_some_and(|id| events.contains(&id)) {
            issues.push(IntegrityIssue::DanglingEmotionEvent {
                emotion: record_id(emotion),
                target: target.to_string(),
            });
        }
    }
}

fn check_residue(doc: &Document, issues: &mut Vec<IntegrityIssue>) {
    for item in doc.records(ITEMS) {
        let kind = record_kind(item);
        if collection_for_kind(kind).is_some() {
            issues.push(IntegrityIssue::UntypedResidue {
                id: record_id(item),
                kind: kind.to_string(),
            });
        }
    }
}

fn describe(id: Option<ItemId>) -> String {
    id.map_or_else(|| "without id".to_string(), |id| id.to_string())
}

/// Convenience for callers that only need a yes/no answer.
pub fn is_consistent(doc: &Document) -> bool {
    check_integrity(doc).is_empty()
}
