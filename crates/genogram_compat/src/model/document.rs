//! Decoded diagram document.
//!
//! # Responsibility
//! - Wrap the decoded top-level object and expose the fields migration needs.
//! - Validate the top-level shape before any step touches it.
//!
//! # Invariants
//! - The wrapped value is always a JSON object.
//! - `items` and every typed collection, when present, are arrays.
//! - Fields the engine does not know about are preserved untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One decoded record (item, embedded event, ...).
pub type Record = Map<String, Value>;

/// Numeric identity of a document entity.
pub type ItemId = i64;

pub const VERSION: &str = "version";
pub const LAST_ITEM_ID: &str = "lastItemId";
/// Legacy catch-all bag of items tagged by `kind`.
pub const ITEMS: &str = "items";
pub const PEOPLE: &str = "people";
pub const MARRIAGES: &str = "marriages";
pub const EMOTIONS: &str = "emotions";
pub const EVENTS: &str = "events";
pub const LAYER_ITEMS: &str = "layerItems";
pub const LAYERS: &str = "layers";
pub const MULTIPLE_BIRTHS: &str = "multipleBirths";

/// Typed top-level collections, in the order they are created.
pub const TYPED_COLLECTIONS: [&str; 7] = [
    PEOPLE,
    MARRIAGES,
    EMOTIONS,
    EVENTS,
    LAYER_ITEMS,
    LAYERS,
    MULTIPLE_BIRTHS,
];

/// Top-level shape violations detected before migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentShapeError {
    /// The decoded root is not an object.
    NotAnObject(&'static str),
    /// A collection field holds something other than an array.
    CollectionNotAnArray(&'static str),
}

impl Display for DocumentShapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject(found) => {
                write!(f, "document root must be an object, found {found}")
            }
            Self::CollectionNotAnArray(name) => {
                write!(f, "document field `{name}` must be an array")
            }
        }
    }
}

impl Error for DocumentShapeError {}

/// Decoded persisted diagram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: Record,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a decoded value after checking the top-level shape.
    pub fn from_value(value: Value) -> Result<Self, DocumentShapeError> {
        let fields = match value {
            Value::Object(fields) => fields,
            other => return Err(DocumentShapeError::NotAnObject(json_type_name(&other))),
        };
        for name in std::iter::once(ITEMS).chain(TYPED_COLLECTIONS) {
            if let Some(value) = fields.get(name) {
                if !value.is_array() {
                    return Err(DocumentShapeError::CollectionNotAnArray(name));
                }
            }
        }
        Ok(Self { fields })
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Record {
        &mut self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Stored version stamp. Non-string stamps read as absent.
    pub fn version(&self) -> Option<&str> {
        self.fields.get(VERSION).and_then(Value::as_str)
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.fields
            .insert(VERSION.to_string(), Value::String(version.into()));
    }

    pub fn last_item_id(&self) -> Option<ItemId> {
        self.fields.get(LAST_ITEM_ID).and_then(Value::as_i64)
    }

    pub fn set_last_item_id(&mut self, id: ItemId) {
        self.fields.insert(LAST_ITEM_ID.to_string(), Value::from(id));
    }

    /// Records of a collection; empty when the collection is absent.
    pub fn records(&self, name: &str) -> impl Iterator<Item = &Record> {
        self.fields
            .get(name)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
    }

    /// Mutable records of a collection; empty when the collection is absent.
    pub fn records_mut(&mut self, name: &str) -> impl Iterator<Item = &mut Record> {
        self.fields
            .get_mut(name)
            .and_then(Value::as_array_mut)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object_mut)
    }

    /// Returns the named collection, creating an empty one when absent.
    ///
    /// A non-array value in that slot is replaced; `from_value` rejects such
    /// documents up front.
    pub fn collection_mut(&mut self, name: &str) -> &mut Vec<Value> {
        let slot = self
            .fields
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        match slot {
            Value::Array(values) => values,
            _ => unreachable!("slot was just made an array"),
        }
    }

    /// Removes and returns a whole collection.
    pub fn take_collection(&mut self, name: &str) -> Option<Vec<Value>> {
        match self.fields.remove(name) {
            Some(Value::Array(values)) => Some(values),
            Some(other) => {
                self.fields.insert(name.to_string(), other);
                None
            }
            None => None,
        }
    }

    /// Largest `id` found anywhere under `items` or the typed collections,
    /// embedded sub-records included.
    pub fn max_item_id(&self) -> Option<ItemId> {
        std::iter::once(ITEMS)
            .chain(TYPED_COLLECTIONS)
            .filter_map(|name| self.fields.get(name))
            .filter_map(max_nested_id)
            .max()
    }
}

/// Reads a record's integer `id`.
pub fn record_id(record: &Record) -> Option<ItemId> {
    record.get("id").and_then(Value::as_i64)
}

/// Reads a record's `kind`, or `""` when absent or not a string.
pub fn record_kind(record: &Record) -> &str {
    record.get("kind").and_then(Value::as_str).unwrap_or("")
}

fn max_nested_id(value: &Value) -> Option<ItemId> {
    match value {
        Value::Array(values) => values.iter().filter_map(max_nested_id).max(),
        Value::Object(fields) => {
            let own = fields.get("id").and_then(Value::as_i64);
            fields.values().filter_map(max_nested_id).chain(own).max()
        }
        _ => None,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
