//! Field access helpers shared by the migration steps.
//!
//! Helpers that can fail return `MigrationError` values naming the step and
//! the entity, so a broken document is reported instead of half-migrated.

use super::context::MigrationContext;
use super::{MigrationError, MigrationResult};
use crate::model::document::{record_id, ItemId, Record};
use crate::model::geometry::Point;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Stored `dateTime` format.
pub(crate) const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads a reference field every record of this shape must carry.
pub(crate) fn require_item_ref(
    record: &Record,
    step: &'static str,
    field: &'static str,
) -> MigrationResult<ItemId> {
    match record.get(field) {
        None | Some(Value::Null) => Err(MigrationError::MissingField {
            step,
            entity_id: record_id(record),
            field,
        }),
        Some(value) => value.as_i64().ok_or_else(|| MigrationError::InvalidField {
            step,
            entity_id: record_id(record),
            field,
            reason: format!("expected an integer id, found {value}"),
        }),
    }
}

/// Reads a record's own `id`.
pub(crate) fn require_id(record: &Record, step: &'static str) -> MigrationResult<ItemId> {
    require_item_ref(record, step, "id")
}

/// Borrows a nested object every record of this shape must carry.
pub(crate) fn require_object_mut<'a>(
    record: &'a mut Record,
    step: &'static str,
    entity_id: Option<ItemId>,
    field: &'static str,
) -> MigrationResult<&'a mut Record> {
    match record.get_mut(field) {
        Some(Value::Object(fields)) => Ok(fields),
        None | Some(Value::Null) => Err(MigrationError::MissingField {
            step,
            entity_id,
            field,
        }),
        Some(other) => Err(MigrationError::InvalidField {
            step,
            entity_id,
            field,
            reason: format!("expected an object, found {other}"),
        }),
    }
}

/// Removes an optional nested object. Null reads as absent.
pub(crate) fn take_object(
    record: &mut Record,
    step: &'static str,
    field: &'static str,
) -> MigrationResult<Option<Record>> {
    match record.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(fields)) => Ok(Some(fields)),
        Some(other) => Err(MigrationError::InvalidField {
            step,
            entity_id: record_id(record),
            field,
            reason: format!("expected an object, found {other}"),
        }),
    }
}

/// Removes an optional array of records. Null reads as absent.
pub(crate) fn take_records(
    record: &mut Record,
    step: &'static str,
    field: &'static str,
) -> MigrationResult<Option<Vec<Record>>> {
    match record.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(values)) => {
            let mut records = Vec::with_capacity(values.len());
            for value in values {
                match value {
                    Value::Object(fields) => records.push(fields),
                    other => {
                        return Err(MigrationError::InvalidField {
                            step,
                            entity_id: record_id(record),
                            field,
                            reason: format!("expected records, found {other}"),
                        })
                    }
                }
            }
            Ok(Some(records))
        }
        Some(other) => Err(MigrationError::InvalidField {
            step,
            entity_id: record_id(record),
            field,
            reason: format!("expected an array, found {other}"),
        }),
    }
}

/// Borrows a nested array, creating an empty one when absent or null.
pub(crate) fn array_field_mut<'a>(
    record: &'a mut Record,
    step: &'static str,
    field: &'static str,
) -> MigrationResult<&'a mut Vec<Value>> {
    let entity_id = record_id(record);
    let slot = record
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(values) => Ok(values),
        other => Err(MigrationError::InvalidField {
            step,
            entity_id,
            field,
            reason: format!("expected an array, found {other}"),
        }),
    }
}

/// Reads a point-valued field, failing on values that are not points.
pub(crate) fn point_field(
    record: &Record,
    step: &'static str,
    field: &'static str,
) -> MigrationResult<Option<Point>> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Point::from_value(value)
            .map(Some)
            .ok_or_else(|| MigrationError::InvalidField {
                step,
                entity_id: record_id(record),
                field,
                reason: format!("expected a point, found {value}"),
            }),
    }
}

/// Replaces a legacy `date` with `dateTime` on one record.
///
/// A record that already carries `dateTime` and no `date` is left alone.
/// Unparseable dates are kept verbatim and reported.
pub(crate) fn migrate_date_field(
    record: &mut Record,
    step: &'static str,
    ctx: &mut MigrationContext,
) {
    let legacy = record.remove("date");
    let has_date_time = record.get("dateTime").is_some_and(|value| !value.is_null());
    if has_date_time || (legacy.is_none() && record.contains_key("dateTime")) {
        return;
    }
    let date_time = match date_time_from_legacy(legacy) {
        Ok(value) => value,
        Err(raw) => {
            ctx.warn(
                step,
                format!(
                    "item {} keeps unparseable date {raw}",
                    record_id(record).map_or_else(|| "without id".to_string(), |id| id.to_string())
                ),
            );
            raw
        }
    };
    record.insert("dateTime".to_string(), date_time);
}

/// Reads a list of strings; non-string entries are ignored.
pub(crate) fn string_list(record: &Record, field: &str) -> Vec<String> {
    record
        .get(field)
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Loose emptiness test for stored values: null, `false`, `0`, `""`, `[]`
/// and `{}` all read as unset.
pub(crate) fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Array(values)) => !values.is_empty(),
        Some(Value::Object(fields)) => !fields.is_empty(),
    }
}

/// Converts a legacy `date` (or an already-normalized `dateTime`) into the
/// stored `dateTime` form.
///
/// Null and empty values become null. `Err` carries a value that could not be
/// parsed; callers keep it as-is and report it.
pub(crate) fn date_time_from_legacy(value: Option<Value>) -> Result<Value, Value> {
    let text = match value {
        None | Some(Value::Null) => return Ok(Value::Null),
        Some(Value::String(text)) => text,
        Some(other) => return Err(other),
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Value::String(midnight.format(DATE_TIME_FORMAT).to_string()));
        }
    }
    for format in [DATE_TIME_FORMAT, "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(date_time) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Value::String(date_time.format(DATE_TIME_FORMAT).to_string()));
        }
    }
    Err(Value::String(text))
}
