//! Person `pos` pairs become `nonLayerPos` points.

use crate::migrate::fields::point_field;
use crate::migrate::{MigrationContext, MigrationResult};
use crate::model::document::{record_kind, Document, ITEMS};

pub const NAME: &str = "rename_person_positions";

pub fn apply(doc: &mut Document, _ctx: &mut MigrationContext) -> MigrationResult<()> {
    for item in doc.records_mut(ITEMS) {
        if record_kind(item) != "Person" {
            continue;
        }
        let pos = point_field(item, NAME, "pos")?;
        item.remove("pos");
        if let Some(pos) = pos {
            if !item.contains_key("nonLayerPos") {
                item.insert("nonLayerPos".to_string(), pos.to_value());
            }
        }
    }
    Ok(())
}
