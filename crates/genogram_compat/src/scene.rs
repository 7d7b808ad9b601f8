//! Post-load patch for live scene objects.
//!
//! Runs after the scene has been built from a migrated document. It only
//! nudges detail text positions written before the details layout changed.

use crate::model::geometry::Point;
use crate::version::{should_run, AppVersion};
use log::debug;

/// Last version whose details texts were laid out with the old offset.
pub const DETAILS_OFFSET_THRESHOLD: &str = "1.0.0b6";
/// Horizontal shift applied to old details texts.
pub const DETAILS_OFFSET_X: f64 = 60.0;

/// A movable details text attached to a person or union.
pub trait DetailsItem {
    fn pos(&self) -> Point;
    fn set_pos(&mut self, pos: Point);
}

/// Shifts every details text when the document predates the new layout.
///
/// Returns the number of items moved.
pub fn update_scene<'a, I, D>(items: I, document_version: Option<&str>) -> usize
where
    I: IntoIterator<Item = &'a mut D>,
    D: DetailsItem + ?Sized + 'a,
{
    let threshold: AppVersion = match DETAILS_OFFSET_THRESHOLD.parse() {
        Ok(version) => version,
        Err(_) => return 0,
    };
    if !should_run(document_version, &threshold) {
        return 0;
    }

    let mut moved = 0;
    for item in items {
        item.set_pos(item.pos().offset(DETAILS_OFFSET_X, 0.0));
        moved += 1;
    }
    debug!(
        "event=scene_patch module=scene status=ok moved={} version={}",
        moved,
        document_version.unwrap_or("none")
    );
    moved
}
