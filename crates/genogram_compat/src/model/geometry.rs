//! Diagram geometry values as stored in documents.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Size assigned to people saved without an explicit `size`.
pub const DEFAULT_PERSON_SIZE: i64 = 5;
/// Size whose rect is drawn at 0.8 scale; sizes scale around it.
pub const NORMAL_PERSON_SIZE: i64 = 4;
/// Width of the unscaled person rect.
pub const PERSON_RECT_WIDTH: f64 = 100.0;

/// Scene coordinate.
///
/// Written as `{"x": .., "y": ..}`; older documents may store `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Reads either stored encoding. Returns `None` for anything else.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(pair) if pair.len() == 2 => {
                Some(Self::new(pair[0].as_f64()?, pair[1].as_f64()?))
            }
            Value::Object(fields) => Some(Self::new(
                fields.get("x")?.as_f64()?,
                fields.get("y")?.as_f64()?,
            )),
            _ => None,
        }
    }

    pub fn to_value(self) -> Value {
        json!({ "x": self.x, "y": self.y })
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// True when either coordinate lies beyond `limit` from the origin.
    pub fn exceeds(self, limit: f64) -> bool {
        self.x.abs() > limit || self.y.abs() > limit
    }

    /// Snaps both coordinates to a 1e-4 grid.
    pub fn snapped(self) -> Self {
        let snap = |value: f64| (value * 10_000.0).round() / 10_000.0;
        Self::new(snap(self.x), snap(self.y))
    }
}

/// Render scale of a person rect for a given size.
pub fn scale_for_person_size(size: i64) -> f64 {
    if size > NORMAL_PERSON_SIZE {
        1.0 + 0.25 * (size - NORMAL_PERSON_SIZE) as f64
    } else if size == NORMAL_PERSON_SIZE {
        0.8
    } else {
        0.4_f64.powi((NORMAL_PERSON_SIZE - size) as i32)
    }
}

/// Width of the person rect for a given size.
pub fn person_width(size: i64) -> f64 {
    PERSON_RECT_WIDTH * scale_for_person_size(size)
}
