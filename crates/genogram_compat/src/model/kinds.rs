//! Closed enumerations shared with the scene model.
//!
//! # Responsibility
//! - Define the event and relationship kinds a migrated document may carry.
//! - Translate historical `uniqueId` and emotion slug spellings into them.
//!
//! # Invariants
//! - Serialized values are the lowercase wire strings below and never change.
//! - `uniqueId` translation tables are closed: unknown ids become `shift`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Timeline event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Birth,
    Adopted,
    Death,
    Bonded,
    Married,
    Separated,
    Divorced,
    Moved,
    /// Catch-all for custom and emotion-derived events.
    Shift,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        Self::Birth,
        Self::Adopted,
        Self::Death,
        Self::Bonded,
        Self::Married,
        Self::Separated,
        Self::Divorced,
        Self::Moved,
        Self::Shift,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Birth => "birth",
            Self::Adopted => "adopted",
            Self::Death => "death",
            Self::Bonded => "bonded",
            Self::Married => "married",
            Self::Separated => "separated",
            Self::Divorced => "divorced",
            Self::Moved => "moved",
            Self::Shift => "shift",
        }
    }

    /// Parses an exact wire value.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Events that link a child to a parental union.
    pub fn is_parental(self) -> bool {
        matches!(self, Self::Birth | Self::Adopted)
    }

    /// Translation table for events embedded in a Person.
    pub fn from_person_unique_id(unique_id: Option<&str>) -> Self {
        match unique_id {
            Some("birth") => Self::Birth,
            Some("adopted") => Self::Adopted,
            Some("death") => Self::Death,
            _ => Self::Shift,
        }
    }

    /// Translation table for events embedded in a Marriage.
    pub fn from_marriage_unique_id(unique_id: Option<&str>) -> Self {
        match unique_id {
            Some("married") => Self::Married,
            Some("bonded") => Self::Bonded,
            Some("separated") => Self::Separated,
            Some("divorced") => Self::Divorced,
            Some("moved") => Self::Moved,
            _ => Self::Shift,
        }
    }

    /// Translation table for free-standing events: union of both tables.
    pub fn from_any_unique_id(unique_id: Option<&str>) -> Self {
        match Self::from_person_unique_id(unique_id) {
            Self::Shift => Self::from_marriage_unique_id(unique_id),
            kind => kind,
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emotion (relationship) kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Fusion,
    Conflict,
    Distance,
    Overfunctioning,
    Underfunctioning,
    Projection,
    #[serde(rename = "defined-self")]
    DefinedSelf,
    Toward,
    Away,
    Inside,
    Outside,
    Cutoff,
}

/// Item `kind` spellings used for emotions before typed collections existed.
pub const LEGACY_EMOTION_SLUGS: [&str; 11] = [
    "Conflict",
    "Distance",
    "Reciprocity",
    "Projection",
    "Fusion",
    "Cutoff",
    "DefinedSelf",
    "Away",
    "Toward",
    "Inside",
    "Outside",
];

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 12] = [
        Self::Fusion,
        Self::Conflict,
        Self::Distance,
        Self::Overfunctioning,
        Self::Underfunctioning,
        Self::Projection,
        Self::DefinedSelf,
        Self::Toward,
        Self::Away,
        Self::Inside,
        Self::Outside,
        Self::Cutoff,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fusion => "fusion",
            Self::Conflict => "conflict",
            Self::Distance => "distance",
            Self::Overfunctioning => "overfunctioning",
            Self::Underfunctioning => "underfunctioning",
            Self::Projection => "projection",
            Self::DefinedSelf => "defined-self",
            Self::Toward => "toward",
            Self::Away => "away",
            Self::Inside => "inside",
            Self::Outside => "outside",
            Self::Cutoff => "cutoff",
        }
    }

    /// Parses an exact wire value.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// Parses any historical spelling, case-insensitively.
    ///
    /// `Reciprocity` predates the over/under-functioning split and maps to
    /// `underfunctioning`.
    pub fn from_legacy(value: &str) -> Option<Self> {
        let lowered = value.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "reciprocity" => Some(Self::Underfunctioning),
            "definedself" | "defined_self" => Some(Self::DefinedSelf),
            other => Self::parse(other),
        }
    }
}

impl Display for RelationshipKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns whether `kind` is one of the exact legacy emotion item kinds.
pub fn is_emotion_slug(kind: &str) -> bool {
    LEGACY_EMOTION_SLUGS.contains(&kind)
}

/// Returns whether `kind` names an emotion in any historical spelling.
pub fn is_emotion_kind(kind: &str) -> bool {
    LEGACY_EMOTION_SLUGS
        .iter()
        .any(|slug| slug.eq_ignore_ascii_case(kind))
        || RelationshipKind::parse(kind).is_some()
}

#[cfg(test)]
mod tests {
    use super::{is_emotion_kind, is_emotion_slug, EventKind, RelationshipKind};

    #[test]
    fn person_and_marriage_tables_are_closed() {
        assert_eq!(EventKind::from_person_unique_id(Some("birth")), EventKind::Birth);
        assert_eq!(
            EventKind::from_person_unique_id(Some("married")),
            EventKind::Shift
        );
        assert_eq!(
            EventKind::from_marriage_unique_id(Some("moved")),
            EventKind::Moved
        );
        assert_eq!(
            EventKind::from_marriage_unique_id(Some("birth")),
            EventKind::Shift
        );
        assert_eq!(EventKind::from_marriage_unique_id(None), EventKind::Shift);
        assert_eq!(EventKind::from_any_unique_id(Some("death")), EventKind::Death);
        assert_eq!(
            EventKind::from_any_unique_id(Some("divorced")),
            EventKind::Divorced
        );
        assert_eq!(
            EventKind::from_any_unique_id(Some("emotionStartEvent")),
            EventKind::Shift
        );
    }

    #[test]
    fn event_kind_serializes_to_wire_values() {
        let json = serde_json::to_value(EventKind::Adopted).unwrap();
        assert_eq!(json, "adopted");
        assert_eq!(EventKind::parse("shift"), Some(EventKind::Shift));
        assert_eq!(EventKind::parse("Event"), None);
    }

    #[test]
    fn legacy_relationship_spellings_normalize() {
        assert_eq!(
            RelationshipKind::from_legacy("Reciprocity"),
            Some(RelationshipKind::Underfunctioning)
        );
        assert_eq!(
            RelationshipKind::from_legacy("DefinedSelf"),
            Some(RelationshipKind::DefinedSelf)
        );
        assert_eq!(
            RelationshipKind::from_legacy("CONFLICT"),
            Some(RelationshipKind::Conflict)
        );
        assert_eq!(RelationshipKind::from_legacy("Hostility"), None);
        let json = serde_json::to_value(RelationshipKind::DefinedSelf).unwrap();
        assert_eq!(json, "defined-self");
    }

    #[test]
    fn emotion_kind_detection() {
        assert!(is_emotion_slug("Toward"));
        assert!(!is_emotion_slug("toward"));
        assert!(is_emotion_kind("toward"));
        assert!(is_emotion_kind("underfunctioning"));
        assert!(!is_emotion_kind("Person"));
        assert!(!is_emotion_kind("Callout"));
    }
}
