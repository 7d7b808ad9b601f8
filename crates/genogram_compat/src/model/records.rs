//! Typed views of the small records migration synthesizes or rewires.

use crate::model::document::ItemId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A Person's link to the union it was born into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildOf {
    pub person: ItemId,
    pub parents: ItemId,
    pub multiple_birth: Option<ItemId>,
}

impl ChildOf {
    pub fn new(person: ItemId, parents: ItemId) -> Self {
        Self {
            person,
            parents,
            multiple_birth: None,
        }
    }

    /// Reads a stored `childOf`. An empty `{}` or a null `parents` means the
    /// person has no recorded parents.
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        let parents = fields.get("parents")?.as_i64()?;
        Some(Self {
            person: fields.get("person").and_then(Value::as_i64).unwrap_or_default(),
            parents,
            multiple_birth: fields.get("multipleBirth").and_then(Value::as_i64),
        })
    }

    pub fn to_value(&self) -> Value {
        json!({
            "person": self.person,
            "parents": self.parents,
            "multipleBirth": self.multiple_birth,
        })
    }

    /// The `{}` placeholder written for people without parents.
    pub fn empty_value() -> Value {
        Value::Object(Default::default())
    }
}

/// Siblings born together to one union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleBirth {
    pub id: ItemId,
    pub children: Vec<ItemId>,
    pub parents: ItemId,
}

impl MultipleBirth {
    /// Returns whether any of `children` already belongs to this birth.
    pub fn shares_child(&self, children: &[ItemId]) -> bool {
        self.children.iter().any(|child| children.contains(child))
    }

    pub fn to_value(&self) -> Value {
        json!({
            "kind": "MultipleBirth",
            "id": self.id,
            "children": self.children,
            "parents": self.parents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ChildOf, MultipleBirth};
    use serde_json::json;

    #[test]
    fn child_of_reads_only_complete_links() {
        assert_eq!(ChildOf::from_value(&json!({})), None);
        assert_eq!(
            ChildOf::from_value(&json!({"person": 1, "parents": null})),
            None
        );
        assert_eq!(
            ChildOf::from_value(&json!({"person": 1, "parents": 5, "multipleBirth": 9})),
            Some(ChildOf {
                person: 1,
                parents: 5,
                multiple_birth: Some(9),
            })
        );
        assert_eq!(
            ChildOf::new(2, 7).to_value(),
            json!({"person": 2, "parents": 7, "multipleBirth": null})
        );
    }

    #[test]
    fn multiple_birth_matches_any_shared_child() {
        let birth = MultipleBirth {
            id: 10,
            children: vec![1, 2],
            parents: 4,
        };
        assert!(birth.shares_child(&[2, 3]));
        assert!(!birth.shares_child(&[3]));
        assert_eq!(birth.to_value()["kind"], "MultipleBirth");
    }
}
