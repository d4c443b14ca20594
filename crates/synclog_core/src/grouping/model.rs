use crate::entity::EntityId;
use crate::error::{CoreError, CoreResult};
use crate::types::CommitId;
use serde::{Deserialize, Serialize};

/// A single grouping of a grouping field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    /// Grouping id.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Optional display color.
    pub color: Option<String>,
    /// Parent grouping for hierarchical fields.
    pub parent_id: Option<EntityId>,
    /// Position among its siblings.
    pub sort_order: i32,
    /// Commit id of the last change. Assigned by the store.
    #[serde(default)]
    pub commit_id: CommitId,
}

impl Grouping {
    /// Creates a top-level grouping with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            color: None,
            parent_id: None,
            sort_order: 0,
            commit_id: CommitId::ZERO,
        }
    }

    /// Sets the color.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Sets the parent grouping.
    #[must_use]
    pub fn with_parent(mut self, parent: EntityId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// Returns true if both groupings carry the same value, ignoring the
    /// commit id.
    pub fn same_value(&self, other: &Grouping) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.color == other.color
            && self.parent_id == other.parent_id
            && self.sort_order == other.sort_order
    }

    /// Encodes the grouping as a CBOR payload.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CoreError::grouping_codec(e.to_string()))?;
        Ok(buf)
    }

    /// Decodes a grouping from a CBOR payload.
    pub fn decode(bytes: &[u8]) -> CoreResult<Self> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::grouping_codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_roundtrip() {
        let parent = EntityId::new();
        let grouping = Grouping::new("VIP")
            .with_color("#ff0000")
            .with_parent(parent)
            .with_sort_order(3);

        let decoded = Grouping::decode(&grouping.encode().unwrap()).unwrap();
        assert_eq!(decoded, grouping);
    }

    #[test]
    fn same_value_ignores_commit() {
        let mut a = Grouping::new("VIP");
        let mut b = a.clone();
        a.commit_id = CommitId::new(1);
        b.commit_id = CommitId::new(7);
        assert!(a.same_value(&b));

        b.name = "Gold".into();
        assert!(!a.same_value(&b));
    }

    #[test]
    fn garbage_payload_is_codec_error() {
        let result = Grouping::decode(&[0xff, 0x00, 0x13]);
        assert!(matches!(result, Err(CoreError::GroupingCodec { .. })));
    }
}
