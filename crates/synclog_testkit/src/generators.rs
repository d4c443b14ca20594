//! Property-based test generators using proptest.

use proptest::prelude::*;
use synclog_core::{EntityId, Grouping, StreamKey};

/// Strategy for generating entity ids.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    prop::array::uniform16(any::<u8>()).prop_map(EntityId::from_bytes)
}

/// Strategy for generating non-empty identifier components, including the
/// characters the stream key encoding has to escape.
pub fn component_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9%:/_]{1,12}")
        .expect("Invalid regex")
        .prop_filter("Component must not be blank", |s| !s.trim().is_empty())
}

/// Strategy for generating valid stream keys of every kind.
pub fn stream_key_strategy() -> impl Strategy<Value = StreamKey> {
    prop_oneof![
        component_strategy().prop_map(|name| StreamKey::entity(name)),
        (component_strategy(), component_strategy())
            .prop_map(|(obj_type, field)| StreamKey::grouping(obj_type, field)),
        component_strategy().prop_map(|name| StreamKey::named(name)),
    ]
}

/// Strategy for generating entity payloads.
pub fn payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// Strategy for generating groupings.
pub fn grouping_strategy() -> impl Strategy<Value = Grouping> {
    (
        entity_id_strategy(),
        "[A-Za-z ]{1,16}",
        prop::option::of("#[0-9a-f]{6}"),
        any::<i32>(),
    )
        .prop_map(|(id, name, color, sort_order)| {
            let mut grouping = Grouping::new(name).with_sort_order(sort_order);
            grouping.id = id;
            grouping.color = color;
            grouping
        })
}

/// A write against a small pool of entity slots.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Save a payload into a slot.
    Save {
        /// Slot index.
        slot: usize,
        /// Payload to save.
        payload: Vec<u8>,
    },
    /// Delete the entity in a slot.
    Delete {
        /// Slot index.
        slot: usize,
    },
}

impl WriteOp {
    /// Returns the slot the op targets.
    pub fn slot(&self) -> usize {
        match self {
            WriteOp::Save { slot, .. } | WriteOp::Delete { slot } => *slot,
        }
    }
}

/// Strategy for generating one write against `slots` slots.
pub fn write_op_strategy(slots: usize) -> impl Strategy<Value = WriteOp> {
    prop_oneof![
        3 => (0..slots, payload_strategy()).prop_map(|(slot, payload)| WriteOp::Save { slot, payload }),
        1 => (0..slots).prop_map(|slot| WriteOp::Delete { slot }),
    ]
}

/// Strategy for generating a sequence of writes.
pub fn write_ops_strategy(slots: usize, max_ops: usize) -> impl Strategy<Value = Vec<WriteOp>> {
    prop::collection::vec(write_op_strategy(slots), 1..=max_ops)
}
