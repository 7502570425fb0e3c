use crate::types::{GroupId, NodeId, RecordKind, RelId, RelchainError, Result};

use super::record::{NodeRecord, RelationshipGroupRecord, RelationshipRecord};

/// Point lookups of records by identifier.
///
/// Implementations present a stable, read-only view for the lifetime of a
/// traversal. Relationship traversal only ever talks to the store through
/// this trait.
pub trait RecordStore {
    /// Loads a node record, or `None` when the slot is not in use.
    fn load_node(&self, id: NodeId) -> Result<Option<NodeRecord>>;

    /// Loads a relationship record that is expected to be in use.
    fn load_relationship(&self, id: RelId) -> Result<RelationshipRecord>;

    /// Loads a relationship-group record, or `None` when the slot is not in use.
    fn load_group(&self, id: GroupId) -> Result<Option<RelationshipGroupRecord>>;

    /// Number of node slots, in use or not.
    fn node_high_id(&self) -> u64;
}

/// In-memory fixed-record store.
#[derive(Clone, Debug, Default)]
pub struct MemStore {
    nodes: Vec<Option<NodeRecord>>,
    relationships: Vec<Option<RelationshipRecord>>,
    groups: Vec<Option<RelationshipGroupRecord>>,
}

impl MemStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from records whose ids match their position.
    pub(crate) fn from_records(
        nodes: Vec<NodeRecord>,
        relationships: Vec<RelationshipRecord>,
        groups: Vec<RelationshipGroupRecord>,
    ) -> Self {
        Self {
            nodes: nodes.into_iter().map(Some).collect(),
            relationships: relationships.into_iter().map(Some).collect(),
            groups: groups.into_iter().map(Some).collect(),
        }
    }

    /// Writes a node record into its slot, growing the store as needed.
    ///
    /// Slots below the id that were never written read as not in use. An id
    /// whose slot cannot be allocated is rejected with `Invalid`.
    pub fn put_node(&mut self, record: NodeRecord) -> Result<()> {
        put_slot(&mut self.nodes, record.id.0, record)
    }

    /// Writes a relationship record into its slot.
    pub fn put_relationship(&mut self, record: RelationshipRecord) -> Result<()> {
        put_slot(&mut self.relationships, record.id.0, record)
    }

    /// Writes a group record into its slot.
    pub fn put_group(&mut self, record: RelationshipGroupRecord) -> Result<()> {
        put_slot(&mut self.groups, record.id.0, record)
    }

    /// Number of relationship slots.
    pub fn relationship_high_id(&self) -> u64 {
        self.relationships.len() as u64
    }

    /// Number of group slots.
    pub fn group_high_id(&self) -> u64 {
        self.groups.len() as u64
    }

    /// Slots of the node file in id order.
    pub fn node_slots(&self) -> &[Option<NodeRecord>] {
        &self.nodes
    }

    /// Slots of the relationship file in id order.
    pub fn relationship_slots(&self) -> &[Option<RelationshipRecord>] {
        &self.relationships
    }

    /// Slots of the group file in id order.
    pub fn group_slots(&self) -> &[Option<RelationshipGroupRecord>] {
        &self.groups
    }
}

fn put_slot<T>(slots: &mut Vec<Option<T>>, id: u64, record: T) -> Result<()> {
    let len = usize::try_from(id)
        .ok()
        .and_then(|idx| idx.checked_add(1))
        .ok_or(RelchainError::Invalid("record id outside the addressable slot range"))?;
    if slots.len() < len {
        slots
            .try_reserve(len - slots.len())
            .map_err(|_| RelchainError::Invalid("record id too large to allocate a slot"))?;
        slots.resize_with(len, || None);
    }
    slots[len - 1] = Some(record);
    Ok(())
}

fn get_slot<T: Copy>(slots: &[Option<T>], id: u64) -> Option<T> {
    usize::try_from(id)
        .ok()
        .and_then(|idx| slots.get(idx))
        .copied()
        .flatten()
}

impl RecordStore for MemStore {
    fn load_node(&self, id: NodeId) -> Result<Option<NodeRecord>> {
        Ok(get_slot(&self.nodes, id.0))
    }

    fn load_relationship(&self, id: RelId) -> Result<RelationshipRecord> {
        get_slot(&self.relationships, id.0).ok_or(RelchainError::RecordNotInUse {
            kind: RecordKind::Relationship,
            id: id.0,
        })
    }

    fn load_group(&self, id: GroupId) -> Result<Option<RelationshipGroupRecord>> {
        Ok(get_slot(&self.groups, id.0))
    }

    fn node_high_id(&self) -> u64 {
        self.nodes.len() as u64
    }
}
