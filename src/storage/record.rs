//! Fixed-size record layouts for nodes, relationships, and relationship groups.
//!
//! Every record starts with a flags byte and three reserved bytes and ends with
//! a CRC32 footer. Integers are big-endian. A slot whose in-use bit is clear
//! decodes to `None` without checksum validation, so zero-filled holes read as
//! unused slots.

use crate::types::checksum::record_crc32;
use crate::types::{GroupId, NodeId, RecordKind, RelId, RelchainError, Result, TypeId};

/// Encoded size of a node record.
pub const NODE_RECORD_SIZE: usize = 16;
/// Encoded size of a relationship record.
pub const REL_RECORD_SIZE: usize = 44;
/// Encoded size of a relationship-group record.
pub const GROUP_RECORD_SIZE: usize = 52;

const FLAG_IN_USE: u8 = 0x01;
const FLAG_DENSE: u8 = 0x02;
const BODY_OFFSET: usize = 4;

/// Where a node's relationships start.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum NodeAnchor {
    /// Head of the node's single relationship chain.
    Sparse(RelId),
    /// Head of the node's relationship-group list.
    Dense(GroupId),
}

/// A node record as far as relationship traversal is concerned.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NodeRecord {
    /// Node identifier (slot index).
    pub id: NodeId,
    /// Whether `next` points at a group list instead of a relationship chain.
    pub dense: bool,
    /// Raw anchor identifier, interpreted according to `dense`.
    pub next: u64,
}

impl NodeRecord {
    /// Node whose relationships form one chain starting at `head`.
    pub fn sparse(id: NodeId, head: RelId) -> Self {
        Self {
            id,
            dense: false,
            next: head.0,
        }
    }

    /// Node whose relationships are grouped, starting at group `head`.
    pub fn dense(id: NodeId, head: GroupId) -> Self {
        Self {
            id,
            dense: true,
            next: head.0,
        }
    }

    /// Typed view of the anchor.
    pub fn anchor(&self) -> NodeAnchor {
        if self.dense {
            NodeAnchor::Dense(GroupId(self.next))
        } else {
            NodeAnchor::Sparse(RelId(self.next))
        }
    }
}

/// A relationship record with one continuation pointer per endpoint.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RelationshipRecord {
    /// Relationship identifier (slot index).
    pub id: RelId,
    /// First endpoint in storage order; the start node.
    pub first: NodeId,
    /// Second endpoint in storage order; the end node.
    pub second: NodeId,
    /// Relationship type.
    pub ty: TypeId,
    /// Next relationship in `first`'s chain.
    pub first_next: RelId,
    /// Next relationship in `second`'s chain.
    pub second_next: RelId,
}

impl RelationshipRecord {
    /// Returns true when both endpoints are the same node.
    pub fn is_loop(&self) -> bool {
        self.first == self.second
    }
}

/// A per-type bundle of outgoing, incoming, and loop sub-chains for one dense node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RelationshipGroupRecord {
    /// Group identifier (slot index).
    pub id: GroupId,
    /// Type shared by every relationship reachable from this group.
    pub ty: TypeId,
    /// Head of the outgoing sub-chain.
    pub first_out: RelId,
    /// Head of the incoming sub-chain.
    pub first_in: RelId,
    /// Head of the self-relationship sub-chain.
    pub first_loop: RelId,
    /// Next group of the same node.
    pub next: GroupId,
    /// Node owning this group.
    pub owner: NodeId,
}

impl RelationshipGroupRecord {
    /// Empty group of type `ty` owned by `owner`.
    pub fn new(id: GroupId, owner: NodeId, ty: TypeId) -> Self {
        Self {
            id,
            ty,
            first_out: RelId::NULL,
            first_in: RelId::NULL,
            first_loop: RelId::NULL,
            next: GroupId::NULL,
            owner,
        }
    }
}

/// Encodes a node record into its fixed slot representation.
pub fn encode_node(record: &NodeRecord) -> [u8; NODE_RECORD_SIZE] {
    let mut buf = [0u8; NODE_RECORD_SIZE];
    buf[0] = FLAG_IN_USE | if record.dense { FLAG_DENSE } else { 0 };
    buf[4..12].copy_from_slice(&record.next.to_be_bytes());
    seal(&mut buf, RecordKind::Node, record.id.0);
    buf
}

/// Decodes the node slot `id`; `None` when the slot is not in use.
pub fn decode_node(id: NodeId, data: &[u8]) -> Result<Option<NodeRecord>> {
    let Some(body) = open(data, NODE_RECORD_SIZE, RecordKind::Node, id.0)? else {
        return Ok(None);
    };
    Ok(Some(NodeRecord {
        id,
        dense: body[0] & FLAG_DENSE != 0,
        next: u64_from_be(&body[4..12]),
    }))
}

/// Encodes a relationship record into its fixed slot representation.
pub fn encode_relationship(record: &RelationshipRecord) -> [u8; REL_RECORD_SIZE] {
    let mut buf = [0u8; REL_RECORD_SIZE];
    buf[0] = FLAG_IN_USE;
    buf[4..8].copy_from_slice(&record.ty.0.to_be_bytes());
    buf[8..16].copy_from_slice(&record.first.0.to_be_bytes());
    buf[16..24].copy_from_slice(&record.second.0.to_be_bytes());
    buf[24..32].copy_from_slice(&record.first_next.0.to_be_bytes());
    buf[32..40].copy_from_slice(&record.second_next.0.to_be_bytes());
    seal(&mut buf, RecordKind::Relationship, record.id.0);
    buf
}

/// Decodes the relationship slot `id`; `None` when the slot is not in use.
pub fn decode_relationship(id: RelId, data: &[u8]) -> Result<Option<RelationshipRecord>> {
    let Some(body) = open(data, REL_RECORD_SIZE, RecordKind::Relationship, id.0)? else {
        return Ok(None);
    };
    Ok(Some(RelationshipRecord {
        id,
        ty: TypeId(u32_from_be(&body[4..8])),
        first: NodeId(u64_from_be(&body[8..16])),
        second: NodeId(u64_from_be(&body[16..24])),
        first_next: RelId(u64_from_be(&body[24..32])),
        second_next: RelId(u64_from_be(&body[32..40])),
    }))
}

/// Encodes a group record into its fixed slot representation.
pub fn encode_group(record: &RelationshipGroupRecord) -> [u8; GROUP_RECORD_SIZE] {
    let mut buf = [0u8; GROUP_RECORD_SIZE];
    buf[0] = FLAG_IN_USE;
    buf[4..8].copy_from_slice(&record.ty.0.to_be_bytes());
    buf[8..16].copy_from_slice(&record.first_out.0.to_be_bytes());
    buf[16..24].copy_from_slice(&record.first_in.0.to_be_bytes());
    buf[24..32].copy_from_slice(&record.first_loop.0.to_be_bytes());
    buf[32..40].copy_from_slice(&record.next.0.to_be_bytes());
    buf[40..48].copy_from_slice(&record.owner.0.to_be_bytes());
    seal(&mut buf, RecordKind::Group, record.id.0);
    buf
}

/// Decodes the group slot `id`; `None` when the slot is not in use.
pub fn decode_group(id: GroupId, data: &[u8]) -> Result<Option<RelationshipGroupRecord>> {
    let Some(body) = open(data, GROUP_RECORD_SIZE, RecordKind::Group, id.0)? else {
        return Ok(None);
    };
    Ok(Some(RelationshipGroupRecord {
        id,
        ty: TypeId(u32_from_be(&body[4..8])),
        first_out: RelId(u64_from_be(&body[8..16])),
        first_in: RelId(u64_from_be(&body[16..24])),
        first_loop: RelId(u64_from_be(&body[24..32])),
        next: GroupId(u64_from_be(&body[32..40])),
        owner: NodeId(u64_from_be(&body[40..48])),
    }))
}

fn seal(buf: &mut [u8], kind: RecordKind, id: u64) {
    let crc_at = buf.len() - 4;
    let crc = record_crc32(kind.tag(), id, &buf[..crc_at]);
    buf[crc_at..].copy_from_slice(&crc.to_be_bytes());
}

fn open(data: &[u8], size: usize, kind: RecordKind, id: u64) -> Result<Option<&[u8]>> {
    if data.len() < size {
        return Err(RelchainError::Corruption("record truncated"));
    }
    let data = &data[..size];
    if data[0] & FLAG_IN_USE == 0 {
        return Ok(None);
    }
    if data[1..BODY_OFFSET].iter().any(|&b| b != 0) {
        return Err(RelchainError::Corruption("record reserved bytes not zero"));
    }
    let crc_at = size - 4;
    let stored = u32_from_be(&data[crc_at..]);
    if stored != record_crc32(kind.tag(), id, &data[..crc_at]) {
        tracing::error!(kind = %kind, id, "record checksum mismatch");
        return Err(RelchainError::Corruption("record checksum mismatch"));
    }
    Ok(Some(&data[..crc_at]))
}

fn u64_from_be(bytes: &[u8]) -> u64 {
    let mut arr = [0u8; 8];
    arr.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(arr)
}

fn u32_from_be(bytes: &[u8]) -> u32 {
    let mut arr = [0u8; 4];
    arr.copy_from_slice(&bytes[..4]);
    u32::from_be_bytes(arr)
}
