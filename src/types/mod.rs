#![forbid(unsafe_code)]
//! Identifier newtypes, the shared sentinel, and the crate error type.

use std::fmt;

/// Checksum helpers used by the fixed-record codecs.
pub mod checksum;

/// Reserved identifier value meaning "no further record".
///
/// Shared by relationship chains, empty group sub-chains, and group lists.
pub const NO_NEXT: u64 = u64::MAX;

/// Identifier of a node record.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NodeId(pub u64);

/// Identifier of a relationship record.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct RelId(pub u64);

/// Identifier of a relationship-group record.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct GroupId(pub u64);

/// Relationship type identifier.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct TypeId(pub u32);

impl RelId {
    /// End-of-chain marker.
    pub const NULL: RelId = RelId(NO_NEXT);

    /// Returns true when this is the end-of-chain marker.
    pub const fn is_null(self) -> bool {
        self.0 == NO_NEXT
    }
}

impl GroupId {
    /// End-of-group-list marker.
    pub const NULL: GroupId = GroupId(NO_NEXT);

    /// Returns true when this is the end-of-group-list marker.
    pub const fn is_null(self) -> bool {
        self.0 == NO_NEXT
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "null");
        }
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "null");
        }
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TypeId {
    fn from(value: u32) -> Self {
        TypeId(value)
    }
}

impl From<TypeId> for u32 {
    fn from(value: TypeId) -> Self {
        value.0
    }
}

/// Kind of record addressed by an identifier.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RecordKind {
    /// Node record.
    Node,
    /// Relationship record.
    Relationship,
    /// Relationship-group record.
    Group,
}

impl RecordKind {
    /// Stable tag mixed into record checksums and file headers.
    pub const fn tag(self) -> u8 {
        match self {
            RecordKind::Node => 1,
            RecordKind::Relationship => 2,
            RecordKind::Group => 3,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Node => write!(f, "Node"),
            RecordKind::Relationship => write!(f, "Relationship"),
            RecordKind::Group => write!(f, "RelationshipGroup"),
        }
    }
}

/// Errors surfaced by the store and by relationship traversal.
#[derive(thiserror::Error, Debug)]
pub enum RelchainError {
    /// Underlying file I/O failed.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// Persistent bytes failed validation.
    #[error("corruption: {0}")]
    Corruption(&'static str),
    /// Caller supplied an unusable argument.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// The requested entity has no in-use record.
    #[error("{kind}[{id}] not found")]
    EntityNotFound {
        /// Kind of entity requested.
        kind: RecordKind,
        /// Requested identifier.
        id: u64,
    },
    /// A record that must exist was not in use.
    #[error("{kind}[{id}] is not in use")]
    RecordNotInUse {
        /// Kind of record requested.
        kind: RecordKind,
        /// Requested identifier.
        id: u64,
    },
    /// A relationship reached through a node's chain does not reference that node.
    #[error(
        "while loading relationships for Node[{node}] a Relationship[{relationship}] was \
         encountered that had startNode: {first} and endNode: {second}, i.e. which had \
         neither start nor end node as the node we're loading relationships for"
    )]
    CorruptChain {
        /// Node whose chain was being traversed.
        node: NodeId,
        /// Offending relationship.
        relationship: RelId,
        /// First endpoint recorded on the relationship.
        first: NodeId,
        /// Second endpoint recorded on the relationship.
        second: NodeId,
    },
    /// A raw direction code outside the known set.
    #[error("unknown direction {0}")]
    InvalidDirection(u8),
    /// The cycle guard saw a record twice while traversing one node.
    #[error("cycle detected at {kind}[{id}] while loading relationships for Node[{node}]")]
    ChainCycle {
        /// Node being traversed.
        node: NodeId,
        /// Kind of the revisited record.
        kind: RecordKind,
        /// Revisited identifier.
        id: u64,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RelchainError>;
