use std::convert::TryFrom;
use std::fmt;

use crate::storage::{RelationshipGroupRecord, RelationshipRecord};
use crate::types::{NodeId, RelId, RelchainError};

/// Which side of a relationship the traversed node must be on.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    /// The node is the relationship's first endpoint.
    Outgoing,
    /// The node is the relationship's second endpoint.
    Incoming,
    /// Either endpoint.
    Both,
}

impl Direction {
    /// Wire code for this direction.
    pub const fn code(self) -> u8 {
        match self {
            Direction::Outgoing => 0,
            Direction::Incoming => 1,
            Direction::Both => 2,
        }
    }

    /// Returns true if `relationship`, seen from `node`, lies in this direction.
    pub fn matches(self, node: NodeId, relationship: &RelationshipRecord) -> bool {
        match self {
            Direction::Both => true,
            Direction::Outgoing => relationship.first == node,
            Direction::Incoming => relationship.second == node,
        }
    }
}

impl TryFrom<u8> for Direction {
    type Error = RelchainError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Direction::Outgoing),
            1 => Ok(Direction::Incoming),
            2 => Ok(Direction::Both),
            other => Err(RelchainError::InvalidDirection(other)),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outgoing => write!(f, "OUTGOING"),
            Direction::Incoming => write!(f, "INCOMING"),
            Direction::Both => write!(f, "BOTH"),
        }
    }
}

/// The three sub-chains of a relationship group, in traversal order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GroupChain {
    /// Relationships where the owner is the first endpoint only.
    Out,
    /// Relationships where the owner is the second endpoint only.
    In,
    /// Self-relationships of the owner.
    Loop,
}

impl GroupChain {
    /// All sub-chains in the order a group is visited.
    pub const ALL: [GroupChain; 3] = [GroupChain::Out, GroupChain::In, GroupChain::Loop];

    /// Head of this sub-chain in `group`.
    pub fn chain_start(self, group: &RelationshipGroupRecord) -> RelId {
        match self {
            GroupChain::Out => group.first_out,
            GroupChain::In => group.first_in,
            GroupChain::Loop => group.first_loop,
        }
    }

    /// Whether this sub-chain can hold relationships in `direction`.
    ///
    /// A self-relationship is both outgoing and incoming for its node, so the
    /// loop sub-chain qualifies for every direction.
    pub fn matches_direction(self, direction: Direction) -> bool {
        match self {
            GroupChain::Out => matches!(direction, Direction::Outgoing | Direction::Both),
            GroupChain::In => matches!(direction, Direction::Incoming | Direction::Both),
            GroupChain::Loop => true,
        }
    }
}
