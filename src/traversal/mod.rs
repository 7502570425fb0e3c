//! Lazy traversal of one node's relationships.
//!
//! A node keeps its relationships either as a single linked chain (sparse) or
//! as a list of per-type groups, each with outgoing, incoming, and loop
//! sub-chains (dense). [`RelationshipChains`] reads the node once and hands
//! out [`RelationshipIter`]s that hide which layout is in play: both yield
//! matching relationship ids in store order, one record read per visited
//! relationship.
//!
//! ```no_run
//! # use relchain::storage::FileStore;
//! # use relchain::traversal::{Direction, RelationshipChains};
//! # use relchain::types::{NodeId, TypeId};
//! # fn main() -> relchain::types::Result<()> {
//! let store = FileStore::open("graph")?;
//! let chains = RelationshipChains::open(&store, NodeId(7), TypeId(2), Direction::Outgoing)?;
//! for rel in chains.iter()? {
//!     println!("{}", rel?);
//! }
//! # Ok(())
//! # }
//! ```

mod direction;
mod filter;
mod iter;
mod metrics;
mod options;

use std::convert::TryFrom;
use std::sync::Arc;

use tracing::{debug, error};

use crate::storage::{NodeAnchor, NodeRecord, RecordStore, RelationshipRecord};
use crate::types::{NodeId, RecordKind, RelId, RelchainError, Result};

pub use direction::{Direction, GroupChain};
pub use filter::{AnyType, TypeFilter, TypeSet};
pub use iter::RelationshipIter;
pub use metrics::{default_metrics, CounterMetrics, NoopMetrics, TraversalMetrics};
pub use options::TraversalOptions;

use iter::{CycleGuard, Cursor, GroupSelector, Walk};

/// Picks the pointer that continues `node`'s chain past `record`.
///
/// A self-loop takes the first-endpoint pointer. A record that names neither
/// endpoint as `node` means the chain is corrupt.
pub fn follow_chain(node: NodeId, record: &RelationshipRecord) -> Result<RelId> {
    if record.first == node {
        return Ok(record.first_next);
    }
    if record.second == node {
        return Ok(record.second_next);
    }
    error!(
        node = %node,
        rel = %record.id,
        first = %record.first,
        second = %record.second,
        "chain.corrupt"
    );
    Err(RelchainError::CorruptChain {
        node,
        relationship: record.id,
        first: record.first,
        second: record.second,
    })
}

/// A node's relationships, filtered by type and direction.
///
/// Opening reads the node record and nothing else; each call to
/// [`RelationshipChains::iter`] starts a fresh, independent traversal.
pub struct RelationshipChains<'a, S: ?Sized, F> {
    store: &'a S,
    node: NodeRecord,
    filter: F,
    direction: Direction,
    metrics: Arc<dyn TraversalMetrics>,
    cycle_guard: bool,
}

impl<'a, S, F> RelationshipChains<'a, S, F>
where
    S: RecordStore + ?Sized,
    F: TypeFilter,
{
    /// Opens `node` with default options.
    pub fn open(store: &'a S, node: NodeId, filter: F, direction: Direction) -> Result<Self> {
        Self::open_with(store, node, filter, direction, TraversalOptions::default())
    }

    /// Opens `node`, taking the direction as a raw wire code.
    pub fn open_raw(store: &'a S, node: NodeId, filter: F, direction: u8) -> Result<Self> {
        let direction = Direction::try_from(direction)?;
        Self::open(store, node, filter, direction)
    }

    /// Opens `node` with explicit options.
    ///
    /// Fails with [`RelchainError::EntityNotFound`] when the node slot is not
    /// in use; no relationship or group record has been read at that point.
    pub fn open_with(
        store: &'a S,
        node: NodeId,
        filter: F,
        direction: Direction,
        opts: TraversalOptions,
    ) -> Result<Self> {
        let metrics = opts.metrics.unwrap_or_else(default_metrics);
        metrics.node_read();
        let record = store
            .load_node(node)?
            .ok_or(RelchainError::EntityNotFound {
                kind: RecordKind::Node,
                id: node.0,
            })?;
        Ok(Self {
            store,
            node: record,
            filter,
            direction,
            metrics,
            cycle_guard: opts.cycle_guard,
        })
    }

    /// The node record read at open time.
    pub fn node(&self) -> &NodeRecord {
        &self.node
    }

    /// Whether the node uses the grouped layout.
    pub fn is_dense(&self) -> bool {
        self.node.dense
    }

    /// Direction requested at open time.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Starts a traversal.
    ///
    /// For a dense node this reads group records up to the first eligible
    /// sub-chain, so it can fail.
    pub fn iter(&self) -> Result<RelationshipIter<'_, S, F>> {
        let mut walk = Walk {
            store: self.store,
            filter: &self.filter,
            direction: self.direction,
            node: self.node.id,
            metrics: Arc::clone(&self.metrics),
            guard: self.cycle_guard.then(CycleGuard::default),
        };
        let cursor = match self.node.anchor() {
            NodeAnchor::Sparse(head) => {
                debug!(
                    node = %self.node.id,
                    head = %head,
                    direction = %self.direction,
                    "chain.open.sparse"
                );
                Cursor::Sparse { next: head }
            }
            NodeAnchor::Dense(head) => {
                debug!(
                    node = %self.node.id,
                    head = %head,
                    direction = %self.direction,
                    "chain.open.dense"
                );
                let first = walk.load_group(head)?;
                let mut groups = GroupSelector::new(first);
                let next = groups.next_chain_start(&mut walk)?;
                Cursor::Dense { next, groups }
            }
        };
        Ok(RelationshipIter::new(walk, cursor))
    }

    /// Collects every matching relationship id.
    pub fn collect_ids(&self) -> Result<Vec<RelId>> {
        self.iter()?.collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::storage::{MemStore, RelationshipGroupRecord};
    use crate::types::{GroupId, TypeId};

    const A: TypeId = TypeId(1);
    const B: TypeId = TypeId(2);

    fn rel(
        id: u64,
        first: u64,
        second: u64,
        ty: TypeId,
        first_next: RelId,
        second_next: RelId,
    ) -> RelationshipRecord {
        RelationshipRecord {
            id: RelId(id),
            first: NodeId(first),
            second: NodeId(second),
            ty,
            first_next,
            second_next,
        }
    }

    /// Node 0 sparse: R1(A, 0->1) -> R2(B, 0->2).
    fn sparse_store() -> Result<MemStore> {
        let mut store = MemStore::new();
        store.put_node(NodeRecord::sparse(NodeId(0), RelId(1)))?;
        store.put_node(NodeRecord::sparse(NodeId(1), RelId(1)))?;
        store.put_node(NodeRecord::sparse(NodeId(2), RelId(2)))?;
        store.put_relationship(rel(1, 0, 1, A, RelId(2), RelId::NULL))?;
        store.put_relationship(rel(2, 0, 2, B, RelId::NULL, RelId::NULL))?;
        Ok(store)
    }

    /// Node 0 dense, one group of type A: out = [R1, R2], loop = [R3].
    fn dense_store() -> Result<MemStore> {
        let mut store = MemStore::new();
        store.put_node(NodeRecord::dense(NodeId(0), GroupId(0)))?;
        store.put_node(NodeRecord::sparse(NodeId(1), RelId(1)))?;
        let mut group = RelationshipGroupRecord::new(GroupId(0), NodeId(0), A);
        group.first_out = RelId(1);
        group.first_loop = RelId(3);
        store.put_group(group)?;
        store.put_relationship(rel(1, 0, 1, A, RelId(2), RelId(2)))?;
        store.put_relationship(rel(2, 0, 1, A, RelId::NULL, RelId::NULL))?;
        store.put_relationship(rel(3, 0, 0, A, RelId::NULL, RelId::NULL))?;
        Ok(store)
    }

    #[test]
    fn sparse_filters_by_type_and_direction() -> Result<()> {
        let store = sparse_store()?;
        let chains = RelationshipChains::open(&store, NodeId(0), A, Direction::Outgoing)?;
        assert!(!chains.is_dense());
        assert_eq!(chains.collect_ids()?, vec![RelId(1)]);

        let all = RelationshipChains::open(&store, NodeId(0), AnyType, Direction::Both)?;
        assert_eq!(all.collect_ids()?, vec![RelId(1), RelId(2)]);

        let incoming = RelationshipChains::open(&store, NodeId(0), AnyType, Direction::Incoming)?;
        assert!(incoming.collect_ids()?.is_empty());
        Ok(())
    }

    #[test]
    fn sparse_follows_second_endpoint_pointer() -> Result<()> {
        let store = sparse_store()?;
        let chains = RelationshipChains::open(&store, NodeId(1), AnyType, Direction::Incoming)?;
        assert_eq!(chains.collect_ids()?, vec![RelId(1)]);
        Ok(())
    }

    #[test]
    fn dense_incoming_still_yields_loops() -> Result<()> {
        let store = dense_store()?;
        let chains = RelationshipChains::open(&store, NodeId(0), A, Direction::Incoming)?;
        assert!(chains.is_dense());
        assert_eq!(chains.collect_ids()?, vec![RelId(3)]);
        Ok(())
    }

    #[test]
    fn dense_outgoing_visits_out_then_loop() -> Result<()> {
        let store = dense_store()?;
        let chains = RelationshipChains::open(&store, NodeId(0), A, Direction::Outgoing)?;
        assert_eq!(chains.collect_ids()?, vec![RelId(1), RelId(2), RelId(3)]);

        let rejected = RelationshipChains::open(&store, NodeId(0), B, Direction::Both)?;
        assert!(rejected.collect_ids()?.is_empty());
        Ok(())
    }

    #[test]
    fn record_tracks_last_produced_relationship() -> Result<()> {
        let store = sparse_store()?;
        let chains = RelationshipChains::open(&store, NodeId(0), AnyType, Direction::Both)?;
        let mut iter = chains.iter()?;
        assert!(iter.record().is_none());
        assert_eq!(iter.next().transpose()?, Some(RelId(1)));
        assert_eq!(iter.record().map(|r| r.ty), Some(A));
        assert_eq!(iter.next().transpose()?, Some(RelId(2)));
        assert_eq!(iter.record().map(|r| r.second), Some(NodeId(2)));
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
        Ok(())
    }

    #[test]
    fn missing_node_fails_before_any_chain_read() -> Result<()> {
        let store = sparse_store()?;
        let metrics = Arc::new(CounterMetrics::default());
        let opts = TraversalOptions::new().metrics(metrics.clone());
        let err = RelationshipChains::open_with(&store, NodeId(42), AnyType, Direction::Both, opts)
            .err()
            .expect("node 42 does not exist");
        assert!(matches!(
            err,
            RelchainError::EntityNotFound {
                kind: RecordKind::Node,
                id: 42
            }
        ));
        assert_eq!(metrics.relationships_read.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.groups_read.load(Ordering::Relaxed), 0);
        Ok(())
    }

    #[test]
    fn raw_direction_codes_are_validated() -> Result<()> {
        let store = sparse_store()?;
        let err = RelationshipChains::open_raw(&store, NodeId(0), AnyType, 9)
            .err()
            .expect("code 9 is not a direction");
        assert!(matches!(err, RelchainError::InvalidDirection(9)));
        assert!(RelationshipChains::open_raw(&store, NodeId(0), AnyType, 2).is_ok());
        Ok(())
    }

    #[test]
    fn corrupt_chain_stops_traversal() -> Result<()> {
        let mut store = sparse_store()?;
        // R2 claims to connect 5 and 6, yet sits in node 0's chain.
        store.put_relationship(rel(2, 5, 6, B, RelId::NULL, RelId::NULL))?;
        let metrics = Arc::new(CounterMetrics::default());
        let opts = TraversalOptions::new().metrics(metrics.clone());
        let chains =
            RelationshipChains::open_with(&store, NodeId(0), AnyType, Direction::Both, opts)?;
        let mut iter = chains.iter()?;

        assert_eq!(iter.next().transpose()?, Some(RelId(1)));
        match iter.next() {
            Some(Err(RelchainError::CorruptChain {
                node,
                relationship,
                first,
                second,
            })) => {
                assert_eq!(node, NodeId(0));
                assert_eq!(relationship, RelId(2));
                assert_eq!((first, second), (NodeId(5), NodeId(6)));
            }
            other => panic!("expected corrupt chain, got {other:?}"),
        }
        let reads = metrics.relationships_read.load(Ordering::Relaxed);
        assert!(iter.next().is_none());
        assert_eq!(metrics.relationships_read.load(Ordering::Relaxed), reads);
        assert_eq!(metrics.corrupt_chains.load(Ordering::Relaxed), 1);
        Ok(())
    }

    #[test]
    fn corruption_wins_over_a_match() -> Result<()> {
        let mut store = MemStore::new();
        store.put_node(NodeRecord::sparse(NodeId(0), RelId(0)))?;
        store.put_relationship(rel(0, 3, 4, A, RelId::NULL, RelId::NULL))?;
        let chains = RelationshipChains::open(&store, NodeId(0), AnyType, Direction::Both)?;
        let mut iter = chains.iter()?;
        assert!(matches!(
            iter.next(),
            Some(Err(RelchainError::CorruptChain { .. }))
        ));
        assert!(iter.next().is_none());
        Ok(())
    }

    #[test]
    fn dense_corrupt_sub_chain_stops_before_later_groups() -> Result<()> {
        // Group A out = [R0 -> R1], R1 names neither endpoint; group B follows.
        let mut store = MemStore::new();
        store.put_node(NodeRecord::dense(NodeId(0), GroupId(0)))?;
        let mut first = RelationshipGroupRecord::new(GroupId(0), NodeId(0), A);
        first.first_out = RelId(0);
        first.next = GroupId(1);
        store.put_group(first)?;
        let mut second = RelationshipGroupRecord::new(GroupId(1), NodeId(0), B);
        second.first_in = RelId(2);
        store.put_group(second)?;
        store.put_relationship(rel(0, 0, 1, A, RelId(1), RelId::NULL))?;
        store.put_relationship(rel(1, 5, 6, A, RelId::NULL, RelId::NULL))?;
        store.put_relationship(rel(2, 1, 0, B, RelId::NULL, RelId::NULL))?;

        let metrics = Arc::new(CounterMetrics::default());
        let opts = TraversalOptions::new().metrics(metrics.clone());
        let chains =
            RelationshipChains::open_with(&store, NodeId(0), AnyType, Direction::Both, opts)?;
        let mut iter = chains.iter()?;
        assert!(iter.is_dense());

        assert_eq!(iter.next().transpose()?, Some(RelId(0)));
        match iter.next() {
            Some(Err(RelchainError::CorruptChain {
                node,
                relationship,
                first,
                second,
            })) => {
                assert_eq!(node, NodeId(0));
                assert_eq!(relationship, RelId(1));
                assert_eq!((first, second), (NodeId(5), NodeId(6)));
            }
            other => panic!("expected corrupt chain, got {other:?}"),
        }
        let rel_reads = metrics.relationships_read.load(Ordering::Relaxed);
        let group_reads = metrics.groups_read.load(Ordering::Relaxed);
        assert_eq!((rel_reads, group_reads), (2, 1));

        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
        assert_eq!(metrics.relationships_read.load(Ordering::Relaxed), rel_reads);
        assert_eq!(metrics.groups_read.load(Ordering::Relaxed), group_reads);
        assert_eq!(metrics.corrupt_chains.load(Ordering::Relaxed), 1);
        Ok(())
    }

    #[test]
    fn dense_group_list_ends_at_unused_slot() -> Result<()> {
        let mut store = dense_store()?;
        let mut group = store.load_group(GroupId(0))?.expect("group 0");
        group.next = GroupId(9);
        store.put_group(group)?;
        let chains = RelationshipChains::open(&store, NodeId(0), AnyType, Direction::Both)?;
        assert_eq!(chains.collect_ids()?, vec![RelId(1), RelId(2), RelId(3)]);
        Ok(())
    }

    #[test]
    fn dense_skips_rejected_groups_without_reading_relationships() -> Result<()> {
        let mut store = dense_store()?;
        let mut group = store.load_group(GroupId(0))?.expect("group 0");
        group.next = GroupId(1);
        store.put_group(group)?;
        let mut second = RelationshipGroupRecord::new(GroupId(1), NodeId(0), B);
        second.first_in = RelId(4);
        store.put_group(second)?;
        store.put_relationship(rel(4, 1, 0, B, RelId::NULL, RelId::NULL))?;

        let metrics = Arc::new(CounterMetrics::default());
        let opts = TraversalOptions::new().metrics(metrics.clone());
        let chains = RelationshipChains::open_with(&store, NodeId(0), B, Direction::Both, opts)?;
        assert_eq!(chains.collect_ids()?, vec![RelId(4)]);
        assert_eq!(metrics.relationships_read.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.groups_read.load(Ordering::Relaxed), 2);
        Ok(())
    }

    #[test]
    fn cycle_guard_reports_looping_chain() -> Result<()> {
        let mut store = MemStore::new();
        store.put_node(NodeRecord::sparse(NodeId(0), RelId(0)))?;
        store.put_relationship(rel(0, 0, 1, A, RelId(1), RelId::NULL))?;
        store.put_relationship(rel(1, 0, 1, A, RelId(0), RelId::NULL))?;
        let opts = TraversalOptions::new().cycle_guard(true);
        let chains =
            RelationshipChains::open_with(&store, NodeId(0), AnyType, Direction::Both, opts)?;
        let results: Vec<Result<RelId>> = chains.iter()?.collect();
        assert_eq!(results.len(), 3);
        assert!(matches!(
            results[2],
            Err(RelchainError::ChainCycle {
                kind: RecordKind::Relationship,
                id: 0,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn cycle_guard_reports_looping_group_list() -> Result<()> {
        let mut store = dense_store()?;
        let mut group = store.load_group(GroupId(0))?.expect("group 0");
        group.next = GroupId(0);
        store.put_group(group)?;
        let opts = TraversalOptions::new().cycle_guard(true);
        let chains =
            RelationshipChains::open_with(&store, NodeId(0), AnyType, Direction::Both, opts)?;
        let results: Vec<Result<RelId>> = chains.iter()?.collect();
        assert!(matches!(
            results.last(),
            Some(Err(RelchainError::ChainCycle {
                kind: RecordKind::Group,
                id: 0,
                ..
            }))
        ));
        Ok(())
    }

    #[test]
    fn follow_chain_prefers_first_pointer_on_loops() -> Result<()> {
        let looped = rel(0, 4, 4, A, RelId(7), RelId(8));
        assert_eq!(follow_chain(NodeId(4), &looped)?, RelId(7));
        let plain = rel(1, 4, 5, A, RelId(7), RelId(8));
        assert_eq!(follow_chain(NodeId(5), &plain)?, RelId(8));
        assert!(follow_chain(NodeId(6), &plain).is_err());
        Ok(())
    }
}
