//! Lays out relationship chains and groups for a batch of relationships.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::types::{GroupId, NodeId, RecordKind, RelId, RelchainError, Result, TypeId, NO_NEXT};

use super::record::{NodeRecord, RelationshipGroupRecord, RelationshipRecord};
use super::store::MemStore;

/// Degree at which a node switches to the grouped layout unless configured otherwise.
pub const DEFAULT_DENSE_THRESHOLD: usize = 50;

/// Options controlling how [`StoreBuilder`] lays out records.
#[derive(Clone, Copy, Debug)]
pub struct BuildOptions {
    /// Nodes with at least this many relationships are stored dense.
    pub dense_threshold: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            dense_threshold: DEFAULT_DENSE_THRESHOLD,
        }
    }
}

impl BuildOptions {
    /// Sets the degree at which nodes become dense.
    pub fn dense_threshold(mut self, threshold: usize) -> Self {
        self.dense_threshold = threshold;
        self
    }
}

/// Collects nodes and relationships, then writes them out as linked records.
///
/// Sparse chains are built by prepending, so each node's chain lists its most
/// recently added relationship first. Dense nodes get one group per type in
/// the order types were first seen; within a group every sub-chain is also
/// most-recent-first. A self-loop counts once towards degree.
#[derive(Debug, Default)]
pub struct StoreBuilder {
    opts: BuildOptions,
    node_count: u64,
    rels: Vec<(NodeId, NodeId, TypeId)>,
}

impl StoreBuilder {
    /// Creates an empty builder.
    pub fn new(opts: BuildOptions) -> Self {
        Self {
            opts,
            node_count: 0,
            rels: Vec::new(),
        }
    }

    /// Allocates the next node id.
    pub fn add_node(&mut self) -> NodeId {
        let id = NodeId(self.node_count);
        self.node_count += 1;
        id
    }

    /// Allocates `count` consecutive node ids.
    pub fn add_nodes(&mut self, count: u64) -> Vec<NodeId> {
        (0..count).map(|_| self.add_node()).collect()
    }

    /// Number of nodes allocated so far.
    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    /// Records a relationship from `first` to `second`.
    pub fn add_relationship(&mut self, first: NodeId, second: NodeId, ty: TypeId) -> Result<RelId> {
        for node in [first, second] {
            if node.0 >= self.node_count {
                return Err(RelchainError::EntityNotFound {
                    kind: RecordKind::Node,
                    id: node.0,
                });
            }
        }
        if self.rels.len() as u64 >= NO_NEXT - 1 {
            return Err(RelchainError::Invalid("relationship id space exhausted"));
        }
        let id = RelId(self.rels.len() as u64);
        self.rels.push((first, second, ty));
        Ok(id)
    }

    /// Produces the final store.
    pub fn build(self) -> MemStore {
        let node_count = self.node_count as usize;
        let mut degree = vec![0usize; node_count];
        for &(first, second, _) in &self.rels {
            degree[first.0 as usize] += 1;
            if second != first {
                degree[second.0 as usize] += 1;
            }
        }
        let dense: Vec<bool> = degree
            .iter()
            .map(|&d| d >= self.opts.dense_threshold)
            .collect();

        let mut layout = Layout {
            heads: vec![NO_NEXT; node_count],
            tails: vec![None; node_count],
            groups: Vec::new(),
            group_index: FxHashMap::default(),
        };
        let mut records = Vec::with_capacity(self.rels.len());

        for (idx, &(first, second, ty)) in self.rels.iter().enumerate() {
            let id = RelId(idx as u64);
            let mut rec = RelationshipRecord {
                id,
                first,
                second,
                ty,
                first_next: RelId::NULL,
                second_next: RelId::NULL,
            };
            let is_loop = first == second;

            if dense[first.0 as usize] {
                let group = layout.group_for(first, ty);
                let head = if is_loop {
                    &mut group.first_loop
                } else {
                    &mut group.first_out
                };
                rec.first_next = *head;
                *head = id;
            } else {
                rec.first_next = RelId(layout.heads[first.0 as usize]);
                layout.heads[first.0 as usize] = id.0;
            }

            if is_loop {
                rec.second_next = rec.first_next;
            } else if dense[second.0 as usize] {
                let group = layout.group_for(second, ty);
                rec.second_next = group.first_in;
                group.first_in = id;
            } else {
                rec.second_next = RelId(layout.heads[second.0 as usize]);
                layout.heads[second.0 as usize] = id.0;
            }
            records.push(rec);
        }

        let nodes = dense
            .iter()
            .zip(&layout.heads)
            .enumerate()
            .map(|(idx, (&is_dense, &next))| NodeRecord {
                id: NodeId(idx as u64),
                dense: is_dense,
                next,
            })
            .collect();
        let group_count = layout.groups.len();
        let store = MemStore::from_records(nodes, records, layout.groups);
        debug!(
            nodes = node_count,
            relationships = store.relationship_high_id(),
            dense_nodes = dense.iter().filter(|&&d| d).count(),
            groups = group_count,
            "store.build"
        );
        store
    }
}

struct Layout {
    /// Chain head per sparse node, group-list head per dense node.
    heads: Vec<u64>,
    /// Last group of each dense node.
    tails: Vec<Option<GroupId>>,
    groups: Vec<RelationshipGroupRecord>,
    group_index: FxHashMap<(NodeId, TypeId), GroupId>,
}

impl Layout {
    fn group_for(&mut self, node: NodeId, ty: TypeId) -> &mut RelationshipGroupRecord {
        let id = match self.group_index.get(&(node, ty)) {
            Some(&id) => id,
            None => {
                let id = GroupId(self.groups.len() as u64);
                self.groups.push(RelationshipGroupRecord::new(id, node, ty));
                match self.tails[node.0 as usize] {
                    Some(tail) => self.groups[tail.0 as usize].next = id,
                    None => self.heads[node.0 as usize] = id.0,
                }
                self.tails[node.0 as usize] = Some(id);
                self.group_index.insert((node, ty), id);
                id
            }
        };
        &mut self.groups[id.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::record::NodeAnchor;
    use crate::storage::store::RecordStore;

    #[test]
    fn sparse_chain_is_most_recent_first() -> Result<()> {
        let mut builder = StoreBuilder::new(BuildOptions::default());
        let [a, b, c] = [builder.add_node(), builder.add_node(), builder.add_node()];
        let r0 = builder.add_relationship(a, b, TypeId(1))?;
        let r1 = builder.add_relationship(c, a, TypeId(2))?;
        let store = builder.build();

        let node = store.load_node(a)?.expect("node a");
        assert_eq!(node.anchor(), NodeAnchor::Sparse(r1));
        let rel1 = store.load_relationship(r1)?;
        assert_eq!(rel1.second, a);
        assert_eq!(rel1.second_next, r0);
        let rel0 = store.load_relationship(r0)?;
        assert!(rel0.first_next.is_null());
        Ok(())
    }

    #[test]
    fn dense_node_groups_in_first_seen_type_order() -> Result<()> {
        let mut builder = StoreBuilder::new(BuildOptions::default().dense_threshold(3));
        let hub = builder.add_node();
        let other = builder.add_node();
        builder.add_relationship(hub, other, TypeId(9))?;
        builder.add_relationship(other, hub, TypeId(4))?;
        let looped = builder.add_relationship(hub, hub, TypeId(9))?;
        let store = builder.build();

        let node = store.load_node(hub)?.expect("hub");
        let NodeAnchor::Dense(head) = node.anchor() else {
            panic!("hub should be dense");
        };
        let first = store.load_group(head)?.expect("first group");
        assert_eq!(first.ty, TypeId(9));
        assert_eq!(first.first_loop, looped);
        assert!(first.first_in.is_null());
        let second = store.load_group(first.next)?.expect("second group");
        assert_eq!(second.ty, TypeId(4));
        assert!(second.next.is_null());
        assert!(!second.first_in.is_null());

        let other_node = store.load_node(other)?.expect("other");
        assert!(!other_node.dense);
        Ok(())
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let mut builder = StoreBuilder::new(BuildOptions::default());
        let a = builder.add_node();
        let err = builder
            .add_relationship(a, NodeId(5), TypeId(0))
            .unwrap_err();
        assert!(matches!(
            err,
            RelchainError::EntityNotFound {
                kind: RecordKind::Node,
                id: 5
            }
        ));
    }

    #[test]
    fn self_loop_counts_once_toward_degree() -> Result<()> {
        let mut builder = StoreBuilder::new(BuildOptions::default().dense_threshold(2));
        let a = builder.add_node();
        let looped = builder.add_relationship(a, a, TypeId(0))?;
        let store = builder.build();
        let node = store.load_node(a)?.expect("a");
        assert_eq!(node.anchor(), NodeAnchor::Sparse(looped));
        let rel = store.load_relationship(looped)?;
        assert!(rel.first_next.is_null());
        assert!(rel.second_next.is_null());
        Ok(())
    }
}
