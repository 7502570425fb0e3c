use std::iter::FusedIterator;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::{error, trace};

use crate::storage::{RecordStore, RelationshipGroupRecord, RelationshipRecord};
use crate::types::{GroupId, NodeId, RecordKind, RelId, RelchainError, Result};

use super::direction::{Direction, GroupChain};
use super::filter::TypeFilter;
use super::follow_chain;
use super::metrics::TraversalMetrics;

/// Remembers visited records so a looping chain fails instead of spinning.
#[derive(Default)]
pub(super) struct CycleGuard {
    relationships: FxHashSet<RelId>,
    groups: FxHashSet<GroupId>,
}

impl CycleGuard {
    fn visit(&mut self, node: NodeId, kind: RecordKind, id: u64) -> Result<()> {
        let fresh = match kind {
            RecordKind::Group => self.groups.insert(GroupId(id)),
            _ => self.relationships.insert(RelId(id)),
        };
        if fresh {
            return Ok(());
        }
        error!(node = %node, kind = %kind, id, "chain.cycle");
        Err(RelchainError::ChainCycle { node, kind, id })
    }
}

/// Everything a fetch needs besides the mode-specific cursor.
pub(super) struct Walk<'a, S: ?Sized, F: ?Sized> {
    pub(super) store: &'a S,
    pub(super) filter: &'a F,
    pub(super) direction: Direction,
    pub(super) node: NodeId,
    pub(super) metrics: Arc<dyn TraversalMetrics>,
    pub(super) guard: Option<CycleGuard>,
}

impl<'a, S, F> Walk<'a, S, F>
where
    S: RecordStore + ?Sized,
    F: TypeFilter + ?Sized,
{
    fn load_relationship(&mut self, id: RelId) -> Result<RelationshipRecord> {
        if let Some(guard) = self.guard.as_mut() {
            guard.visit(self.node, RecordKind::Relationship, id.0)?;
        }
        self.metrics.relationship_read();
        trace!(node = %self.node, rel = %id, "chain.visit");
        self.store.load_relationship(id)
    }

    /// Loads group `id`; the sentinel and unused slots both end the group list.
    pub(super) fn load_group(&mut self, id: GroupId) -> Result<Option<RelationshipGroupRecord>> {
        if id.is_null() {
            return Ok(None);
        }
        if let Some(guard) = self.guard.as_mut() {
            guard.visit(self.node, RecordKind::Group, id.0)?;
        }
        self.metrics.group_read();
        trace!(node = %self.node, group = %id, "chain.group");
        self.store.load_group(id)
    }

    fn follow(&self, record: &RelationshipRecord) -> Result<RelId> {
        follow_chain(self.node, record).map_err(|err| {
            self.metrics.chain_corrupted();
            err
        })
    }

    fn fetch_sparse(&mut self, next: &mut RelId) -> Result<Option<RelationshipRecord>> {
        while !next.is_null() {
            let record = self.load_relationship(*next)?;
            let matched =
                self.filter.accept(record.ty) && self.direction.matches(self.node, &record);
            // Advance before deciding, so filtering never stalls the chain.
            *next = self.follow(&record)?;
            if matched {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn fetch_dense(
        &mut self,
        next: &mut RelId,
        groups: &mut GroupSelector,
    ) -> Result<Option<RelationshipRecord>> {
        if next.is_null() {
            return Ok(None);
        }
        // Group and sub-chain selection already guarantee type and direction.
        let record = self.load_relationship(*next)?;
        *next = self.follow(&record)?;
        if next.is_null() {
            *next = groups.next_chain_start(self)?;
        }
        Ok(Some(record))
    }
}

/// Cursor over a dense node's group list.
pub(super) struct GroupSelector {
    group: Option<RelationshipGroupRecord>,
    chain_index: usize,
}

impl GroupSelector {
    pub(super) fn new(group: Option<RelationshipGroupRecord>) -> Self {
        Self {
            group,
            chain_index: 0,
        }
    }

    /// Head of the next non-empty, eligible sub-chain, or the sentinel once
    /// every group is exhausted.
    pub(super) fn next_chain_start<S, F>(&mut self, walk: &mut Walk<'_, S, F>) -> Result<RelId>
    where
        S: RecordStore + ?Sized,
        F: TypeFilter + ?Sized,
    {
        while let Some(group) = self.group {
            if walk.filter.accept(group.ty) {
                while self.chain_index < GroupChain::ALL.len() {
                    let chain = GroupChain::ALL[self.chain_index];
                    self.chain_index += 1;
                    let start = chain.chain_start(&group);
                    if !start.is_null() && chain.matches_direction(walk.direction) {
                        return Ok(start);
                    }
                }
            }
            self.group = walk.load_group(group.next)?;
            self.chain_index = 0;
        }
        Ok(RelId::NULL)
    }
}

pub(super) enum Cursor {
    Sparse { next: RelId },
    Dense { next: RelId, groups: GroupSelector },
    Done,
}

/// Lazy iterator over the relationship ids of one node.
///
/// Yields `Err` at most once; after an error or the end of the last chain
/// every call returns `None` without touching the store.
pub struct RelationshipIter<'a, S: ?Sized, F: ?Sized> {
    walk: Walk<'a, S, F>,
    cursor: Cursor,
    relationship: Option<RelationshipRecord>,
}

impl<'a, S, F> RelationshipIter<'a, S, F>
where
    S: RecordStore + ?Sized,
    F: TypeFilter + ?Sized,
{
    pub(super) fn new(walk: Walk<'a, S, F>, cursor: Cursor) -> Self {
        Self {
            walk,
            cursor,
            relationship: None,
        }
    }

    /// The record of the relationship most recently produced.
    pub fn record(&self) -> Option<&RelationshipRecord> {
        self.relationship.as_ref()
    }

    /// Node whose relationships are being produced.
    pub fn node(&self) -> NodeId {
        self.walk.node
    }

    /// Whether this iterator walks a grouped layout.
    pub fn is_dense(&self) -> bool {
        matches!(self.cursor, Cursor::Dense { .. })
    }
}

impl<S, F> Iterator for RelationshipIter<'_, S, F>
where
    S: RecordStore + ?Sized,
    F: TypeFilter + ?Sized,
{
    type Item = Result<RelId>;

    fn next(&mut self) -> Option<Self::Item> {
        let fetched = match &mut self.cursor {
            Cursor::Sparse { next } => self.walk.fetch_sparse(next),
            Cursor::Dense { next, groups } => self.walk.fetch_dense(next, groups),
            Cursor::Done => return None,
        };
        match fetched {
            Ok(Some(record)) => {
                self.relationship = Some(record);
                Some(Ok(record.id))
            }
            Ok(None) => {
                self.cursor = Cursor::Done;
                None
            }
            Err(err) => {
                self.cursor = Cursor::Done;
                Some(Err(err))
            }
        }
    }
}

impl<S, F> FusedIterator for RelationshipIter<'_, S, F>
where
    S: RecordStore + ?Sized,
    F: TypeFilter + ?Sized,
{
}
