use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Trait for tracking record reads performed by relationship traversal.
///
/// Every store lookup issued by a traversal is reported exactly once, which
/// makes it possible to assert how much of the store a traversal touched.
pub trait TraversalMetrics: Send + Sync {
    /// Records a node record lookup.
    fn node_read(&self);

    /// Records a relationship record lookup.
    fn relationship_read(&self);

    /// Records a relationship-group record lookup.
    fn group_read(&self);

    /// Records a chain that referenced neither endpoint of the traversed node.
    fn chain_corrupted(&self);
}

/// A no-op implementation of [`TraversalMetrics`].
#[derive(Default)]
pub struct NoopMetrics;

impl TraversalMetrics for NoopMetrics {
    fn node_read(&self) {}
    fn relationship_read(&self) {}
    fn group_read(&self) {}
    fn chain_corrupted(&self) {}
}

/// Atomic counter implementation of [`TraversalMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Number of node records read.
    pub nodes_read: AtomicU64,

    /// Number of relationship records read.
    pub relationships_read: AtomicU64,

    /// Number of group records read.
    pub groups_read: AtomicU64,

    /// Number of corrupt chains encountered.
    pub corrupt_chains: AtomicU64,
}

impl CounterMetrics {
    /// Total records read of any kind.
    pub fn total_reads(&self) -> u64 {
        self.nodes_read.load(Ordering::Relaxed)
            + self.relationships_read.load(Ordering::Relaxed)
            + self.groups_read.load(Ordering::Relaxed)
    }
}

impl TraversalMetrics for CounterMetrics {
    fn node_read(&self) {
        self.nodes_read.fetch_add(1, Ordering::Relaxed);
    }

    fn relationship_read(&self) {
        self.relationships_read.fetch_add(1, Ordering::Relaxed);
    }

    fn group_read(&self) {
        self.groups_read.fetch_add(1, Ordering::Relaxed);
    }

    fn chain_corrupted(&self) {
        self.corrupt_chains.fetch_add(1, Ordering::Relaxed);
    }
}

/// Returns the default metrics implementation, which discards everything.
pub fn default_metrics() -> Arc<dyn TraversalMetrics> {
    Arc::new(NoopMetrics)
}
