use std::sync::Arc;

use super::metrics::TraversalMetrics;

/// Configuration applied when opening a node's relationships.
#[derive(Clone, Default)]
pub struct TraversalOptions {
    /// Optional metrics collection implementation
    pub metrics: Option<Arc<dyn TraversalMetrics>>,
    /// Whether iterators track visited records and fail on revisits.
    ///
    /// Off by default; well-formed stores never need it.
    pub cycle_guard: bool,
}

impl TraversalOptions {
    /// Creates options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the metrics collection implementation.
    pub fn metrics(mut self, metrics: Arc<dyn TraversalMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Enables or disables the cycle guard.
    pub fn cycle_guard(mut self, enabled: bool) -> Self {
        self.cycle_guard = enabled;
        self
    }
}
