//! Registry Metrics
//!
//! Prometheus exposition of registry state and per-operation outcomes.

use crate::error::{Error, Result};
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use super::GlobalStatsSnapshot;

/// Prometheus metrics for the node registry
#[derive(Clone)]
pub struct RegistryMetrics {
    registry: Registry,
    nodes_total: IntGauge,
    nodes_active: IntGauge,
    nodes_revoked: IntGauge,
    operations: IntCounterVec,
}

impl std::fmt::Debug for RegistryMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryMetrics").finish_non_exhaustive()
    }
}

impl RegistryMetrics {
    /// Create and register all collectors on a private registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let nodes_total = IntGauge::new(
            "loop_guard_nodes_total",
            "Total number of registered nodes, revoked included",
        )?;
        let nodes_active = IntGauge::new("loop_guard_nodes_active", "Number of active nodes")?;
        let nodes_revoked = IntGauge::new("loop_guard_nodes_revoked", "Number of revoked nodes")?;
        let operations = IntCounterVec::new(
            Opts::new(
                "loop_guard_operations_total",
                "Registry operations by outcome",
            ),
            &["operation", "outcome"],
        )?;

        registry.register(Box::new(nodes_total.clone()))?;
        registry.register(Box::new(nodes_active.clone()))?;
        registry.register(Box::new(nodes_revoked.clone()))?;
        registry.register(Box::new(operations.clone()))?;

        Ok(Self {
            registry,
            nodes_total,
            nodes_active,
            nodes_revoked,
            operations,
        })
    }

    /// Record the outcome of an operation; errors are labelled by kind
    pub fn record(&self, operation: &str, outcome: &std::result::Result<(), &Error>) {
        let label = match outcome {
            Ok(()) => "ok",
            Err(e) => e.kind(),
        };
        self.operations.with_label_values(&[operation, label]).inc();
    }

    /// Refresh gauges from a stats snapshot
    pub fn observe(&self, stats: &GlobalStatsSnapshot) {
        self.nodes_total.set(stats.total_nodes as i64);
        self.nodes_active.set(stats.active_nodes as i64);
        self.nodes_revoked.set(stats.revoked_nodes as i64);
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| Error::Internal(format!("metrics are not UTF-8: {}", e)))
    }

    /// Content type of [`render`](Self::render) output
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}
