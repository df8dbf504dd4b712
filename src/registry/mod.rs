//! Node Registry Module
//!
//! Owner-guarded registry of node records with lifecycle events, statistics,
//! Prometheus metrics and snapshot persistence.

pub mod events;
pub mod metrics;
pub mod node_registry;
pub mod snapshot;

pub use events::*;
pub use metrics::*;
pub use node_registry::*;
pub use snapshot::*;
