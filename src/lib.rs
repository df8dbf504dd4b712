//! Loop Guard - Owner-Guarded Node Registry
//!
//! A single privileged owner enrolls nodes, each node reports its own status
//! while active, and the owner can permanently revoke a node.
//!
//! # Lifecycle
//!
//! ```text
//!   (absent) ──register(owner)──▶ active ──revoke(owner)──▶ revoked
//!                                  │  ▲                       │
//!                                  └──┘                       └── update_status fails (103)
//!                          update_status(self)
//! ```
//!
//! # Modules
//!
//! - [`registry`]: Sharded registry state machine, events, metrics and snapshots
//! - [`domain`]: Principal and status value types
//! - [`api`]: REST boundary
//! - [`error`]: Error types and codes

pub mod api;
pub mod domain;
pub mod error;
pub mod registry;

// Re-export commonly used types
pub use api::{ApiServer, ApiServerConfig, RestRouter, CALLER_HEADER};

pub use domain::{NodeStatus, Principal, DEFAULT_STATUS, MAX_STATUS_LEN};

pub use error::{Error, ErrorCategory, Result};

pub use registry::{
    GlobalStatsSnapshot, NodeRecord, NodeRegistry, RegistryConfig, RegistryEvent,
    RegistryMetrics, RegistrySnapshot, SnapshotFile,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
