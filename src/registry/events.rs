//! Registry Events
//!
//! Events emitted by the node registry for external consumers to react to
//! node lifecycle changes. Only state changes produce events.

use serde::{Deserialize, Serialize};

/// Events emitted by the node registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// The owner registered a new node
    NodeRegistered { node: String, status: String },

    /// A node changed its own status
    NodeStatusUpdated {
        node: String,
        previous: String,
        current: String,
    },

    /// The owner revoked a node
    NodeRevoked { node: String },
}

impl RegistryEvent {
    /// Get the node associated with this event
    pub fn node(&self) -> &str {
        match self {
            RegistryEvent::NodeRegistered { node, .. } => node,
            RegistryEvent::NodeStatusUpdated { node, .. } => node,
            RegistryEvent::NodeRevoked { node } => node,
        }
    }
}

impl std::fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::NodeRegistered { node, status } => {
                write!(f, "node {} registered ({})", node, status)
            }
            RegistryEvent::NodeStatusUpdated {
                node,
                previous,
                current,
            } => write!(f, "node {} status {} -> {}", node, previous, current),
            RegistryEvent::NodeRevoked { node } => write!(f, "node {} revoked", node),
        }
    }
}
