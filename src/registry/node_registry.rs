//! Sharded Node Registry
//!
//! Owner-guarded registry of node records. Records are spread over a fixed
//! number of shards by principal hash; every operation touches exactly one key
//! and evaluates its preconditions and applies its effect under that shard's
//! write lock, so each call is all-or-nothing.

use crate::domain::{NodeStatus, Principal};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::snapshot::{RegistrySnapshot, SnapshotEntry, SNAPSHOT_VERSION};
use super::RegistryEvent;

// =============================================================================
// Constants
// =============================================================================

/// Number of shards in the registry
pub const REGISTRY_SHARD_COUNT: usize = 64;

/// Default capacity of the event channel
pub const DEFAULT_EVENT_BUFFER: usize = 1024;

// =============================================================================
// Node Record
// =============================================================================

/// Record kept for every registered node. Never removed once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    /// Last status reported by the node
    pub status: NodeStatus,
    /// False once the owner has revoked the node
    pub active: bool,
    /// Registration timestamp
    pub registered_at: DateTime<Utc>,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
    /// First revocation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
}

impl NodeRecord {
    /// Create an active record carrying the default status
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            status: NodeStatus::default(),
            active: true,
            registered_at: now,
            updated_at: now,
            revoked_at: None,
        }
    }

    /// Replace the status, returning the previous one
    fn set_status(&mut self, status: NodeStatus) -> NodeStatus {
        self.updated_at = Utc::now();
        std::mem::replace(&mut self.status, status)
    }

    /// Deactivate the record. Returns false if it was already revoked.
    fn revoke(&mut self) -> bool {
        if !self.active {
            return false;
        }
        let now = Utc::now();
        self.active = false;
        self.updated_at = now;
        self.revoked_at = Some(now);
        true
    }

    /// Revoked records, and only those, carry a revocation time
    fn is_consistent(&self) -> bool {
        self.active == self.revoked_at.is_none()
    }
}

impl Default for NodeRecord {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Registry Configuration
// =============================================================================

/// Configuration for the node registry
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Capacity of the broadcast channel for registry events
    pub event_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

// =============================================================================
// Registry Shard
// =============================================================================

/// A single shard of the registry
type RegistryShard = RwLock<HashMap<Principal, NodeRecord>>;

// =============================================================================
// Global Statistics
// =============================================================================

/// Global statistics across all shards
#[derive(Debug, Default)]
pub struct GlobalStats {
    /// Nodes ever registered (records are never removed)
    pub total_nodes: AtomicU64,
    /// Nodes currently active
    pub active_nodes: AtomicU64,
    /// Nodes revoked
    pub revoked_nodes: AtomicU64,
    /// Successful register calls
    pub registrations: AtomicU64,
    /// Successful update_status calls
    pub status_updates: AtomicU64,
    /// Revoke calls that deactivated a node
    pub revocations: AtomicU64,
    /// Calls refused by an authorization or state rule
    pub rejections: AtomicU64,
}

impl GlobalStats {
    /// Create a snapshot of current stats
    pub fn snapshot(&self) -> GlobalStatsSnapshot {
        GlobalStatsSnapshot {
            total_nodes: self.total_nodes.load(Ordering::Relaxed),
            active_nodes: self.active_nodes.load(Ordering::Relaxed),
            revoked_nodes: self.revoked_nodes.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
            status_updates: self.status_updates.load(Ordering::Relaxed),
            revocations: self.revocations.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of global statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStatsSnapshot {
    pub total_nodes: u64,
    pub active_nodes: u64,
    pub revoked_nodes: u64,
    pub registrations: u64,
    pub status_updates: u64,
    pub revocations: u64,
    pub rejections: u64,
}

// =============================================================================
// Node Registry
// =============================================================================

/// Owner-guarded node registry
pub struct NodeRegistry {
    /// The single privileged identity, fixed at construction
    owner: Principal,
    /// Shards for node storage
    shards: Box<[RegistryShard]>,
    /// Global statistics
    global_stats: GlobalStats,
    /// Event broadcaster
    event_sender: broadcast::Sender<RegistryEvent>,
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("owner", &self.owner)
            .field("shards", &self.shards.len())
            .field("stats", &self.global_stats.snapshot())
            .finish()
    }
}

impl NodeRegistry {
    /// Create an empty registry owned by `owner`
    pub fn new(owner: Principal) -> Arc<Self> {
        Arc::new(Self::build(owner, &RegistryConfig::default()))
    }

    /// Create an empty registry with explicit configuration
    pub fn with_config(owner: Principal, config: &RegistryConfig) -> Arc<Self> {
        Arc::new(Self::build(owner, config))
    }

    /// Rebuild a registry from a persisted snapshot.
    ///
    /// The snapshot must have been taken from a registry with the same owner;
    /// ownership is never transferred by a restore.
    pub fn restore(
        owner: Principal,
        config: &RegistryConfig,
        snapshot: RegistrySnapshot,
    ) -> Result<Arc<Self>> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Snapshot(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        if snapshot.owner != owner {
            return Err(Error::Configuration(format!(
                "snapshot owner {} does not match configured owner {}",
                snapshot.owner, owner
            )));
        }

        let registry = Self::build(owner, config);
        for SnapshotEntry { node, record } in snapshot.nodes {
            let shard = registry.shard(&node);
            let mut nodes = shard.write();
            if nodes.contains_key(&node) {
                return Err(Error::Snapshot(format!("duplicate node {} in snapshot", node)));
            }
            if !record.is_consistent() {
                return Err(Error::Snapshot(format!(
                    "node {} is {} but revoked_at is {}",
                    node,
                    if record.active { "active" } else { "revoked" },
                    if record.revoked_at.is_some() { "set" } else { "unset" }
                )));
            }

            registry.global_stats.total_nodes.fetch_add(1, Ordering::Relaxed);
            if record.active {
                registry.global_stats.active_nodes.fetch_add(1, Ordering::Relaxed);
            } else {
                registry.global_stats.revoked_nodes.fetch_add(1, Ordering::Relaxed);
            }
            nodes.insert(node, record);
        }

        info!(
            "Registry restored: {} nodes ({} active)",
            registry.global_stats.total_nodes.load(Ordering::Relaxed),
            registry.global_stats.active_nodes.load(Ordering::Relaxed)
        );
        Ok(Arc::new(registry))
    }

    fn build(owner: Principal, config: &RegistryConfig) -> Self {
        let shards: Box<[RegistryShard]> = (0..REGISTRY_SHARD_COUNT)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();

        let (event_sender, _) = broadcast::channel(config.event_buffer.max(1));

        Self {
            owner,
            shards,
            global_stats: GlobalStats::default(),
            event_sender,
        }
    }

    /// The registry owner
    pub fn owner(&self) -> &Principal {
        &self.owner
    }

    /// Get an event receiver
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_sender.subscribe()
    }

    // =========================================================================
    // Authorization
    // =========================================================================

    /// Owner-gated operations: register and revoke
    fn ensure_owner(&self, caller: &Principal) -> Result<()> {
        if *caller == self.owner {
            Ok(())
        } else {
            Err(Error::OwnerOnly {
                caller: caller.to_string(),
            })
        }
    }

    /// Self-gated operations: a node may only update its own record
    fn ensure_self(caller: &Principal, node: &Principal) -> Result<()> {
        if caller == node {
            Ok(())
        } else {
            Err(Error::NotAuthorized {
                caller: caller.to_string(),
                node: node.to_string(),
            })
        }
    }

    fn reject(&self, operation: &str, caller: &Principal, err: Error) -> Error {
        self.global_stats.rejections.fetch_add(1, Ordering::Relaxed);
        warn!(operation, caller = %caller, "Rejected: {}", err);
        err
    }

    /// Count a call refused before it reached the registry, e.g. malformed
    /// input or a missing caller at the API boundary
    pub fn note_rejection(&self, operation: &str, err: Error) -> Error {
        self.global_stats.rejections.fetch_add(1, Ordering::Relaxed);
        warn!(operation, "Rejected at boundary: {}", err);
        err
    }

    #[inline]
    fn shard(&self, node: &Principal) -> &RegistryShard {
        &self.shards[node.shard_index(self.shards.len())]
    }

    fn emit(&self, event: RegistryEvent) {
        // No subscribers is not an error
        let _ = self.event_sender.send(event);
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Register `node` with the default status. Owner only.
    pub fn register(&self, caller: &Principal, node: Principal) -> Result<()> {
        self.ensure_owner(caller)
            .map_err(|e| self.reject("register", caller, e))?;

        let shard = self.shard(&node);
        let mut nodes = shard.write();
        if nodes.contains_key(&node) {
            let err = Error::AlreadyRegistered {
                node: node.to_string(),
            };
            return Err(self.reject("register", caller, err));
        }

        let record = NodeRecord::new();
        let status = record.status.to_string();
        nodes.insert(node.clone(), record);

        self.global_stats.total_nodes.fetch_add(1, Ordering::Relaxed);
        self.global_stats.active_nodes.fetch_add(1, Ordering::Relaxed);
        self.global_stats.registrations.fetch_add(1, Ordering::Relaxed);

        // Sent under the shard lock so per-node event order matches apply order
        self.emit(RegistryEvent::NodeRegistered {
            node: node.to_string(),
            status,
        });
        drop(nodes);

        info!(node = %node, "Node registered");
        Ok(())
    }

    /// Overwrite the status of `node`. Only the node itself, only while active.
    pub fn update_status(
        &self,
        caller: &Principal,
        node: &Principal,
        status: NodeStatus,
    ) -> Result<()> {
        let shard = self.shard(node);
        let mut nodes = shard.write();

        let Some(record) = nodes.get_mut(node) else {
            let err = Error::NotFound {
                node: node.to_string(),
            };
            return Err(self.reject("update_status", caller, err));
        };

        Self::ensure_self(caller, node)
            .map_err(|e| self.reject("update_status", caller, e))?;

        if !record.active {
            let err = Error::Revoked {
                node: node.to_string(),
            };
            return Err(self.reject("update_status", caller, err));
        }

        let current = status.to_string();
        let previous = record.set_status(status);
        self.global_stats.status_updates.fetch_add(1, Ordering::Relaxed);

        self.emit(RegistryEvent::NodeStatusUpdated {
            node: node.to_string(),
            previous: previous.to_string(),
            current: current.clone(),
        });
        drop(nodes);

        info!(node = %node, status = %current, "Node status updated");
        Ok(())
    }

    /// Permanently deactivate `node`. Owner only; repeating it is a no-op.
    pub fn revoke(&self, caller: &Principal, node: &Principal) -> Result<()> {
        self.ensure_owner(caller)
            .map_err(|e| self.reject("revoke", caller, e))?;

        let shard = self.shard(node);
        let mut nodes = shard.write();

        let Some(record) = nodes.get_mut(node) else {
            let err = Error::NotFound {
                node: node.to_string(),
            };
            return Err(self.reject("revoke", caller, err));
        };

        if !record.revoke() {
            debug!(node = %node, "Node already revoked");
            return Ok(());
        }

        self.global_stats.active_nodes.fetch_sub(1, Ordering::Relaxed);
        self.global_stats.revoked_nodes.fetch_add(1, Ordering::Relaxed);
        self.global_stats.revocations.fetch_add(1, Ordering::Relaxed);

        self.emit(RegistryEvent::NodeRevoked {
            node: node.to_string(),
        });
        drop(nodes);

        info!(node = %node, "Node revoked");
        Ok(())
    }

    /// Look up a node. Public: no caller restriction applies to reads.
    ///
    /// Returns the record for active and revoked nodes alike, `None` only for
    /// principals that were never registered.
    pub fn get_info(&self, node: &Principal) -> Option<NodeRecord> {
        let record = self.shard(node).read().get(node).cloned();
        debug!(node = %node, found = record.is_some(), "Node lookup");
        record
    }

    /// Get global statistics
    pub fn stats(&self) -> GlobalStatsSnapshot {
        self.global_stats.snapshot()
    }

    /// Take a consistent-per-shard copy of the registry for persistence.
    /// Entries are sorted by principal so identical state serializes identically.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let mut nodes: Vec<SnapshotEntry> = Vec::new();
        for shard in self.shards.iter() {
            let guard = shard.read();
            nodes.extend(guard.iter().map(|(node, record)| SnapshotEntry {
                node: node.clone(),
                record: record.clone(),
            }));
        }
        nodes.sort_by(|a, b| a.node.cmp(&b.node));

        RegistrySnapshot {
            version: SNAPSHOT_VERSION,
            owner: self.owner.clone(),
            taken_at: Utc::now(),
            nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn principal(name: &str) -> Principal {
        Principal::parse(name).unwrap()
    }

    fn status(value: &str) -> NodeStatus {
        NodeStatus::parse(value).unwrap()
    }

    fn setup() -> (Arc<NodeRegistry>, Principal, Principal) {
        let deployer = principal("deployer");
        let wallet1 = principal("wallet_1");
        (NodeRegistry::new(deployer.clone()), deployer, wallet1)
    }

    #[test]
    fn test_only_owner_can_register() {
        let (registry, deployer, wallet1) = setup();

        registry.register(&deployer, wallet1.clone()).unwrap();

        let err = registry.register(&wallet1, principal("wallet_2")).unwrap_err();
        assert_matches!(err, Error::OwnerOnly { .. });
        assert_eq!(err.code(), Some(100));
        assert!(registry.get_info(&principal("wallet_2")).is_none());
        assert_eq!(registry.stats().total_nodes, 1);
    }

    #[test]
    fn test_register_sets_default_record() {
        let (registry, deployer, wallet1) = setup();
        registry.register(&deployer, wallet1.clone()).unwrap();

        let record = registry.get_info(&wallet1).unwrap();
        assert_eq!(record.status, "registered");
        assert!(record.active);
        assert!(record.revoked_at.is_none());
    }

    #[test]
    fn test_duplicate_registration() {
        let (registry, deployer, wallet1) = setup();
        registry.register(&deployer, wallet1.clone()).unwrap();
        registry
            .update_status(&wallet1, &wallet1, status("running"))
            .unwrap();

        let err = registry.register(&deployer, wallet1.clone()).unwrap_err();
        assert_matches!(err, Error::AlreadyRegistered { .. });

        // The existing record is untouched
        assert_eq!(registry.get_info(&wallet1).unwrap().status, "running");
        assert_eq!(registry.stats().registrations, 1);
    }

    #[test]
    fn test_register_revoked_node_again_fails() {
        let (registry, deployer, wallet1) = setup();
        registry.register(&deployer, wallet1.clone()).unwrap();
        registry.revoke(&deployer, &wallet1).unwrap();

        assert_matches!(
            registry.register(&deployer, wallet1.clone()),
            Err(Error::AlreadyRegistered { .. })
        );
        assert!(!registry.get_info(&wallet1).unwrap().active);
    }

    #[test]
    fn test_self_status_update() {
        let (registry, deployer, wallet1) = setup();
        registry.register(&deployer, wallet1.clone()).unwrap();

        registry
            .update_status(&wallet1, &wallet1, status("running"))
            .unwrap();

        let record = registry.get_info(&wallet1).unwrap();
        assert_eq!(record.status, "running");
        assert!(record.active);
        assert_eq!(registry.stats().status_updates, 1);
    }

    #[test]
    fn test_owner_cannot_update_node_status() {
        let (registry, deployer, wallet1) = setup();
        registry.register(&deployer, wallet1.clone()).unwrap();

        let err = registry
            .update_status(&deployer, &wallet1, status("running"))
            .unwrap_err();
        assert_matches!(err, Error::NotAuthorized { .. });
        assert_eq!(err.code(), Some(102));
        assert_eq!(registry.get_info(&wallet1).unwrap().status, "registered");
    }

    #[test]
    fn test_update_unknown_node() {
        let (registry, _deployer, wallet1) = setup();

        let err = registry
            .update_status(&wallet1, &wallet1, status("running"))
            .unwrap_err();
        assert_matches!(err, Error::NotFound { .. });
        assert!(registry.get_info(&wallet1).is_none());
    }

    #[test]
    fn test_not_found_checked_before_caller() {
        let (registry, deployer, wallet1) = setup();

        assert_matches!(
            registry.update_status(&deployer, &wallet1, status("running")),
            Err(Error::NotFound { .. })
        );
    }

    #[test]
    fn test_caller_checked_before_revocation() {
        let (registry, deployer, wallet1) = setup();
        registry.register(&deployer, wallet1.clone()).unwrap();
        registry.revoke(&deployer, &wallet1).unwrap();

        assert_matches!(
            registry.update_status(&principal("wallet_2"), &wallet1, status("running")),
            Err(Error::NotAuthorized { .. })
        );
    }

    #[test]
    fn test_revocation_blocks_updates() {
        let (registry, deployer, wallet1) = setup();
        registry.register(&deployer, wallet1.clone()).unwrap();

        registry
            .update_status(&wallet1, &wallet1, status("running"))
            .unwrap();
        let record = registry.get_info(&wallet1).unwrap();
        assert_eq!(record.status, "running");
        assert!(record.active);

        registry.revoke(&deployer, &wallet1).unwrap();

        let err = registry
            .update_status(&wallet1, &wallet1, status("running"))
            .unwrap_err();
        assert_matches!(err, Error::Revoked { .. });
        assert_eq!(err.code(), Some(103));

        // Record retained after revocation
        let record = registry.get_info(&wallet1).unwrap();
        assert!(!record.active);
        assert_eq!(record.status, "running");
        assert!(record.revoked_at.is_some());
    }

    #[test]
    fn test_only_owner_can_revoke() {
        let (registry, deployer, wallet1) = setup();
        registry.register(&deployer, wallet1.clone()).unwrap();

        assert_matches!(
            registry.revoke(&wallet1, &wallet1),
            Err(Error::OwnerOnly { .. })
        );
        assert!(registry.get_info(&wallet1).unwrap().active);
    }

    #[test]
    fn test_owner_checked_before_existence_on_revoke() {
        let (registry, _deployer, wallet1) = setup();

        assert_matches!(
            registry.revoke(&wallet1, &principal("ghost")),
            Err(Error::OwnerOnly { .. })
        );
    }

    #[test]
    fn test_revoke_unknown_node() {
        let (registry, deployer, _wallet1) = setup();

        assert_matches!(
            registry.revoke(&deployer, &principal("ghost")),
            Err(Error::NotFound { .. })
        );
        assert!(registry.get_info(&principal("ghost")).is_none());
    }

    #[test]
    fn test_double_revoke_is_noop() {
        let (registry, deployer, wallet1) = setup();
        registry.register(&deployer, wallet1.clone()).unwrap();
        registry.revoke(&deployer, &wallet1).unwrap();
        let first = registry.get_info(&wallet1).unwrap();

        registry.revoke(&deployer, &wallet1).unwrap();

        assert_eq!(registry.get_info(&wallet1).unwrap(), first);
        let stats = registry.stats();
        assert_eq!(stats.revocations, 1);
        assert_eq!(stats.revoked_nodes, 1);
        assert_eq!(stats.active_nodes, 0);
    }

    #[test]
    fn test_get_info_unregistered() {
        let (registry, _deployer, wallet1) = setup();
        assert!(registry.get_info(&wallet1).is_none());
    }

    #[test]
    fn test_rejections_counted() {
        let (registry, deployer, wallet1) = setup();
        let _ = registry.register(&wallet1, wallet1.clone());
        let _ = registry.revoke(&deployer, &wallet1);

        assert_eq!(registry.stats().rejections, 2);
    }

    #[tokio::test]
    async fn test_events_follow_lifecycle() {
        let (registry, deployer, wallet1) = setup();
        let mut rx = registry.subscribe();

        registry.register(&deployer, wallet1.clone()).unwrap();
        registry
            .update_status(&wallet1, &wallet1, status("running"))
            .unwrap();
        let _ = registry.update_status(&deployer, &wallet1, status("stopped"));
        registry.revoke(&deployer, &wallet1).unwrap();
        registry.revoke(&deployer, &wallet1).unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            RegistryEvent::NodeRegistered {
                node: "wallet_1".into(),
                status: "registered".into(),
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            RegistryEvent::NodeStatusUpdated {
                node: "wallet_1".into(),
                previous: "registered".into(),
                current: "running".into(),
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            RegistryEvent::NodeRevoked {
                node: "wallet_1".into(),
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_snapshot_restore() {
        let (registry, deployer, wallet1) = setup();
        let wallet2 = principal("wallet_2");
        registry.register(&deployer, wallet1.clone()).unwrap();
        registry.register(&deployer, wallet2.clone()).unwrap();
        registry
            .update_status(&wallet1, &wallet1, status("running"))
            .unwrap();
        registry.revoke(&deployer, &wallet2).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.nodes.len(), 2);
        assert_eq!(snapshot.nodes[0].node, wallet1);

        let restored =
            NodeRegistry::restore(deployer.clone(), &RegistryConfig::default(), snapshot).unwrap();
        assert_eq!(restored.get_info(&wallet1), registry.get_info(&wallet1));
        assert_eq!(restored.get_info(&wallet2), registry.get_info(&wallet2));

        let stats = restored.stats();
        assert_eq!(stats.total_nodes, 2);
        assert_eq!(stats.active_nodes, 1);
        assert_eq!(stats.revoked_nodes, 1);

        // Revocation survives the restore
        assert_matches!(
            restored.update_status(&wallet2, &wallet2, status("running")),
            Err(Error::Revoked { .. })
        );
    }

    #[test]
    fn test_restore_rejects_foreign_owner() {
        let (registry, _deployer, wallet1) = setup();
        let snapshot = registry.snapshot();

        assert_matches!(
            NodeRegistry::restore(wallet1, &RegistryConfig::default(), snapshot),
            Err(Error::Configuration(_))
        );
    }

    #[test]
    fn test_restore_rejects_duplicates() {
        let (registry, deployer, wallet1) = setup();
        registry.register(&deployer, wallet1).unwrap();
        let mut snapshot = registry.snapshot();
        snapshot.nodes.push(snapshot.nodes[0].clone());

        assert_matches!(
            NodeRegistry::restore(deployer, &RegistryConfig::default(), snapshot),
            Err(Error::Snapshot(_))
        );
    }

    #[test]
    fn test_restore_rejects_inconsistent_records() {
        let (registry, deployer, wallet1) = setup();
        registry.register(&deployer, wallet1.clone()).unwrap();

        let mut active_with_revocation = registry.snapshot();
        active_with_revocation.nodes[0].record.revoked_at = Some(Utc::now());
        assert_matches!(
            NodeRegistry::restore(
                deployer.clone(),
                &RegistryConfig::default(),
                active_with_revocation
            ),
            Err(Error::Snapshot(_))
        );

        let mut revoked_without_time = registry.snapshot();
        revoked_without_time.nodes[0].record.active = false;
        assert_matches!(
            NodeRegistry::restore(deployer, &RegistryConfig::default(), revoked_without_time),
            Err(Error::Snapshot(_))
        );
    }

    #[test]
    fn test_boundary_rejections_counted() {
        let (registry, _deployer, _wallet1) = setup();
        let err = registry.note_rejection(
            "update_status",
            Error::InvalidStatus {
                reason: "too long".into(),
            },
        );

        assert_matches!(err, Error::InvalidStatus { .. });
        assert_eq!(registry.stats().rejections, 1);
    }

    #[tokio::test]
    async fn test_concurrent_self_updates() {
        let (registry, deployer, _wallet1) = setup();
        let nodes: Vec<Principal> = (0..32).map(|i| principal(&format!("node-{:02}", i))).collect();
        for node in &nodes {
            registry.register(&deployer, node.clone()).unwrap();
        }

        let mut handles = Vec::new();
        for node in nodes.clone() {
            let reg = registry.clone();
            handles.push(tokio::spawn(async move {
                reg.update_status(&node, &node, NodeStatus::parse("running").unwrap())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for node in &nodes {
            assert_eq!(registry.get_info(node).unwrap().status, "running");
        }
        assert_eq!(registry.stats().status_updates, 32);
    }
}
