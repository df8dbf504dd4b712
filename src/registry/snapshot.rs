//! Registry Snapshots
//!
//! JSON persistence for the registry. A snapshot is written to a temporary
//! file next to the target and renamed into place, so a crash mid-write never
//! leaves a truncated state file behind.

use crate::domain::Principal;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{NodeRecord, NodeRegistry};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

// =============================================================================
// Snapshot Types
// =============================================================================

/// A single persisted node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub node: Principal,
    pub record: NodeRecord,
}

/// Full persisted registry state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    /// Format version
    pub version: u32,
    /// Owner the registry was created with
    pub owner: Principal,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// All node records, sorted by principal
    pub nodes: Vec<SnapshotEntry>,
}

impl RegistrySnapshot {
    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

// =============================================================================
// Snapshot File
// =============================================================================

/// On-disk location of the registry state
#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
    /// Serializes writers so the newest snapshot is the last one renamed
    write_lock: Mutex<()>,
}

impl SnapshotFile {
    /// The path must name a file; its temporary sibling is derived from that name
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.file_name().is_none() {
            return Err(Error::Configuration(format!(
                "state file path {} does not name a file",
                path.display()
            )));
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Load the snapshot, or `None` if no state file exists yet
    pub async fn load(&self) -> Result<Option<RegistrySnapshot>> {
        match fs::read(&self.path).await {
            Ok(bytes) => {
                let snapshot = RegistrySnapshot::from_json(&bytes).map_err(|e| {
                    Error::Snapshot(format!("corrupt state file {}: {}", self.path.display(), e))
                })?;
                info!(
                    "Loaded snapshot from {} ({} nodes)",
                    self.path.display(),
                    snapshot.nodes.len()
                );
                Ok(Some(snapshot))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Take a snapshot of `registry` and write it atomically
    pub async fn save(&self, registry: &NodeRegistry) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        // Taken under the write lock so a later mutation is never overwritten
        // by an older snapshot.
        let snapshot = registry.snapshot();
        let bytes = snapshot.to_json()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp = self.temp_path();
        fs::write(&temp, &bytes).await?;
        fs::rename(&temp, &self.path).await?;

        debug!(
            "Saved snapshot to {} ({} nodes)",
            self.path.display(),
            snapshot.nodes.len()
        );
        Ok(())
    }
}
