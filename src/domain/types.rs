//! Domain Types
//!
//! Account principals and bounded node status text. Both are validated once at
//! construction so the registry only ever handles well-formed values.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

// =============================================================================
// Constants
// =============================================================================

/// Maximum length of a node status, in bytes
pub const MAX_STATUS_LEN: usize = 32;

/// Maximum length of a principal, in bytes
pub const MAX_PRINCIPAL_LEN: usize = 128;

/// Status assigned to a node when the owner registers it
pub const DEFAULT_STATUS: &str = "registered";

// =============================================================================
// Principal
// =============================================================================

/// Opaque account identity, used as registry key and authorization subject
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Parse a principal, rejecting empty, oversized or whitespace-bearing input
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::InvalidPrincipal {
                reason: "principal is empty".into(),
            });
        }
        if value.len() > MAX_PRINCIPAL_LEN {
            return Err(Error::InvalidPrincipal {
                reason: format!(
                    "principal is {} bytes, max is {}",
                    value.len(),
                    MAX_PRINCIPAL_LEN
                ),
            });
        }
        if !value.chars().all(|c| c.is_ascii_graphic()) {
            return Err(Error::InvalidPrincipal {
                reason: format!("principal {:?} contains non-printable characters", value),
            });
        }
        Ok(Self(value))
    }

    /// Get the shard index for this principal
    #[inline]
    pub fn shard_index(&self, shard_count: usize) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.0.hash(&mut hasher);
        (hasher.finish() as usize) % shard_count
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Principal {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for Principal {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Principal> for String {
    fn from(principal: Principal) -> Self {
        principal.0
    }
}

impl std::str::FromStr for Principal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// =============================================================================
// Node Status
// =============================================================================

/// Short printable-ASCII status tag reported by a node (e.g. "running")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeStatus(String);

impl NodeStatus {
    /// Parse a status, enforcing 1..=MAX_STATUS_LEN printable ASCII bytes
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::InvalidStatus {
                reason: "status is empty".into(),
            });
        }
        if value.len() > MAX_STATUS_LEN {
            return Err(Error::InvalidStatus {
                reason: format!("status is {} bytes, max is {}", value.len(), MAX_STATUS_LEN),
            });
        }
        if !value.bytes().all(|b| (0x20..0x7f).contains(&b)) {
            return Err(Error::InvalidStatus {
                reason: format!("status {:?} is not printable ASCII", value),
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self(DEFAULT_STATUS.to_string())
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for NodeStatus {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for NodeStatus {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<NodeStatus> for String {
    fn from(status: NodeStatus) -> Self {
        status.0
    }
}

impl PartialEq<str> for NodeStatus {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeStatus {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_principal_parse() {
        let p = Principal::parse("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM").unwrap();
        assert_eq!(p.as_str(), "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM");

        assert_matches!(Principal::parse(""), Err(Error::InvalidPrincipal { .. }));
        assert_matches!(Principal::parse("two words"), Err(Error::InvalidPrincipal { .. }));
        assert_matches!(
            Principal::parse("x".repeat(MAX_PRINCIPAL_LEN + 1)),
            Err(Error::InvalidPrincipal { .. })
        );
    }

    #[test]
    fn test_principal_sharding() {
        let a = Principal::parse("node-001").unwrap();
        let b = Principal::parse("node-001").unwrap();
        assert_eq!(a.shard_index(64), b.shard_index(64));
        assert!(a.shard_index(64) < 64);
    }

    #[test]
    fn test_status_bounds() {
        assert_eq!(NodeStatus::parse("running").unwrap(), "running");
        assert!(NodeStatus::parse("a".repeat(MAX_STATUS_LEN)).is_ok());

        assert_matches!(NodeStatus::parse(""), Err(Error::InvalidStatus { .. }));
        assert_matches!(
            NodeStatus::parse("a".repeat(MAX_STATUS_LEN + 1)),
            Err(Error::InvalidStatus { .. })
        );
        assert_matches!(NodeStatus::parse("läuft"), Err(Error::InvalidStatus { .. }));
        assert_matches!(NodeStatus::parse("line\nbreak"), Err(Error::InvalidStatus { .. }));
    }

    #[test]
    fn test_default_status() {
        assert_eq!(NodeStatus::default(), DEFAULT_STATUS);
    }

    #[test]
    fn test_serde_validates() {
        let status: NodeStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(status, "running");
        assert!(serde_json::from_str::<NodeStatus>("\"\"").is_err());

        let principal: Principal = serde_json::from_str("\"wallet_1\"").unwrap();
        assert_eq!(serde_json::to_string(&principal).unwrap(), "\"wallet_1\"");
        assert!(serde_json::from_str::<Principal>("\" \"").is_err());
    }
}
