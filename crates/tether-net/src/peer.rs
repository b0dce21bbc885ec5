//! Peer identity and network roles

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a connected peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub Uuid);

impl PeerId {
    /// Create a new random peer ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a peer ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a peer relates to a replicated actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetRole {
    /// Owns the truth: validates requests and commits replicated state
    Authority,
    /// Non-authoritative copy driven by local input on the owning client
    AutonomousProxy,
    /// Non-authoritative copy that only mirrors replicated state
    SimulatedProxy,
}

impl NetRole {
    /// Whether this role may commit replicated state
    pub fn has_authority(&self) -> bool {
        matches!(self, NetRole::Authority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_ids_are_unique() {
        assert_ne!(PeerId::new(), PeerId::new());
    }

    #[test]
    fn test_only_authority_commits() {
        assert!(NetRole::Authority.has_authority());
        assert!(!NetRole::AutonomousProxy.has_authority());
        assert!(!NetRole::SimulatedProxy.has_authority());
    }
}
