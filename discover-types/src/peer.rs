use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of a peer: `(processId, instanceId)`. No two peer records
/// may share both fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerKey {
    pub process_id: String,
    pub instance_id: String,
}

impl PeerKey {
    pub fn new(process_id: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
            instance_id: instance_id.into(),
        }
    }
}

/// The nested `data` block of a peer record: everything the peer
/// self-reported in its most recent hello.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerData {
    pub is_master: bool,
    pub is_master_eligible: bool,
    pub weight: f64,
    /// The peer's self-reported bind address (not the observed sender
    /// address, which lives on [`PeerInfo::address`]).
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertisement: Option<Value>,
}

/// A peer record as held in the peer table and handed to callbacks.
/// Callbacks receive a reference for the duration of the call; the
/// struct is `Clone` so a caller that needs to retain a snapshot must
/// explicitly clone it rather than holding the reference past the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub process_id: String,
    pub instance_id: String,
    pub hostname: String,
    /// Observed sender address (dotted-quad text), not the peer's
    /// self-reported bind address.
    pub address: String,
    pub port: u16,
    /// Seconds since the Unix epoch, wall-clock. Monotonically
    /// non-decreasing across updates to the same peer.
    pub last_seen: f64,
    pub data: PeerData,
}

impl PeerInfo {
    pub fn key(&self) -> PeerKey {
        PeerKey::new(self.process_id.clone(), self.instance_id.clone())
    }
}
