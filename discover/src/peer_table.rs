//! The peer table: one record per `(processId, instanceId)`, aged by
//! the check loop.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use discover_types::{PeerData, PeerInfo, PeerKey};
use indexmap::IndexMap;
use tokio::sync::Mutex;

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Result of an [`PeerTable::upsert`] call: whether the record was just
/// created, and whether it was already a known master before this
/// update (the dispatcher needs both to decide which callbacks fire).
pub struct UpsertOutcome {
    pub record: PeerInfo,
    pub was_new: bool,
    pub was_master: bool,
}

/// Summary used by the election rule; one linear pass over the table.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerSummary {
    pub masters_found: usize,
    pub masters_higher_weight: usize,
    pub any_eligible_higher_weight: bool,
}

/// Insertion-ordered map from peer identity to peer record, guarded by
/// a single mutex (spec requires no two records share `(pid, iid)` and
/// a stable traversal order; `IndexMap` gives both for free).
pub struct PeerTable {
    peers: Mutex<IndexMap<PeerKey, PeerInfo>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self {
            peers: Mutex::new(IndexMap::new()),
        }
    }

    pub async fn upsert(
        &self,
        key: PeerKey,
        hostname: String,
        address: String,
        port: u16,
        data: PeerData,
    ) -> UpsertOutcome {
        let mut peers = self.peers.lock().await;
        let now = now_secs();
        if let Some(existing) = peers.get_mut(&key) {
            let was_master = existing.data.is_master;
            existing.hostname = hostname;
            existing.address = address;
            existing.port = port;
            existing.data = data;
            existing.last_seen = existing.last_seen.max(now);
            UpsertOutcome {
                record: existing.clone(),
                was_new: false,
                was_master,
            }
        } else {
            let record = PeerInfo {
                process_id: key.process_id.clone(),
                instance_id: key.instance_id.clone(),
                hostname,
                address,
                port,
                last_seen: now,
                data,
            };
            peers.insert(key, record.clone());
            UpsertOutcome {
                record,
                was_new: true,
                was_master: false,
            }
        }
    }

    /// Remove peers whose last hello is older than their timeout (or
    /// whose `lastSeen` is in the future — clock skew). Returns the
    /// removed records in no particular order.
    pub async fn sweep(&self, node_timeout: Duration, master_timeout: Duration) -> Vec<PeerInfo> {
        let mut peers = self.peers.lock().await;
        let now = now_secs();
        let mut removed = Vec::new();
        peers.retain(|_, p| {
            let timeout = if p.data.is_master {
                master_timeout
            } else {
                node_timeout
            }
            .as_secs_f64();
            let expired = now < p.last_seen || now - p.last_seen > timeout;
            if expired {
                removed.push(p.clone());
            }
            !expired
        });
        removed
    }

    /// One linear pass computing the inputs to the election rule.
    /// Strict `>` throughout — ties never resolve on weight alone.
    pub async fn summary(&self, local_weight: f64) -> PeerSummary {
        let peers = self.peers.lock().await;
        let mut summary = PeerSummary::default();
        for p in peers.values() {
            if p.data.is_master {
                summary.masters_found += 1;
                if p.data.weight > local_weight {
                    summary.masters_higher_weight += 1;
                }
            } else if p.data.is_master_eligible && p.data.weight > local_weight {
                summary.any_eligible_higher_weight = true;
            }
        }
        summary
    }

    pub async fn snapshot(&self) -> Vec<PeerInfo> {
        self.peers.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.peers.lock().await.len()
    }
}

impl Default for PeerTable {
    fn default() -> Self {
        Self::new()
    }
}
