use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::Duration;

use lamport_ledger::ReplicaId;

use crate::errors::NodeError;

/// Replica addresses are derived from ids: `127.0.0.1:{base_port + id}`.
pub const DEFAULT_BASE_PORT: u16 = 50051;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub replica_id: ReplicaId,
    pub initial_balance: i64,
    pub bind_addr: SocketAddr,
    /// Static membership, self included. Iteration order is broadcast order.
    pub members: BTreeMap<ReplicaId, String>,
    pub broadcast: BroadcastPolicy,
    /// Upper bound on in-flight requests served by this replica.
    pub max_concurrent_requests: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            replica_id: ReplicaId(1),
            initial_balance: 0,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_BASE_PORT + 1)),
            members: BTreeMap::new(),
            broadcast: BroadcastPolicy::default(),
            max_concurrent_requests: 10,
        }
    }
}

impl NodeConfig {
    /// Members other than this replica, ascending by id.
    pub fn peers(&self) -> Vec<ReplicaId> {
        self.members
            .keys()
            .copied()
            .filter(|id| *id != self.replica_id)
            .collect()
    }
}

/// What a broadcast does once a peer has exhausted its attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnPeerFailure {
    /// Fail the in-flight operation. The local mutation stays applied.
    Abort,
    /// Log the peer as skipped and continue with the next one.
    SkipPeer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastPolicy {
    pub attempts: u32,
    pub backoff: Duration,
    pub call_timeout: Duration,
    pub on_exhausted: OnPeerFailure,
}

impl Default for BroadcastPolicy {
    fn default() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::from_millis(100),
            call_timeout: Duration::from_secs(5),
            on_exhausted: OnPeerFailure::Abort,
        }
    }
}

/// How a customer's clock moves once a replica has answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CustomerClockPolicy {
    /// +1 per request issued, replica clocks are ignored.
    #[default]
    Independent,
    /// Starts at 1. A request carries the current value unticked, then the
    /// replica's returned clock replaces it.
    AdoptReplica,
}

/// Base port 0 asks the OS for a free port per replica.
pub fn replica_addr(base_port: u16, id: ReplicaId) -> Result<SocketAddr, NodeError> {
    let port = if base_port == 0 {
        0
    } else {
        u16::try_from(id.0)
            .ok()
            .and_then(|offset| base_port.checked_add(offset))
            .ok_or_else(|| {
                NodeError::Scenario(format!("branch {} has no port above base {}", id, base_port))
            })?
    };
    Ok(SocketAddr::from(([127, 0, 0, 1], port)))
}

pub fn replica_url(addr: SocketAddr) -> String {
    format!("http://{addr}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replica_addr_offsets_base_port() {
        assert_eq!(replica_addr(50051, ReplicaId(2)).unwrap().port(), 50053);
        assert_eq!(replica_addr(0, ReplicaId(70000)).unwrap().port(), 0);
    }

    #[test]
    fn test_replica_addr_rejects_ports_out_of_range() {
        let err = replica_addr(50051, ReplicaId(70000)).unwrap_err();
        assert_eq!(err.kind(), "scenario");
        assert!(matches!(replica_addr(65530, ReplicaId(10)), Err(NodeError::Scenario(_))));
        assert!(replica_addr(65530, ReplicaId(5)).is_ok());
    }
}
