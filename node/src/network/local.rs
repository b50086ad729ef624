use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use lamport_ledger::{DeliveryRequest, DeliveryResponse, ReplicaId};
use tokio::sync::RwLock;

use crate::dispatcher::MessageDispatcher;
use crate::errors::NodeError;
use crate::network::Transport;

/// Failure modes `LocalTransport` can simulate for a replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Calls fail immediately, as if the connection was refused.
    Unreachable,
    /// Calls never complete.
    Stalled,
}

#[derive(Default)]
struct Routes {
    dispatchers: BTreeMap<ReplicaId, Weak<MessageDispatcher<LocalTransport>>>,
    faults: BTreeMap<ReplicaId, Fault>,
}

/// In-process transport: calls go straight to the target's dispatcher.
/// Holds weak references, so the owner of the dispatchers controls their lifetime.
#[derive(Clone, Default)]
pub struct LocalTransport {
    routes: Arc<RwLock<Routes>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, dispatcher: &Arc<MessageDispatcher<LocalTransport>>) {
        let mut routes = self.routes.write().await;
        routes
            .dispatchers
            .insert(dispatcher.replica_id(), Arc::downgrade(dispatcher));
    }

    pub async fn inject_fault(&self, target: ReplicaId, fault: Fault) {
        self.routes.write().await.faults.insert(target, fault);
    }

    pub async fn heal(&self, target: ReplicaId) {
        self.routes.write().await.faults.remove(&target);
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn deliver(
        &self,
        target: ReplicaId,
        request: DeliveryRequest,
    ) -> Result<DeliveryResponse, NodeError> {
        let (route, fault) = {
            let routes = self.routes.read().await;
            (
                routes.dispatchers.get(&target).cloned(),
                routes.faults.get(&target).copied(),
            )
        };

        match fault {
            Some(Fault::Unreachable) => {
                return Err(NodeError::PeerUnreachable {
                    peer: target,
                    reason: "connection refused (injected)".to_string(),
                })
            }
            Some(Fault::Stalled) => return std::future::pending().await,
            None => {}
        }

        let dispatcher = route
            .ok_or(NodeError::UnknownPeer(target))?
            .upgrade()
            .ok_or_else(|| NodeError::PeerUnreachable {
                peer: target,
                reason: "replica shut down".to_string(),
            })?;
        dispatcher.deliver(request).await
    }
}
