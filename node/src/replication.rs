// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Broadcast of local writes to peer replicas.
//!
//! Peers are visited one at a time in ascending id order. For each peer the
//! local clock is ticked, the send is recorded in the event log, and the call
//! is awaited (under `BroadcastPolicy`) before the next peer is contacted, so
//! clock values are allocated one per peer in a fixed order.
//!
//! Every propagate message carries the balance captured right after the local
//! mutation, even if an inbound propagate lands between two sends.

use std::sync::Arc;
use std::time::Instant;

use lamport_ledger::{
    DeliveryRequest, DeliveryResponse, Envelope, EventSource, Interface, Operation, ReplicaId,
    RequestId,
};
use tokio::sync::Mutex;

use crate::config::{BroadcastPolicy, OnPeerFailure};
use crate::dispatcher::ReplicaCore;
use crate::errors::NodeError;
use crate::network::Transport;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: Vec<ReplicaId>,
    pub skipped: Vec<ReplicaId>,
}

pub struct ReplicationProtocol<T> {
    replica_id: ReplicaId,
    peers: Vec<ReplicaId>,
    transport: Arc<T>,
    policy: BroadcastPolicy,
}

impl<T: Transport> ReplicationProtocol<T> {
    pub fn new(
        replica_id: ReplicaId,
        mut peers: Vec<ReplicaId>,
        transport: Arc<T>,
        policy: BroadcastPolicy,
    ) -> Self {
        peers.sort();
        peers.dedup();
        peers.retain(|peer| *peer != replica_id);
        Self {
            replica_id,
            peers,
            transport,
            policy,
        }
    }

    pub fn peers(&self) -> &[ReplicaId] {
        &self.peers
    }

    pub fn policy(&self) -> &BroadcastPolicy {
        &self.policy
    }

    /// Fan `new_balance` out to every peer. With `OnPeerFailure::Abort` the
    /// first exhausted peer ends the broadcast with its error; peers after it
    /// are not contacted and the local balance stays mutated.
    pub async fn broadcast_after_mutation(
        &self,
        core: &Mutex<ReplicaCore>,
        customer_request_id: Option<&RequestId>,
        kind: Interface,
        new_balance: i64,
    ) -> Result<BroadcastReport, NodeError> {
        let started = Instant::now();
        let mut report = BroadcastReport::default();

        for &peer in &self.peers {
            let request = {
                let mut core = core.lock().await;
                let sender_clock = core.ledger.tick();
                core.ledger.record(
                    customer_request_id.cloned(),
                    kind,
                    format!("event_sent to branch {peer}"),
                );
                Envelope {
                    sender: EventSource::Branch(self.replica_id),
                    customer_request_id: customer_request_id.cloned(),
                    sender_clock,
                    operation: Operation::PropagateBalance { new_balance, kind },
                }
                .to_request()
            };

            match self.send_with_policy(peer, request).await {
                Ok(ack) => {
                    tracing::debug!(replica = %self.replica_id, %peer, ack_clock = ack.clock, "Propagated balance {}", new_balance);
                    metrics::increment_counter!("ledger_propagations_total", "outcome" => "delivered");
                    report.delivered.push(peer);
                }
                Err(err) => match self.policy.on_exhausted {
                    OnPeerFailure::Abort => {
                        metrics::increment_counter!("ledger_propagations_total", "outcome" => "aborted");
                        tracing::error!(
                            replica = %self.replica_id,
                            %peer,
                            delivered = ?report.delivered,
                            "Broadcast aborted, balance {} only partially propagated: {}",
                            new_balance,
                            err
                        );
                        return Err(err);
                    }
                    OnPeerFailure::SkipPeer => {
                        metrics::increment_counter!("ledger_propagations_total", "outcome" => "skipped");
                        tracing::warn!(replica = %self.replica_id, %peer, "Skipping peer: {}", err);
                        report.skipped.push(peer);
                    }
                },
            }
        }

        metrics::histogram!("ledger_broadcast_duration_seconds", started.elapsed().as_secs_f64());
        Ok(report)
    }

    /// One logical send: the same message is retried on connectivity errors
    /// until `attempts` is used up. Each attempt is bounded by `call_timeout`.
    async fn send_with_policy(
        &self,
        peer: ReplicaId,
        request: DeliveryRequest,
    ) -> Result<DeliveryResponse, NodeError> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(
                self.policy.call_timeout,
                self.transport.deliver(peer, request.clone()),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(NodeError::PeerTimeout {
                    peer,
                    after: self.policy.call_timeout,
                }),
            };

            match outcome {
                Ok(ack) => return Ok(ack),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    tracing::warn!(
                        replica = %self.replica_id,
                        %peer,
                        attempt,
                        "Propagate failed: {}. Retrying in {:?}",
                        err,
                        self.policy.backoff
                    );
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
