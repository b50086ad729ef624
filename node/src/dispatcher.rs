// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Message Dispatcher - the single inbound entry point of a replica
//!
//! For every message:
//! 1. Append the raw request to the receipt log (diagnostics only)
//! 2. Decode; malformed or unknown messages are rejected here, before the
//!    clock or balance is touched
//! 3. `observe(sender_clock)`, for every kind including queries
//! 4. Apply the operation and record a log entry
//! 5. For a successful local write, broadcast the new balance to every peer
//! 6. Answer with the fields meaningful for the kind
//!
//! # Locking
//! `core` guards balance, clock and both logs; it is never held across a call
//! to a peer. `write_gate` is held for the whole of a local write including
//! its broadcast, so local writes at one replica are serialized end to end and
//! their propagate messages reach each peer in order. Inbound propagates only
//! take `core`, which is why two replicas broadcasting to each other at the
//! same time cannot deadlock.

use std::sync::Arc;

use lamport_ledger::{
    DeliveryRequest, DeliveryResponse, Envelope, Interface, LedgerState, LogEntry, OpResult,
    Operation, ReplicaId, ReplicaLog,
};
use tokio::sync::Mutex;

use crate::api::{ReplicaSnapshot, StateResponse};
use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::network::Transport;
use crate::replication::ReplicationProtocol;

pub struct ReplicaCore {
    pub ledger: LedgerState,
    pub receipts: Vec<DeliveryRequest>,
}

pub type SharedDispatcher<T> = Arc<MessageDispatcher<T>>;

pub struct MessageDispatcher<T> {
    replica_id: ReplicaId,
    core: Mutex<ReplicaCore>,
    write_gate: Mutex<()>,
    replication: ReplicationProtocol<T>,
}

#[derive(Debug, Clone, Copy)]
enum LocalWrite {
    Deposit(i64),
    Withdraw(i64),
}

impl LocalWrite {
    fn interface(&self) -> Interface {
        match self {
            LocalWrite::Deposit(_) => Interface::Deposit,
            LocalWrite::Withdraw(_) => Interface::Withdraw,
        }
    }

    fn propagated(&self) -> Interface {
        match self {
            LocalWrite::Deposit(_) => Interface::PropagateDeposit,
            LocalWrite::Withdraw(_) => Interface::PropagateWithdraw,
        }
    }
}

impl<T: Transport> MessageDispatcher<T> {
    pub fn new(cfg: &NodeConfig, transport: Arc<T>) -> Self {
        Self {
            replica_id: cfg.replica_id,
            core: Mutex::new(ReplicaCore {
                ledger: LedgerState::new(cfg.replica_id, cfg.initial_balance),
                receipts: Vec::new(),
            }),
            write_gate: Mutex::new(()),
            replication: ReplicationProtocol::new(cfg.replica_id, cfg.peers(), transport, cfg.broadcast),
        }
    }

    pub fn replica_id(&self) -> ReplicaId {
        self.replica_id
    }

    pub fn replication(&self) -> &ReplicationProtocol<T> {
        &self.replication
    }

    pub async fn deliver(&self, request: DeliveryRequest) -> Result<DeliveryResponse, NodeError> {
        self.core.lock().await.receipts.push(request.clone());

        let envelope = match Envelope::decode(&request) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(replica = %self.replica_id, "Rejected message: {}", e);
                metrics::increment_counter!("ledger_rejected_total", "reason" => e.kind());
                return Err(e.into());
            }
        };

        let interface = envelope.operation.interface();
        metrics::increment_counter!("ledger_messages_total", "interface" => interface.as_str());
        tracing::debug!(
            replica = %self.replica_id,
            sender = %envelope.sender,
            clock = envelope.sender_clock,
            "Dispatching {}",
            interface
        );

        match &envelope.operation {
            Operation::Query => self.handle_query(&envelope).await,
            Operation::Deposit { amount } => {
                self.handle_local_write(&envelope, LocalWrite::Deposit(*amount)).await
            }
            Operation::Withdraw { amount } => {
                self.handle_local_write(&envelope, LocalWrite::Withdraw(*amount)).await
            }
            Operation::PropagateBalance { new_balance, kind } => {
                self.handle_propagate(&envelope, *new_balance, *kind).await
            }
        }
    }

    async fn handle_query(&self, envelope: &Envelope) -> Result<DeliveryResponse, NodeError> {
        let mut core = self.core.lock().await;
        let clock = core.ledger.observe(envelope.sender_clock);
        core.ledger.record(
            envelope.customer_request_id.clone(),
            Interface::Query,
            format!("event_recv from {}", envelope.sender),
        );

        Ok(DeliveryResponse {
            replica_id: Some(self.replica_id),
            customer_request_id: envelope.customer_request_id.clone(),
            balance: Some(core.ledger.current_balance()),
            result: None,
            clock,
        })
    }

    async fn handle_local_write(
        &self,
        envelope: &Envelope,
        write: LocalWrite,
    ) -> Result<DeliveryResponse, NodeError> {
        let _gate = self.write_gate.lock().await;

        let (result, new_balance) = {
            let mut core = self.core.lock().await;
            // an unrepresentable balance is rejected before the clock moves
            if let LocalWrite::Deposit(amount) = write {
                if let Err(e) = core.ledger.deposited_balance(amount) {
                    tracing::warn!(replica = %self.replica_id, "Rejected message: {}", e);
                    metrics::increment_counter!("ledger_rejected_total", "reason" => e.kind());
                    return Err(e.into());
                }
            }
            core.ledger.observe(envelope.sender_clock);
            let result = match write {
                LocalWrite::Deposit(amount) => {
                    core.ledger.apply_deposit(amount)?;
                    OpResult::Success
                }
                LocalWrite::Withdraw(amount) => core.ledger.apply_withdraw(amount),
            };
            core.ledger.record(
                envelope.customer_request_id.clone(),
                write.interface(),
                format!("event_recv from {}", envelope.sender),
            );
            (result, core.ledger.current_balance())
        };

        if result.is_success() {
            self.replication
                .broadcast_after_mutation(
                    &self.core,
                    envelope.customer_request_id.as_ref(),
                    write.propagated(),
                    new_balance,
                )
                .await?;
        } else {
            tracing::info!(replica = %self.replica_id, "Insufficient funds for {:?}; nothing to propagate", write);
        }

        let clock = self.core.lock().await.ledger.current_clock();
        Ok(DeliveryResponse {
            replica_id: Some(self.replica_id),
            customer_request_id: envelope.customer_request_id.clone(),
            balance: None,
            result: Some(result),
            clock,
        })
    }

    async fn handle_propagate(
        &self,
        envelope: &Envelope,
        new_balance: i64,
        kind: Interface,
    ) -> Result<DeliveryResponse, NodeError> {
        let mut core = self.core.lock().await;
        let clock = core.ledger.observe(envelope.sender_clock);
        core.ledger.apply_propagated_balance(new_balance);
        core.ledger.record(
            envelope.customer_request_id.clone(),
            kind,
            format!("event_recv from {}", envelope.sender),
        );

        Ok(DeliveryResponse {
            replica_id: Some(self.replica_id),
            customer_request_id: envelope.customer_request_id.clone(),
            balance: None,
            result: Some(OpResult::Success),
            clock,
        })
    }

    // --- Read APIs ---

    pub async fn state(&self) -> StateResponse {
        let core = self.core.lock().await;
        StateResponse {
            replica_id: self.replica_id,
            balance: core.ledger.current_balance(),
            clock: core.ledger.current_clock(),
        }
    }

    pub async fn event_log(&self) -> Vec<LogEntry> {
        self.core.lock().await.ledger.event_log().to_vec()
    }

    pub async fn receipts(&self) -> Vec<DeliveryRequest> {
        self.core.lock().await.receipts.clone()
    }

    pub async fn snapshot(&self) -> ReplicaSnapshot {
        let core = self.core.lock().await;
        ReplicaSnapshot {
            state: StateResponse {
                replica_id: self.replica_id,
                balance: core.ledger.current_balance(),
                clock: core.ledger.current_clock(),
            },
            log: ReplicaLog {
                replica_id: self.replica_id,
                entries: core.ledger.event_log().to_vec(),
            },
        }
    }
}
