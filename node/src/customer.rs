// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Customer sessions.
//!
//! A customer issues its requests, in order, to one home replica. The
//! customer's clock is its own: it ticks once per request and is never merged
//! with replica clocks unless `CustomerClockPolicy::AdoptReplica` is chosen.
//! Under that policy the clock starts at 1, a request carries the current
//! value unticked, and the replica's returned clock replaces it.
//!
//! Sessions are resumable. `run()` only processes requests appended since the
//! previous run. A request the home replica fails to serve yields a receipt
//! carrying the error, and the session moves on to the next request.

use std::sync::Arc;

use lamport_ledger::{
    CustomerId, CustomerLog, Envelope, EventSource, Interface, LogEntry, LogicalClock, OpResult,
    Operation, ReplicaId, RequestId,
};
use serde::{Deserialize, Serialize};

use crate::api::ErrorBody;
use crate::config::CustomerClockPolicy;
use crate::network::Transport;

/// One request a customer intends to issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerEvent {
    pub id: RequestId,
    pub operation: Operation,
}

impl CustomerEvent {
    pub fn deposit(id: impl Into<String>, amount: i64) -> Self {
        Self { id: RequestId::new(id), operation: Operation::Deposit { amount } }
    }

    pub fn withdraw(id: impl Into<String>, amount: i64) -> Self {
        Self { id: RequestId::new(id), operation: Operation::Withdraw { amount } }
    }

    pub fn query(id: impl Into<String>) -> Self {
        Self { id: RequestId::new(id), operation: Operation::Query }
    }
}

/// What a customer saw for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerReceipt {
    pub interface: Interface,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<OpResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<i64>,
    /// The customer's own clock for the request, not the replica's.
    pub clock: u64,
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerOutput {
    pub id: CustomerId,
    pub recv: Vec<CustomerReceipt>,
}

pub struct CustomerSession<T> {
    customer_id: CustomerId,
    home: ReplicaId,
    clock: LogicalClock,
    policy: CustomerClockPolicy,
    requests: Vec<CustomerEvent>,
    // high-water mark: requests[..next] have been issued
    next: usize,
    events: Vec<LogEntry>,
    transport: Arc<T>,
}

impl<T: Transport> CustomerSession<T> {
    pub fn new(
        customer_id: CustomerId,
        home: ReplicaId,
        transport: Arc<T>,
        policy: CustomerClockPolicy,
    ) -> Self {
        let clock = match policy {
            CustomerClockPolicy::Independent => LogicalClock::new(),
            CustomerClockPolicy::AdoptReplica => LogicalClock::starting_at(1),
        };
        Self {
            customer_id,
            home,
            clock,
            policy,
            requests: Vec::new(),
            next: 0,
            events: Vec::new(),
            transport,
        }
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn home(&self) -> ReplicaId {
        self.home
    }

    pub fn current_clock(&self) -> u64 {
        self.clock.current()
    }

    pub fn append_requests(&mut self, requests: impl IntoIterator<Item = CustomerEvent>) {
        self.requests.extend(requests);
    }

    pub fn pending(&self) -> usize {
        self.requests.len() - self.next
    }

    /// Issue every request not yet issued. A request that fails is not retried
    /// by a later `run()`; its receipt carries the error instead of a result.
    pub async fn run(&mut self) -> CustomerOutput {
        let mut output = CustomerOutput {
            id: self.customer_id,
            recv: Vec::with_capacity(self.pending()),
        };

        while self.next < self.requests.len() {
            let event = self.requests[self.next].clone();
            self.next += 1;

            let interface = event.operation.interface();
            let clock = match self.policy {
                CustomerClockPolicy::Independent => self.clock.tick(),
                CustomerClockPolicy::AdoptReplica => self.clock.current(),
            };
            let comment = format!("event_sent from customer {}", self.customer_id);
            self.events.push(LogEntry::new(Some(event.id.clone()), clock, interface, comment.clone()));

            let request = Envelope {
                sender: EventSource::Customer(self.customer_id),
                customer_request_id: Some(event.id.clone()),
                sender_clock: clock,
                operation: event.operation,
            }
            .to_request();

            tracing::debug!(customer = %self.customer_id, home = %self.home, clock, "Sending {} {}", interface, event.id);
            let receipt = match self.transport.deliver(self.home, request).await {
                Ok(response) => {
                    if self.policy == CustomerClockPolicy::AdoptReplica {
                        self.clock = LogicalClock::starting_at(response.clock);
                    }
                    CustomerReceipt {
                        interface,
                        result: response.result,
                        balance: response.balance,
                        clock,
                        comment,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::warn!(customer = %self.customer_id, home = %self.home, "{} {} failed: {}", interface, event.id, e);
                    CustomerReceipt {
                        interface,
                        result: None,
                        balance: None,
                        clock,
                        comment,
                        error: Some(e.body()),
                    }
                }
            };
            output.recv.push(receipt);
        }

        output
    }

    pub fn event_log(&self) -> &[LogEntry] {
        &self.events
    }

    pub fn customer_log(&self) -> CustomerLog {
        CustomerLog {
            customer_id: self.customer_id,
            entries: self.events.clone(),
        }
    }
}
