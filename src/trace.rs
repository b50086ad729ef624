// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Causal trace reconstruction.
//!
//! Offline merge of every replica's and every customer's event log into one
//! sequence per customer request:
//!
//! 1. entries are grouped by `customer_request_id`;
//! 2. inside a group the customer's own entry comes first, then replica entries
//!    by `logical_clock` ascending; equal clocks keep replica declaration order,
//!    then log order;
//! 3. groups are laid out in the order the customer issued them, giving one flat
//!    trace per customer, and customers in input order give the overall trace.
//!
//! Requests that replicas recorded but no collected customer issued (a customer
//! log that was not gathered, or a client outside the scenario) still form a
//! group, without a customer entry, in `CausalTrace::unattributed`. They follow
//! the customers, in the order their first entry appears in the replica logs.
//!
//! Pure function of its input: no I/O, deterministic. Entries without a request
//! id cannot be grouped and are rejected instead of dropped.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::TraceError;
use crate::log::LogEntry;
use crate::types::{CustomerId, EventSource, ReplicaId, RequestId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaLog {
    pub replica_id: ReplicaId,
    pub entries: Vec<LogEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerLog {
    pub customer_id: CustomerId,
    pub entries: Vec<LogEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub source: EventSource,
    pub entry: LogEntry,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTrace {
    pub request_id: RequestId,
    pub events: Vec<TraceEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerTrace {
    pub customer_id: CustomerId,
    pub requests: Vec<RequestTrace>,
}

impl CustomerTrace {
    pub fn events(&self) -> impl Iterator<Item = &TraceEvent> {
        self.requests.iter().flat_map(|r| r.events.iter())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CausalTrace {
    pub customers: Vec<CustomerTrace>,
    /// Replica-only groups: requests no collected customer log issued.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unattributed: Vec<RequestTrace>,
}

impl CausalTrace {
    pub fn requests(&self) -> impl Iterator<Item = &RequestTrace> {
        self.customers
            .iter()
            .flat_map(|c| c.requests.iter())
            .chain(self.unattributed.iter())
    }

    fn events(&self) -> impl Iterator<Item = &TraceEvent> {
        self.requests().flat_map(|r| r.events.iter())
    }

    pub fn request(&self, request_id: &str) -> Option<&RequestTrace> {
        self.requests().find(|r| r.request_id.as_str() == request_id)
    }

    /// All customers' traces, one after the other, then the unattributed groups.
    pub fn flatten(&self) -> Vec<TraceEvent> {
        self.events().cloned().collect()
    }

    /// BLAKE3 over the canonical bincode encoding of the flattened trace.
    pub fn fingerprint(&self) -> Result<[u8; 32], TraceError> {
        let rows: Vec<(u8, u32, Option<&str>, u64, &str, &str)> = self
            .events()
            .map(|event| {
                let (kind, id) = match event.source {
                    EventSource::Branch(id) => (0u8, id.0),
                    EventSource::Customer(id) => (1u8, id.0),
                };
                (
                    kind,
                    id,
                    event.entry.customer_request_id.as_ref().map(RequestId::as_str),
                    event.entry.logical_clock,
                    event.entry.interface.as_str(),
                    event.entry.comment.as_str(),
                )
            })
            .collect();

        let bytes = bincode::serde::encode_to_vec(&rows, bincode::config::standard())
            .map_err(|e| TraceError::Encoding(e.to_string()))?;
        Ok(*blake3::hash(&bytes).as_bytes())
    }

    pub fn fingerprint_hex(&self) -> Result<String, TraceError> {
        let digest = self.fingerprint()?;
        Ok(blake3::Hash::from(digest).to_hex().to_string())
    }
}

struct Slot {
    request_id: RequestId,
    /// `None` for a request only replicas recorded.
    issued: Option<TraceEvent>,
    // (clock, replica declaration index, event); pushed in log order
    downstream: Vec<(u64, usize, TraceEvent)>,
}

pub struct CausalTraceBuilder<'a> {
    replicas: &'a [ReplicaLog],
    customers: &'a [CustomerLog],
}

impl<'a> CausalTraceBuilder<'a> {
    /// `replicas` order is the declaration order used to break clock ties.
    pub fn new(replicas: &'a [ReplicaLog], customers: &'a [CustomerLog]) -> Self {
        Self { replicas, customers }
    }

    pub fn build(&self) -> Result<CausalTrace, TraceError> {
        let mut index: FxHashMap<&'a str, usize> = FxHashMap::default();
        let mut slots: Vec<Slot> = Vec::new();
        let mut issued_by: Vec<Vec<usize>> = Vec::with_capacity(self.customers.len());

        for log in self.customers {
            let source = EventSource::Customer(log.customer_id);
            let mut issued = Vec::with_capacity(log.entries.len());
            for (position, entry) in log.entries.iter().enumerate() {
                let request_id = entry.customer_request_id.as_ref().ok_or_else(|| {
                    TraceError::MissingRequestId {
                        source_name: source.to_string(),
                        position,
                    }
                })?;
                if index.insert(request_id.as_str(), slots.len()).is_some() {
                    return Err(TraceError::DuplicateRequest(request_id.0.clone()));
                }
                issued.push(slots.len());
                slots.push(Slot {
                    request_id: request_id.clone(),
                    issued: Some(TraceEvent { source, entry: entry.clone() }),
                    downstream: Vec::new(),
                });
            }
            issued_by.push(issued);
        }

        let mut unattributed: Vec<usize> = Vec::new();
        for (declared, log) in self.replicas.iter().enumerate() {
            let source = EventSource::Branch(log.replica_id);
            for (position, entry) in log.entries.iter().enumerate() {
                let request_id = entry.customer_request_id.as_ref().ok_or_else(|| {
                    TraceError::MissingRequestId {
                        source_name: source.to_string(),
                        position,
                    }
                })?;
                let slot = match index.get(request_id.as_str()) {
                    Some(&slot) => slot,
                    None => {
                        index.insert(request_id.as_str(), slots.len());
                        unattributed.push(slots.len());
                        slots.push(Slot {
                            request_id: request_id.clone(),
                            issued: None,
                            downstream: Vec::new(),
                        });
                        slots.len() - 1
                    }
                };
                slots[slot].downstream.push((
                    entry.logical_clock,
                    declared,
                    TraceEvent { source, entry: entry.clone() },
                ));
            }
        }

        let mut groups: Vec<Option<RequestTrace>> = slots
            .into_iter()
            .map(|mut slot| {
                // stable: equal (clock, replica) keep log order
                slot.downstream.sort_by_key(|(clock, declared, _)| (*clock, *declared));
                let mut events = Vec::with_capacity(slot.downstream.len() + 1);
                events.extend(slot.issued);
                events.extend(slot.downstream.into_iter().map(|(_, _, event)| event));
                Some(RequestTrace {
                    request_id: slot.request_id,
                    events,
                })
            })
            .collect();

        let customers = self
            .customers
            .iter()
            .zip(issued_by)
            .map(|(log, issued)| CustomerTrace {
                customer_id: log.customer_id,
                requests: issued
                    .into_iter()
                    .filter_map(|slot| groups[slot].take())
                    .collect(),
            })
            .collect();

        let unattributed = unattributed
            .into_iter()
            .filter_map(|slot| groups[slot].take())
            .collect();

        Ok(CausalTrace { customers, unattributed })
    }
}
