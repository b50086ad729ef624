// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! lamport-ledger: the replica-independent core of a replicated account ledger.
//!
//! Everything in this crate is pure state and pure functions: Lamport clocks,
//! a single replica's balance and event log, the decoded operation language,
//! the JSON wire shapes, and the offline causal trace reconstruction. Networking
//! and scheduling live in `ledger-node`.

pub mod clock;
pub mod error;
pub mod types;
pub mod log;
pub mod operation;
pub mod wire;
pub mod state;
pub mod trace;

pub use clock::LogicalClock;
pub use error::{LedgerError, TraceError};
pub use log::LogEntry;
pub use operation::{Envelope, Operation};
pub use state::LedgerState;
pub use trace::{CausalTrace, CausalTraceBuilder, CustomerLog, ReplicaLog, RequestTrace, TraceEvent};
pub use types::{CustomerId, EventSource, Interface, RequestId, ReplicaId};
pub use wire::{DeliveryRequest, DeliveryResponse, OpResult};

#[cfg(test)]
pub mod tests;
