// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Event log entries.
//!
//! Replicas and customers each keep an append-only list of these. A log is the
//! owner's own processing order, not a global order; `trace` reconstructs the
//! latter offline.

use serde::{Deserialize, Serialize};

use crate::types::{Interface, RequestId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub customer_request_id: Option<RequestId>,
    /// Owner's clock at the moment the entry was recorded.
    pub logical_clock: u64,
    pub interface: Interface,
    /// Provenance, e.g. "event_recv from customer 1".
    pub comment: String,
}

impl LogEntry {
    pub fn new(
        customer_request_id: Option<RequestId>,
        logical_clock: u64,
        interface: Interface,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            customer_request_id,
            logical_clock,
            interface,
            comment: comment.into(),
        }
    }
}

/// True when every entry's clock is strictly greater than the one before it.
pub fn is_strictly_increasing(entries: &[LogEntry]) -> bool {
    entries
        .windows(2)
        .all(|w| w[0].logical_clock < w[1].logical_clock)
}
