// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Lamport logical clock.
//!
//! Send rule: `tick()` once per outbound message, so a fan-out to N peers
//! consumes N consecutive values. Receive rule: `observe(remote)` exactly once
//! per inbound message, before anything else looks at the message.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalClock(u64);

impl LogicalClock {
    pub const fn new() -> Self {
        LogicalClock(0)
    }

    pub const fn starting_at(value: u64) -> Self {
        LogicalClock(value)
    }

    pub fn current(&self) -> u64 {
        self.0
    }

    /// Advance by one ahead of a send; returns the stamp for that message.
    pub fn tick(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    /// `clock = max(clock, remote) + 1`
    pub fn observe(&mut self, remote: u64) -> u64 {
        self.0 = self.0.max(remote) + 1;
        self.0
    }
}
