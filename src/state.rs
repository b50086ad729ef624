// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Replica ledger state.
//!
//! Balance, clock and event log of one replica. Pure mutation rules; the owner
//! is responsible for serializing access (see `ledger-node`).

use crate::clock::LogicalClock;
use crate::error::{LedgerError, LedgerResult};
use crate::log::LogEntry;
use crate::types::{Interface, ReplicaId, RequestId};
use crate::wire::OpResult;

#[derive(Clone, Debug)]
pub struct LedgerState {
    replica_id: ReplicaId,
    balance: i64,
    clock: LogicalClock,
    event_log: Vec<LogEntry>,
}

impl LedgerState {
    pub fn new(replica_id: ReplicaId, balance: i64) -> Self {
        Self {
            replica_id,
            balance,
            clock: LogicalClock::new(),
            event_log: Vec::new(),
        }
    }

    // --- Read APIs ---

    pub fn replica_id(&self) -> ReplicaId {
        self.replica_id
    }

    pub fn current_balance(&self) -> i64 {
        self.balance
    }

    pub fn current_clock(&self) -> u64 {
        self.clock.current()
    }

    pub fn event_log(&self) -> &[LogEntry] {
        &self.event_log
    }

    // --- Clock ---

    pub fn tick(&mut self) -> u64 {
        self.clock.tick()
    }

    pub fn observe(&mut self, remote_clock: u64) -> u64 {
        self.clock.observe(remote_clock)
    }

    // --- Write Logic ---

    /// Balance a deposit of `amount` would leave, without applying it.
    pub fn deposited_balance(&self, amount: i64) -> LedgerResult<i64> {
        self.balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidAmount { interface: Interface::Deposit, amount })
    }

    /// Fails only when the new balance does not fit; the balance is then unchanged.
    pub fn apply_deposit(&mut self, amount: i64) -> LedgerResult<i64> {
        self.balance = self.deposited_balance(amount)?;
        Ok(self.balance)
    }

    /// All or nothing: an overdraft leaves the balance untouched.
    pub fn apply_withdraw(&mut self, amount: i64) -> OpResult {
        if self.balance >= amount {
            self.balance -= amount;
            OpResult::Success
        } else {
            OpResult::InsufficientFunds
        }
    }

    /// Last writer wins at the receiver; no version check.
    pub fn apply_propagated_balance(&mut self, new_balance: i64) {
        self.balance = new_balance;
    }

    pub fn record_event(&mut self, entry: LogEntry) {
        self.event_log.push(entry);
    }

    /// Record an entry stamped with the current clock.
    pub fn record(
        &mut self,
        customer_request_id: Option<RequestId>,
        interface: Interface,
        comment: impl Into<String>,
    ) -> u64 {
        let clock = self.current_clock();
        self.record_event(LogEntry::new(customer_request_id, clock, interface, comment));
        clock
    }
}
