// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::LedgerError;
use crate::log::is_strictly_increasing;
use crate::state::LedgerState;
use crate::types::{Interface, ReplicaId, RequestId};
use crate::wire::OpResult;

#[test]
fn test_balance_is_initial_plus_net_applied_changes() {
    let mut ledger = LedgerState::new(ReplicaId(1), 100);
    // (is_deposit, amount)
    let ops = [(true, 50), (false, 120), (false, 500), (true, 5), (false, 35), (false, 1)];

    let mut expected = 100i64;
    for (is_deposit, amount) in ops {
        if is_deposit {
            ledger.apply_deposit(amount).unwrap();
            expected += amount;
        } else if ledger.apply_withdraw(amount) == OpResult::Success {
            expected -= amount;
        }
    }

    assert_eq!(ledger.current_balance(), expected);
    assert_eq!(expected, 0);
}

#[test]
fn test_overdraft_leaves_balance_unchanged() {
    let mut ledger = LedgerState::new(ReplicaId(1), 100);
    assert_eq!(ledger.apply_withdraw(150), OpResult::InsufficientFunds);
    assert_eq!(ledger.current_balance(), 100);

    assert_eq!(ledger.apply_withdraw(100), OpResult::Success);
    assert_eq!(ledger.current_balance(), 0);
}

#[test]
fn test_deposit_overflow_rejected_without_change() {
    let mut ledger = LedgerState::new(ReplicaId(1), 100);
    let err = ledger.apply_deposit(i64::MAX).unwrap_err();
    assert_eq!(err, LedgerError::InvalidAmount { interface: Interface::Deposit, amount: i64::MAX });
    assert_eq!(ledger.current_balance(), 100);

    assert_eq!(ledger.deposited_balance(i64::MAX - 100), Ok(i64::MAX));
    assert_eq!(ledger.apply_deposit(1), Ok(101));
}

#[test]
fn test_propagated_balance_overwrites() {
    let mut ledger = LedgerState::new(ReplicaId(2), 100);
    ledger.apply_deposit(10).unwrap();
    ledger.apply_propagated_balance(40);
    assert_eq!(ledger.current_balance(), 40);
}

#[test]
fn test_record_stamps_current_clock_and_appends() {
    let mut ledger = LedgerState::new(ReplicaId(1), 0);
    let r1 = Some(RequestId::new("r1"));

    ledger.observe(3);
    assert_eq!(ledger.record(r1.clone(), Interface::Deposit, "event_recv from customer 1"), 4);
    ledger.tick();
    ledger.record(r1.clone(), Interface::PropagateDeposit, "event_sent to branch 2");
    ledger.tick();
    ledger.record(r1, Interface::PropagateDeposit, "event_sent to branch 3");

    let clocks: Vec<u64> = ledger.event_log().iter().map(|e| e.logical_clock).collect();
    assert_eq!(clocks, vec![4, 5, 6]);
    assert!(is_strictly_increasing(ledger.event_log()));
    assert_eq!(ledger.event_log()[0].comment, "event_recv from customer 1");
}
