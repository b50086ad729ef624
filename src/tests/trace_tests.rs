// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::TraceError;
use crate::log::LogEntry;
use crate::trace::{CausalTraceBuilder, CustomerLog, ReplicaLog};
use crate::types::{CustomerId, EventSource, Interface, ReplicaId, RequestId};

fn entry(request: &str, clock: u64, interface: Interface, comment: &str) -> LogEntry {
    LogEntry::new(Some(RequestId::new(request)), clock, interface, comment)
}

/// Customer 1 deposits at replica 1, which fans out to replicas 2 and 3.
fn deposit_fanout() -> (Vec<ReplicaLog>, Vec<CustomerLog>) {
    let replicas = vec![
        ReplicaLog {
            replica_id: ReplicaId(1),
            entries: vec![
                entry("r1", 2, Interface::Deposit, "event_recv from customer 1"),
                entry("r1", 3, Interface::PropagateDeposit, "event_sent to branch 2"),
                entry("r1", 4, Interface::PropagateDeposit, "event_sent to branch 3"),
            ],
        },
        ReplicaLog {
            replica_id: ReplicaId(2),
            entries: vec![entry("r1", 4, Interface::PropagateDeposit, "event_recv from branch 1")],
        },
        ReplicaLog {
            replica_id: ReplicaId(3),
            entries: vec![entry("r1", 5, Interface::PropagateDeposit, "event_recv from branch 1")],
        },
    ];
    let customers = vec![CustomerLog {
        customer_id: CustomerId(1),
        entries: vec![entry("r1", 1, Interface::Deposit, "event_sent from customer 1")],
    }];
    (replicas, customers)
}

#[test]
fn test_deposit_fanout_trace() {
    let (replicas, customers) = deposit_fanout();
    let trace = CausalTraceBuilder::new(&replicas, &customers).build().unwrap();

    let request = trace.request("r1").unwrap();
    assert_eq!(request.events.len(), 6);
    assert_eq!(request.events[0].source, EventSource::Customer(CustomerId(1)));

    let replica_clocks: Vec<u64> = request.events[1..].iter().map(|e| e.entry.logical_clock).collect();
    assert_eq!(replica_clocks, vec![2, 3, 4, 4, 5]);

    // clock 4 is shared by replica 1's second send and replica 2's receipt
    assert_eq!(request.events[3].source, EventSource::Branch(ReplicaId(1)));
    assert_eq!(request.events[4].source, EventSource::Branch(ReplicaId(2)));
}

#[test]
fn test_equal_clocks_follow_declaration_order() {
    let (mut replicas, customers) = deposit_fanout();
    replicas.swap(0, 1);
    let trace = CausalTraceBuilder::new(&replicas, &customers).build().unwrap();

    let request = trace.request("r1").unwrap();
    assert_eq!(request.events[3].source, EventSource::Branch(ReplicaId(2)));
    assert_eq!(request.events[4].source, EventSource::Branch(ReplicaId(1)));
}

#[test]
fn test_rebuilding_is_idempotent() {
    let (replicas, customers) = deposit_fanout();
    let first = CausalTraceBuilder::new(&replicas, &customers).build().unwrap();
    let second = CausalTraceBuilder::new(&replicas, &customers).build().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
    assert_eq!(first.fingerprint_hex().unwrap().len(), 64);
}

#[test]
fn test_customer_trace_follows_issue_order() {
    let (mut replicas, mut customers) = deposit_fanout();
    // second request, a query that only touches the home replica
    customers[0]
        .entries
        .push(entry("r2", 2, Interface::Query, "event_sent from customer 1"));
    replicas[0]
        .entries
        .push(entry("r2", 5, Interface::Query, "event_recv from customer 1"));
    customers.push(CustomerLog {
        customer_id: CustomerId(2),
        entries: vec![entry("q9", 1, Interface::Query, "event_sent from customer 2")],
    });
    replicas[1]
        .entries
        .push(entry("q9", 5, Interface::Query, "event_recv from customer 2"));

    let trace = CausalTraceBuilder::new(&replicas, &customers).build().unwrap();
    assert_eq!(trace.customers.len(), 2);

    let ids: Vec<&str> = trace.customers[0].requests.iter().map(|r| r.request_id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "r2"]);
    assert_eq!(trace.customers[0].events().count(), 8);

    let flat = trace.flatten();
    assert_eq!(flat.len(), 10);
    assert_eq!(flat[8].source, EventSource::Customer(CustomerId(2)));
    assert_eq!(flat[9].source, EventSource::Branch(ReplicaId(2)));
}

#[test]
fn test_missing_request_id_rejected() {
    let (mut replicas, customers) = deposit_fanout();
    replicas[2].entries[0].customer_request_id = None;

    let err = CausalTraceBuilder::new(&replicas, &customers).build().unwrap_err();
    assert_eq!(
        err,
        TraceError::MissingRequestId { source_name: "branch 3".into(), position: 0 }
    );
}

#[test]
fn test_request_without_customer_entry_forms_replica_only_group() {
    let (mut replicas, customers) = deposit_fanout();
    // a query from a client whose log was not collected
    replicas[1].entries.push(entry("zz", 9, Interface::Query, "event_recv from customer 7"));
    replicas[0].entries.push(entry("zz", 6, Interface::Query, "event_recv from customer 7"));

    let trace = CausalTraceBuilder::new(&replicas, &customers).build().unwrap();
    assert_eq!(trace.customers[0].requests.len(), 1);
    assert_eq!(trace.unattributed.len(), 1);

    let group = trace.request("zz").unwrap();
    let sources: Vec<EventSource> = group.events.iter().map(|e| e.source).collect();
    assert_eq!(sources, vec![EventSource::Branch(ReplicaId(1)), EventSource::Branch(ReplicaId(2))]);
    assert_eq!(trace.flatten().len(), 8);
    assert_eq!(trace.flatten()[7].entry.logical_clock, 9);
}

#[test]
fn test_duplicate_request_rejected() {
    let (replicas, mut customers) = deposit_fanout();
    customers[0].entries.push(entry("r1", 3, Interface::Query, "event_sent from customer 1"));
    let err = CausalTraceBuilder::new(&replicas, &customers).build().unwrap_err();
    assert_eq!(err, TraceError::DuplicateRequest("r1".into()));
}
