use std::time::Duration;

use lamport_ledger::{CustomerId, OpResult, ReplicaId};
use ledger_node::cluster::LocalCluster;
use ledger_node::config::{BroadcastPolicy, CustomerClockPolicy, OnPeerFailure};
use ledger_node::customer::{CustomerEvent, CustomerReceipt, CustomerSession};
use ledger_node::network::local::Fault;
use ledger_node::scenario::BranchSpec;

fn three_branches() -> Vec<BranchSpec> {
    (1..=3).map(|id| BranchSpec { id: ReplicaId(id), balance: 100 }).collect()
}

fn balances(snapshots: &[ledger_node::api::ReplicaSnapshot]) -> Vec<i64> {
    snapshots.iter().map(|s| s.state.balance).collect()
}

async fn run_at_r1(cluster: &LocalCluster, events: Vec<CustomerEvent>) -> (Vec<CustomerReceipt>, usize) {
    let mut customer = CustomerSession::new(
        CustomerId(1),
        ReplicaId(1),
        cluster.transport(),
        CustomerClockPolicy::Independent,
    );
    customer.append_requests(events);
    let output = customer.run().await;
    assert_eq!(customer.event_log().len(), output.recv.len());
    (output.recv, customer.pending())
}

async fn deposit_at_r1(cluster: &LocalCluster) -> CustomerReceipt {
    let (mut receipts, _) = run_at_r1(cluster, vec![CustomerEvent::deposit("1", 50)]).await;
    assert_eq!(receipts.len(), 1);
    receipts.remove(0)
}

#[tokio::test]
async fn test_peers_exclude_self() {
    let cluster = LocalCluster::start(&three_branches(), BroadcastPolicy::default()).await;
    let r2 = cluster.dispatcher(ReplicaId(2)).unwrap();
    assert_eq!(r2.replication().peers(), &[ReplicaId(1), ReplicaId(3)]);
}

#[tokio::test]
async fn test_abort_stops_at_unreachable_peer() {
    let cluster = LocalCluster::start(&three_branches(), BroadcastPolicy::default()).await;
    cluster.transport().inject_fault(ReplicaId(3), Fault::Unreachable).await;

    let receipt = deposit_at_r1(&cluster).await;
    assert_eq!(receipt.result, None);
    let err = receipt.error.unwrap();
    assert_eq!(err.kind, "peer-unreachable");
    assert!(err.error.contains("Replica 3"), "{}", err.error);

    // Local mutation and the earlier peer stay applied.
    let snapshots = cluster.snapshots().await;
    assert_eq!(balances(&snapshots), vec![150, 150, 100]);
    assert_eq!(snapshots[0].log.entries.len(), 3);
    assert!(snapshots[2].log.entries.is_empty());
}

#[tokio::test]
async fn test_skip_peer_completes_the_broadcast() {
    let policy = BroadcastPolicy {
        on_exhausted: OnPeerFailure::SkipPeer,
        ..BroadcastPolicy::default()
    };
    let cluster = LocalCluster::start(&three_branches(), policy).await;
    cluster.transport().inject_fault(ReplicaId(2), Fault::Unreachable).await;

    let receipt = deposit_at_r1(&cluster).await;
    assert_eq!(receipt.result, Some(OpResult::Success));
    assert_eq!(receipt.error, None);

    let snapshots = cluster.snapshots().await;
    assert_eq!(balances(&snapshots), vec![150, 100, 150]);
}

#[tokio::test]
async fn test_stalled_peer_times_out() {
    let policy = BroadcastPolicy {
        attempts: 2,
        backoff: Duration::from_millis(10),
        call_timeout: Duration::from_millis(50),
        on_exhausted: OnPeerFailure::Abort,
    };
    let cluster = LocalCluster::start(&three_branches(), policy).await;
    cluster.transport().inject_fault(ReplicaId(2), Fault::Stalled).await;

    let err = deposit_at_r1(&cluster).await.error.unwrap();
    assert_eq!(err.kind, "peer-timeout");
    assert!(err.error.contains("Replica 2"), "{}", err.error);
    assert_eq!(balances(&cluster.snapshots().await), vec![150, 100, 100]);
}

#[tokio::test]
async fn test_retry_resends_the_same_message() {
    let policy = BroadcastPolicy {
        attempts: 3,
        backoff: Duration::from_millis(200),
        call_timeout: Duration::from_secs(1),
        on_exhausted: OnPeerFailure::Abort,
    };
    let cluster = LocalCluster::start(&three_branches(), policy).await;
    let transport = cluster.transport();
    transport.inject_fault(ReplicaId(2), Fault::Unreachable).await;

    let healer = transport.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        healer.heal(ReplicaId(2)).await;
    });

    assert_eq!(deposit_at_r1(&cluster).await.error, None);

    let snapshots = cluster.snapshots().await;
    assert_eq!(balances(&snapshots), vec![150, 150, 150]);
    // One send entry per peer however many attempts it took.
    assert_eq!(snapshots[0].log.entries.len(), 3);
    assert_eq!(snapshots[1].log.entries.len(), 1);
    assert_eq!(snapshots[1].log.entries[0].logical_clock, 4);
}

#[tokio::test]
async fn test_failed_deposit_keeps_earlier_receipts() {
    let cluster = LocalCluster::start(&three_branches(), BroadcastPolicy::default()).await;
    cluster.transport().inject_fault(ReplicaId(2), Fault::Unreachable).await;

    let (receipts, pending) = run_at_r1(
        &cluster,
        vec![
            CustomerEvent::query("q1"),
            CustomerEvent::deposit("d1", 50),
            CustomerEvent::query("q2"),
        ],
    )
    .await;

    assert_eq!(pending, 0);
    assert_eq!(receipts.len(), 3);
    assert_eq!(receipts[0].balance, Some(100));
    assert_eq!(receipts[0].error, None);

    assert_eq!(receipts[1].result, None);
    assert_eq!(receipts[1].error.as_ref().map(|e| e.kind.as_str()), Some("peer-unreachable"));
    assert_eq!(receipts[1].clock, 2);

    // The home replica applied the deposit before its broadcast gave up.
    assert_eq!(receipts[2].balance, Some(150));
    assert_eq!(receipts[2].clock, 3);
}
