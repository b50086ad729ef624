// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ledger_node::cluster::{run_replica, HttpCluster};
use ledger_node::config::{
    replica_addr, replica_url, BroadcastPolicy, NodeConfig, OnPeerFailure, DEFAULT_BASE_PORT,
};
use ledger_node::errors::NodeError;
use ledger_node::scenario::Scenario;
use ledger_node::telemetry;
use lamport_ledger::ReplicaId;

/// Serve the replicas declared in a scenario file.
#[derive(Parser, Debug)]
#[command(name = "ledger-node")]
struct Args {
    /// Scenario JSON; only its branch records are used here.
    scenario: PathBuf,

    /// Replica N listens on 127.0.0.1:{base_port + N}.
    #[arg(long, default_value_t = DEFAULT_BASE_PORT)]
    base_port: u16,

    /// Serve only this replica; peers are expected at their derived addresses.
    #[arg(long)]
    replica: Option<u32>,

    /// Tries per peer call during a broadcast.
    #[arg(long, default_value_t = 1)]
    attempts: u32,

    #[arg(long, default_value_t = 100)]
    backoff_ms: u64,

    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    /// Continue a broadcast past a peer that exhausted its attempts.
    #[arg(long)]
    skip_unreachable: bool,

    /// Concurrent requests served per replica.
    #[arg(long, default_value_t = 10)]
    workers: usize,
}

impl Args {
    fn policy(&self) -> BroadcastPolicy {
        BroadcastPolicy {
            attempts: self.attempts.max(1),
            backoff: Duration::from_millis(self.backoff_ms),
            call_timeout: Duration::from_millis(self.timeout_ms),
            on_exhausted: if self.skip_unreachable {
                OnPeerFailure::SkipPeer
            } else {
                OnPeerFailure::Abort
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), NodeError> {
    telemetry::init_telemetry()?;

    let args = Args::parse();
    let scenario = Scenario::load(&args.scenario)?;
    let branches = scenario.branches();

    match args.replica {
        Some(id) => {
            if args.base_port == 0 {
                return Err(NodeError::Scenario("--replica needs a fixed --base-port".into()));
            }
            let branch = branches
                .iter()
                .find(|b| b.id == ReplicaId(id))
                .ok_or_else(|| NodeError::Scenario(format!("branch {} not in scenario", id)))?;
            let members: BTreeMap<ReplicaId, String> = branches
                .iter()
                .map(|b| Ok((b.id, replica_url(replica_addr(args.base_port, b.id)?))))
                .collect::<Result<_, NodeError>>()?;
            let cfg = NodeConfig {
                replica_id: branch.id,
                initial_balance: branch.balance,
                bind_addr: replica_addr(args.base_port, branch.id)?,
                members,
                broadcast: args.policy(),
                max_concurrent_requests: args.workers,
            };
            tracing::info!("Initializing replica with config: {:?}", cfg);
            run_replica(cfg).await
        }
        None => {
            let cluster = HttpCluster::start(&branches, args.base_port, args.policy(), args.workers).await?;
            tracing::info!(members = ?cluster.members(), "Serving {} replicas", branches.len());
            cluster.wait().await
        }
    }
}
