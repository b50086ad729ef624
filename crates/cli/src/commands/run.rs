use std::path::Path;
use std::time::Duration;

use clap::Args;
use ledger_node::api::ReplicaSnapshot;
use ledger_node::cluster::{HttpCluster, LocalCluster};
use ledger_node::config::{BroadcastPolicy, CustomerClockPolicy, OnPeerFailure, DEFAULT_BASE_PORT};
use ledger_node::runner::{drive_customers, CustomerRun};
use ledger_node::scenario::Scenario;

use crate::output::{verify_replicas, write_artifacts, Artifacts};

/// Knobs shared by `ledger run` and `ledger customers`.
#[derive(Args, Debug, Clone)]
pub struct RunOptions {
    /// Replica N listens on 127.0.0.1:{base_port + N}; 0 picks free ports.
    #[arg(long, default_value_t = DEFAULT_BASE_PORT)]
    pub base_port: u16,

    /// Run customers one record at a time, in file order.
    #[arg(long)]
    pub sequential: bool,

    /// Customers jump their clock forward to each replica answer.
    #[arg(long)]
    pub adopt_clock: bool,

    #[arg(long, default_value_t = 1)]
    pub attempts: u32,

    #[arg(long, default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Continue a broadcast past a peer that exhausted its attempts.
    #[arg(long)]
    pub skip_unreachable: bool,

    #[arg(long, default_value_t = 10)]
    pub workers: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            base_port: DEFAULT_BASE_PORT,
            sequential: false,
            adopt_clock: false,
            attempts: 1,
            timeout_ms: 5000,
            skip_unreachable: false,
            workers: 10,
        }
    }
}

impl RunOptions {
    pub fn broadcast_policy(&self) -> BroadcastPolicy {
        BroadcastPolicy {
            attempts: self.attempts.max(1),
            call_timeout: Duration::from_millis(self.timeout_ms),
            on_exhausted: if self.skip_unreachable {
                OnPeerFailure::SkipPeer
            } else {
                OnPeerFailure::Abort
            },
            ..BroadcastPolicy::default()
        }
    }

    pub fn clock_policy(&self) -> CustomerClockPolicy {
        if self.adopt_clock {
            CustomerClockPolicy::AdoptReplica
        } else {
            CustomerClockPolicy::Independent
        }
    }
}

/// Start every branch of the scenario, drive every customer, write the
/// artifacts into `out_dir`. With `verify`, fail unless the replicas agree.
pub async fn run(
    scenario_path: &Path,
    out_dir: &Path,
    in_process: bool,
    verify: bool,
    opts: &RunOptions,
) -> anyhow::Result<Artifacts> {
    let scenario = Scenario::load(scenario_path)?;
    let branches = scenario.branches();

    let (run, snapshots): (CustomerRun, Vec<ReplicaSnapshot>) = if in_process {
        let cluster = LocalCluster::start(&branches, opts.broadcast_policy()).await;
        let run = drive_customers(&scenario, cluster.transport(), opts.clock_policy(), opts.sequential).await?;
        (run, cluster.snapshots().await)
    } else {
        let cluster = HttpCluster::start(&branches, opts.base_port, opts.broadcast_policy(), opts.workers).await?;
        let run = drive_customers(&scenario, cluster.transport(), opts.clock_policy(), opts.sequential).await?;
        (run, cluster.snapshots().await?)
    };

    let artifacts = write_artifacts(out_dir, &run, &snapshots)?;
    println!("Wrote {}", artifacts.customer_output.display());
    println!("Trace fingerprint: {}", artifacts.trace.fingerprint_hex()?);

    if verify {
        verify_replicas(&snapshots)?;
        println!("✅ {} replicas agree on balance {}", snapshots.len(), snapshots.first().map(|s| s.state.balance).unwrap_or_default());
    }

    Ok(artifacts)
}
