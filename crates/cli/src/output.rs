//! Files written after a run, and the checks `--verify` applies to a cluster.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use lamport_ledger::log::is_strictly_increasing;
use lamport_ledger::{CausalTrace, CausalTraceBuilder, CustomerLog, ReplicaLog};
use ledger_node::api::ReplicaSnapshot;
use ledger_node::runner::CustomerRun;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub const CUSTOMER_OUTPUT: &str = "customer-output.json";
pub const REPLICA_EVENTS: &str = "replica-events.json";
pub const CUSTOMER_EVENTS: &str = "customer-events.json";
pub const CAUSAL_TRACE: &str = "causal-trace.json";

#[derive(Debug, Clone)]
pub struct Artifacts {
    pub customer_output: PathBuf,
    pub replica_events: PathBuf,
    pub customer_events: PathBuf,
    pub causal_trace: PathBuf,
    pub trace: CausalTrace,
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Write the four run artifacts into `dir`, creating it if needed.
pub fn write_artifacts(
    dir: &Path,
    run: &CustomerRun,
    snapshots: &[ReplicaSnapshot],
) -> anyhow::Result<Artifacts> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let replica_logs: Vec<ReplicaLog> = snapshots.iter().map(|s| s.log.clone()).collect();
    let trace = CausalTraceBuilder::new(&replica_logs, &run.logs).build()?;

    let artifacts = Artifacts {
        customer_output: dir.join(CUSTOMER_OUTPUT),
        replica_events: dir.join(REPLICA_EVENTS),
        customer_events: dir.join(CUSTOMER_EVENTS),
        causal_trace: dir.join(CAUSAL_TRACE),
        trace,
    };

    write_json(&artifacts.customer_output, &run.outputs)?;
    write_json(&artifacts.replica_events, &replica_logs)?;
    write_json(&artifacts.customer_events, &run.logs)?;
    write_json(&artifacts.causal_trace, &artifacts.trace)?;
    Ok(artifacts)
}

pub fn read_logs(
    replica_events: &Path,
    customer_events: &Path,
) -> anyhow::Result<(Vec<ReplicaLog>, Vec<CustomerLog>)> {
    Ok((read_json(replica_events)?, read_json(customer_events)?))
}

/// All replicas agree on the balance and every replica log is strictly
/// increasing in clock.
pub fn verify_replicas(snapshots: &[ReplicaSnapshot]) -> anyhow::Result<()> {
    let Some(first) = snapshots.first() else {
        return Ok(());
    };

    for snapshot in snapshots {
        if snapshot.state.balance != first.state.balance {
            bail!(
                "replica {} holds {} but replica {} holds {}",
                snapshot.state.replica_id,
                snapshot.state.balance,
                first.state.replica_id,
                first.state.balance
            );
        }
        if !is_strictly_increasing(&snapshot.log.entries) {
            bail!("replica {} has a log whose clocks are not strictly increasing", snapshot.state.replica_id);
        }
    }
    Ok(())
}
