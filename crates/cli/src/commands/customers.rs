use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use lamport_ledger::ReplicaId;
use ledger_node::config::{replica_addr, replica_url};
use ledger_node::network::HttpTransport;
use ledger_node::runner::drive_customers;
use ledger_node::scenario::Scenario;

use super::run::RunOptions;
use crate::output::{write_artifacts, Artifacts};

/// Drive a scenario's customers against replicas that are already serving at
/// their derived addresses (see `ledger-node`).
pub async fn run(scenario_path: &Path, out_dir: &Path, opts: &RunOptions) -> anyhow::Result<Artifacts> {
    if opts.base_port == 0 {
        anyhow::bail!("a running cluster needs a fixed --base-port");
    }

    let scenario = Scenario::load(scenario_path)?;
    let branches = scenario.branches();
    let members: BTreeMap<ReplicaId, String> = branches
        .iter()
        .map(|b| Ok((b.id, replica_url(replica_addr(opts.base_port, b.id)?))))
        .collect::<Result<_, ledger_node::errors::NodeError>>()?;
    let transport = Arc::new(HttpTransport::new(members));

    let run = drive_customers(&scenario, transport.clone(), opts.clock_policy(), opts.sequential).await?;

    let mut snapshots = Vec::with_capacity(branches.len());
    for branch in &branches {
        snapshots.push(transport.snapshot(branch.id).await?);
    }

    let artifacts = write_artifacts(out_dir, &run, &snapshots)?;
    println!("Wrote {}", artifacts.customer_output.display());
    Ok(artifacts)
}
