// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Drives every customer of a scenario against a cluster.
//!
//! Concurrent mode runs one task per customer; a customer's own records still
//! run in file order inside its task. Sequential mode runs records strictly in
//! file order, which makes the output independent of scheduling.
//!
//! A failed request shows up as an error receipt in its customer's output; only
//! an invalid scenario or a panicked task fails the whole drive.

use std::collections::BTreeMap;
use std::sync::Arc;

use lamport_ledger::{CustomerId, CustomerLog, ReplicaId};
use tokio::task::JoinSet;

use crate::config::CustomerClockPolicy;
use crate::customer::{CustomerOutput, CustomerSession};
use crate::errors::NodeError;
use crate::network::Transport;
use crate::scenario::{CustomerBatch, Scenario};

#[derive(Debug, Clone, Default)]
pub struct CustomerRun {
    /// One output per customer record, in file order.
    pub outputs: Vec<CustomerOutput>,
    /// One log per customer, in order of first appearance.
    pub logs: Vec<CustomerLog>,
}

struct CustomerGroup {
    customer: CustomerId,
    home: ReplicaId,
    batches: Vec<CustomerBatch>,
}

fn group_by_customer(batches: Vec<CustomerBatch>) -> Result<Vec<CustomerGroup>, NodeError> {
    let mut groups: Vec<CustomerGroup> = Vec::new();
    let mut index: BTreeMap<CustomerId, usize> = BTreeMap::new();

    for batch in batches {
        match index.get(&batch.customer) {
            Some(&i) => {
                let group = &mut groups[i];
                if group.home != batch.home {
                    return Err(NodeError::Scenario(format!(
                        "customer {} is bound to branch {} but record {} names branch {}",
                        batch.customer, group.home, batch.record, batch.home
                    )));
                }
                group.batches.push(batch);
            }
            None => {
                index.insert(batch.customer, groups.len());
                groups.push(CustomerGroup {
                    customer: batch.customer,
                    home: batch.home,
                    batches: vec![batch],
                });
            }
        }
    }
    Ok(groups)
}

async fn run_group<T: Transport>(
    group: CustomerGroup,
    transport: Arc<T>,
    policy: CustomerClockPolicy,
) -> (Vec<(usize, CustomerOutput)>, CustomerLog) {
    let mut session = CustomerSession::new(group.customer, group.home, transport, policy);
    let mut outputs = Vec::with_capacity(group.batches.len());
    for batch in group.batches {
        session.append_requests(batch.events);
        outputs.push((batch.record, session.run().await));
    }
    (outputs, session.customer_log())
}

pub async fn drive_customers<T: Transport>(
    scenario: &Scenario,
    transport: Arc<T>,
    policy: CustomerClockPolicy,
    sequential: bool,
) -> Result<CustomerRun, NodeError> {
    let groups = group_by_customer(scenario.customer_batches())?;
    tracing::info!(customers = groups.len(), sequential, "Driving customers");

    if sequential {
        return drive_sequential(groups, transport, policy).await;
    }

    let mut tasks = JoinSet::new();
    for (position, group) in groups.into_iter().enumerate() {
        let transport = transport.clone();
        tasks.spawn(async move { (position, run_group(group, transport, policy).await) });
    }

    let mut finished = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        finished.push(joined.map_err(|e| NodeError::Task(e.to_string()))?);
    }
    finished.sort_by_key(|(position, _)| *position);

    let mut outputs = Vec::new();
    let mut logs = Vec::with_capacity(finished.len());
    for (_, (group_outputs, log)) in finished {
        outputs.extend(group_outputs);
        logs.push(log);
    }
    outputs.sort_by_key(|(record, _)| *record);

    Ok(CustomerRun {
        outputs: outputs.into_iter().map(|(_, output)| output).collect(),
        logs,
    })
}

async fn drive_sequential<T: Transport>(
    groups: Vec<CustomerGroup>,
    transport: Arc<T>,
    policy: CustomerClockPolicy,
) -> Result<CustomerRun, NodeError> {
    let mut sessions = Vec::with_capacity(groups.len());
    let mut batches = Vec::new();
    for (position, group) in groups.into_iter().enumerate() {
        sessions.push(CustomerSession::new(group.customer, group.home, transport.clone(), policy));
        batches.extend(group.batches.into_iter().map(|b| (position, b)));
    }
    batches.sort_by_key(|(_, b)| b.record);

    let mut outputs = Vec::with_capacity(batches.len());
    for (position, batch) in batches {
        let session = &mut sessions[position];
        session.append_requests(batch.events);
        outputs.push(session.run().await);
    }

    Ok(CustomerRun {
        outputs,
        logs: sessions.iter().map(|s| s.customer_log()).collect(),
    })
}
