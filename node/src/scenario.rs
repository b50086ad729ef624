// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Scenario files.
//!
//! A scenario is a JSON array of branch and customer records:
//!
//! ```json
//! [
//!   { "id": 1, "type": "branch", "balance": 100 },
//!   { "id": 1, "type": "customer", "events": [
//!       { "id": 1, "interface": "deposit", "money": 50 },
//!       { "id": 2, "interface": "query" }
//!   ] }
//! ]
//! ```
//!
//! A customer talks to the branch with the same id unless `"branch"` names
//! another one. Customer records are kept in file order; the same customer may
//! appear more than once.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use lamport_ledger::{CustomerId, Interface, Operation, ReplicaId};
use serde::Deserialize;

use crate::customer::CustomerEvent;
use crate::errors::NodeError;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawRecord {
    Branch {
        id: u32,
        #[serde(default)]
        balance: i64,
    },
    Customer {
        id: u32,
        #[serde(default)]
        branch: Option<u32>,
        #[serde(default)]
        events: Vec<RawEvent>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRequestId {
    Number(u64),
    Text(String),
}

impl RawRequestId {
    fn into_string(self) -> String {
        match self {
            RawRequestId::Number(n) => n.to_string(),
            RawRequestId::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: RawRequestId,
    interface: String,
    #[serde(default)]
    money: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchSpec {
    pub id: ReplicaId,
    pub balance: i64,
}

/// One customer record, in the position it had in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerBatch {
    pub record: usize,
    pub customer: CustomerId,
    pub home: ReplicaId,
    pub events: Vec<CustomerEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioRecord {
    Branch(BranchSpec),
    Customer(CustomerBatch),
}

#[derive(Debug, Clone, Default)]
pub struct Scenario {
    records: Vec<ScenarioRecord>,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self, NodeError> {
        let raw: Vec<RawRecord> = serde_json::from_str(text)
            .map_err(|e| NodeError::Scenario(format!("invalid scenario JSON: {}", e)))?;
        Self::from_records(raw)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::info!("Loaded scenario from {}", path.display());
        Self::from_json(&text)
    }

    fn from_records(raw: Vec<RawRecord>) -> Result<Self, NodeError> {
        let mut branches = BTreeMap::new();
        for record in &raw {
            if let RawRecord::Branch { id, balance } = record {
                if *balance < 0 {
                    return Err(NodeError::Scenario(format!("branch {} has negative balance {}", id, balance)));
                }
                if branches.insert(*id, *balance).is_some() {
                    return Err(NodeError::Scenario(format!("branch {} declared twice", id)));
                }
            }
        }

        let mut seen_requests: HashSet<String> = HashSet::new();
        let mut records = Vec::with_capacity(raw.len());

        for (index, record) in raw.into_iter().enumerate() {
            match record {
                RawRecord::Branch { id, balance } => {
                    records.push(ScenarioRecord::Branch(BranchSpec { id: ReplicaId(id), balance }));
                }
                RawRecord::Customer { id, branch, events } => {
                    let home = branch.unwrap_or(id);
                    if !branches.contains_key(&home) {
                        return Err(NodeError::Scenario(format!(
                            "customer {} targets unknown branch {}",
                            id, home
                        )));
                    }

                    let mut batch = Vec::with_capacity(events.len());
                    for event in events {
                        let request_id = event.id.into_string();
                        if !seen_requests.insert(request_id.clone()) {
                            return Err(NodeError::Scenario(format!(
                                "request id {} used more than once",
                                request_id
                            )));
                        }
                        batch.push(parse_event(id, request_id, &event.interface, event.money)?);
                    }

                    records.push(ScenarioRecord::Customer(CustomerBatch {
                        record: index,
                        customer: CustomerId(id),
                        home: ReplicaId(home),
                        events: batch,
                    }));
                }
            }
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[ScenarioRecord] {
        &self.records
    }

    /// Branches in declaration order. This order also breaks clock ties when
    /// the causal trace is built.
    pub fn branches(&self) -> Vec<BranchSpec> {
        self.records
            .iter()
            .filter_map(|r| match r {
                ScenarioRecord::Branch(b) => Some(*b),
                ScenarioRecord::Customer(_) => None,
            })
            .collect()
    }

    pub fn customer_batches(&self) -> Vec<CustomerBatch> {
        self.records
            .iter()
            .filter_map(|r| match r {
                ScenarioRecord::Customer(c) => Some(c.clone()),
                ScenarioRecord::Branch(_) => None,
            })
            .collect()
    }
}

fn parse_event(
    customer: u32,
    request_id: String,
    interface: &str,
    money: Option<i64>,
) -> Result<CustomerEvent, NodeError> {
    let interface: Interface = interface.parse()?;
    let amount = || match money {
        Some(m) if m >= 0 => Ok(m),
        Some(m) => Err(NodeError::Scenario(format!(
            "request {} of customer {} has negative money {}",
            request_id, customer, m
        ))),
        None => Err(NodeError::Scenario(format!(
            "request {} of customer {} is missing money",
            request_id, customer
        ))),
    };

    let operation = match interface {
        Interface::Deposit => Operation::Deposit { amount: amount()? },
        Interface::Withdraw => Operation::Withdraw { amount: amount()? },
        Interface::Query => Operation::Query,
        other => {
            return Err(NodeError::Scenario(format!(
                "customer {} cannot issue {}",
                customer, other
            )))
        }
    };

    Ok(CustomerEvent {
        id: lamport_ledger::RequestId::new(request_id),
        operation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_scenario() {
        let scenario = Scenario::from_json(
            r#"[
                {"id": 1, "type": "branch", "balance": 100},
                {"id": 2, "type": "branch", "balance": 100},
                {"id": 1, "type": "customer", "events": [
                    {"id": 1, "interface": "deposit", "money": 50},
                    {"id": "q-1", "interface": "query"}
                ]}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            scenario.branches(),
            vec![
                BranchSpec { id: ReplicaId(1), balance: 100 },
                BranchSpec { id: ReplicaId(2), balance: 100 },
            ]
        );
        let batches = scenario.customer_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].record, 2);
        assert_eq!(batches[0].home, ReplicaId(1));
        assert_eq!(batches[0].events, vec![CustomerEvent::deposit("1", 50), CustomerEvent::query("q-1")]);
    }

    #[test]
    fn test_explicit_home_branch() {
        let scenario = Scenario::from_json(
            r#"[
                {"id": 1, "type": "branch", "balance": 0},
                {"id": 2, "type": "branch", "balance": 0},
                {"id": 7, "type": "customer", "branch": 2, "events": []}
            ]"#,
        )
        .unwrap();
        assert_eq!(scenario.customer_batches()[0].home, ReplicaId(2));
    }

    #[test]
    fn test_rejects_bad_scenarios() {
        let cases = [
            r#"[{"id": 1, "type": "branch"}, {"id": 1, "type": "branch"}]"#,
            r#"[{"id": 1, "type": "customer", "events": []}]"#,
            r#"[{"id": 1, "type": "branch"}, {"id": 1, "type": "customer", "events": [{"id": 1, "interface": "deposit"}]}]"#,
            r#"[{"id": 1, "type": "branch"}, {"id": 1, "type": "customer", "events": [{"id": 1, "interface": "withdraw", "money": -5}]}]"#,
            r#"[{"id": 1, "type": "branch"}, {"id": 1, "type": "customer", "events": [{"id": 1, "interface": "propagatedeposit", "money": 5}]}]"#,
            r#"[{"id": 1, "type": "branch"}, {"id": 1, "type": "customer", "events": [{"id": 1, "interface": "query"}, {"id": 1, "interface": "query"}]}]"#,
            r#"{"id": 1}"#,
        ];
        for case in cases {
            assert!(Scenario::from_json(case).is_err(), "accepted: {}", case);
        }
    }
}
