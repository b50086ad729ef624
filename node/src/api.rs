// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use lamport_ledger::{ReplicaId, ReplicaLog};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateResponse {
    pub replica_id: ReplicaId,
    pub balance: i64,
    pub clock: u64,
}

/// Everything a verifier needs from one replica after a run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReplicaSnapshot {
    pub state: StateResponse,
    pub log: ReplicaLog,
}
