// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lamport_ledger::{LedgerError, ReplicaId, TraceError};
use thiserror::Error;

use crate::api::ErrorBody;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Rejected message: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Replica {peer} unreachable: {reason}")]
    PeerUnreachable { peer: ReplicaId, reason: String },
    #[error("Replica {peer} did not answer within {after:?}")]
    PeerTimeout { peer: ReplicaId, after: Duration },
    #[error("Replica {0} is not a member")]
    UnknownPeer(ReplicaId),
    #[error("Replica {peer} rejected the request ({status}, {kind}): {message}")]
    Rejected {
        peer: ReplicaId,
        status: u16,
        kind: String,
        message: String,
    },
    #[error("Invalid scenario: {0}")]
    Scenario(String),
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Telemetry error: {0}")]
    Telemetry(String),
    #[error("Task failed: {0}")]
    Task(String),
}

impl NodeError {
    pub fn kind(&self) -> &'static str {
        match self {
            NodeError::Ledger(e) => e.kind(),
            NodeError::PeerUnreachable { .. } => "peer-unreachable",
            NodeError::PeerTimeout { .. } => "peer-timeout",
            NodeError::UnknownPeer(_) => "unknown-peer",
            NodeError::Rejected { .. } => "peer-rejected",
            NodeError::Scenario(_) => "scenario",
            NodeError::Trace(_) => "trace",
            NodeError::Io(_) => "io",
            NodeError::Telemetry(_) => "telemetry",
            NodeError::Task(_) => "task",
        }
    }

    /// Connectivity failures may succeed on another attempt; a rejection will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NodeError::PeerUnreachable { .. } | NodeError::PeerTimeout { .. })
    }

    /// A rejection relayed from a peer keeps the peer's own kind.
    pub fn body(&self) -> ErrorBody {
        let kind = match self {
            NodeError::Rejected { kind, .. } => kind.clone(),
            other => other.kind().to_string(),
        };
        ErrorBody { error: self.to_string(), kind }
    }
}

impl IntoResponse for NodeError {
    fn into_response(self) -> Response {
        let status = match &self {
            NodeError::Ledger(_) => StatusCode::BAD_REQUEST,
            NodeError::PeerUnreachable { .. }
            | NodeError::UnknownPeer(_)
            | NodeError::Rejected { .. } => StatusCode::BAD_GATEWAY,
            NodeError::PeerTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self.body())).into_response()
    }
}
