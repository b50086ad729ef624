// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Starting a set of replicas from a scenario's branch list.
//!
//! `LocalCluster` wires dispatchers together in-process. `HttpCluster` serves
//! each replica on its own socket and talks to it over HTTP, which is the same
//! path a multi-process deployment takes.

use std::collections::BTreeMap;
use std::sync::Arc;

use lamport_ledger::ReplicaId;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::api::ReplicaSnapshot;
use crate::config::{replica_addr, replica_url, BroadcastPolicy, NodeConfig};
use crate::dispatcher::{MessageDispatcher, SharedDispatcher};
use crate::errors::NodeError;
use crate::network::{HttpTransport, LocalTransport};
use crate::scenario::BranchSpec;
use crate::server::build_router;

fn node_config(
    branch: &BranchSpec,
    members: &BTreeMap<ReplicaId, String>,
    policy: BroadcastPolicy,
) -> NodeConfig {
    NodeConfig {
        replica_id: branch.id,
        initial_balance: branch.balance,
        members: members.clone(),
        broadcast: policy,
        ..NodeConfig::default()
    }
}

pub struct LocalCluster {
    transport: Arc<LocalTransport>,
    /// Declaration order.
    dispatchers: Vec<SharedDispatcher<LocalTransport>>,
}

impl LocalCluster {
    pub async fn start(branches: &[BranchSpec], policy: BroadcastPolicy) -> Self {
        let members: BTreeMap<ReplicaId, String> = branches
            .iter()
            .map(|b| (b.id, format!("local://{}", b.id)))
            .collect();
        let transport = Arc::new(LocalTransport::new());

        let mut dispatchers = Vec::with_capacity(branches.len());
        for branch in branches {
            let cfg = node_config(branch, &members, policy);
            let dispatcher = Arc::new(MessageDispatcher::new(&cfg, transport.clone()));
            transport.register(&dispatcher).await;
            dispatchers.push(dispatcher);
        }

        tracing::info!(replicas = dispatchers.len(), "Local cluster started");
        Self { transport, dispatchers }
    }

    pub fn transport(&self) -> Arc<LocalTransport> {
        self.transport.clone()
    }

    pub fn dispatcher(&self, id: ReplicaId) -> Option<&SharedDispatcher<LocalTransport>> {
        self.dispatchers.iter().find(|d| d.replica_id() == id)
    }

    pub async fn snapshots(&self) -> Vec<ReplicaSnapshot> {
        let mut out = Vec::with_capacity(self.dispatchers.len());
        for dispatcher in &self.dispatchers {
            out.push(dispatcher.snapshot().await);
        }
        out
    }
}

pub struct HttpCluster {
    transport: Arc<HttpTransport>,
    order: Vec<ReplicaId>,
    members: BTreeMap<ReplicaId, String>,
    servers: Vec<JoinHandle<std::io::Result<()>>>,
}

impl HttpCluster {
    /// Binds every listener before any server starts, so a replica's first
    /// broadcast never races a peer that is not listening yet.
    pub async fn start(
        branches: &[BranchSpec],
        base_port: u16,
        policy: BroadcastPolicy,
        max_concurrent: usize,
    ) -> Result<Self, NodeError> {
        let mut listeners = Vec::with_capacity(branches.len());
        let mut members = BTreeMap::new();
        for branch in branches {
            let listener = TcpListener::bind(replica_addr(base_port, branch.id)?).await?;
            let addr = listener.local_addr()?;
            members.insert(branch.id, replica_url(addr));
            listeners.push(listener);
        }

        let transport = Arc::new(HttpTransport::new(members.clone()));
        let mut servers = Vec::with_capacity(branches.len());

        for (branch, listener) in branches.iter().zip(listeners) {
            let mut cfg = node_config(branch, &members, policy);
            cfg.bind_addr = listener.local_addr()?;
            cfg.max_concurrent_requests = max_concurrent;

            let dispatcher = Arc::new(MessageDispatcher::new(&cfg, transport.clone()));
            let app = build_router(dispatcher, cfg.max_concurrent_requests);
            tracing::info!(replica = %cfg.replica_id, "Listening on {}", cfg.bind_addr);
            servers.push(tokio::spawn(async move { axum::serve(listener, app).await }));
        }

        Ok(Self {
            transport,
            order: branches.iter().map(|b| b.id).collect(),
            members,
            servers,
        })
    }

    pub fn transport(&self) -> Arc<HttpTransport> {
        self.transport.clone()
    }

    pub fn members(&self) -> &BTreeMap<ReplicaId, String> {
        &self.members
    }

    pub async fn snapshots(&self) -> Result<Vec<ReplicaSnapshot>, NodeError> {
        let mut out = Vec::with_capacity(self.order.len());
        for id in &self.order {
            out.push(self.transport.snapshot(*id).await?);
        }
        Ok(out)
    }

    /// Serve until a server stops.
    pub async fn wait(mut self) -> Result<(), NodeError> {
        for server in std::mem::take(&mut self.servers) {
            server.await.map_err(|e| NodeError::Task(e.to_string()))??;
        }
        Ok(())
    }
}

impl Drop for HttpCluster {
    fn drop(&mut self) {
        for server in &self.servers {
            server.abort();
        }
    }
}

/// Serve a single replica whose peers run in other processes.
pub async fn run_replica(cfg: NodeConfig) -> Result<(), NodeError> {
    let transport = Arc::new(HttpTransport::new(cfg.members.clone()));
    let dispatcher = Arc::new(MessageDispatcher::new(&cfg, transport));
    let app = build_router(dispatcher, cfg.max_concurrent_requests);

    let listener = TcpListener::bind(cfg.bind_addr).await?;
    tracing::info!(replica = %cfg.replica_id, peers = ?cfg.peers(), "Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
