use std::collections::BTreeMap;

use async_trait::async_trait;
use lamport_ledger::{DeliveryRequest, DeliveryResponse, LogEntry, ReplicaId, ReplicaLog};
use reqwest::{Client, Response};

use crate::api::{ErrorBody, ReplicaSnapshot, StateResponse};
use crate::errors::NodeError;
use crate::network::Transport;

/// HTTP/JSON transport. The route table is fixed at construction from the
/// static membership list and shares one connection-pooling client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    routes: BTreeMap<ReplicaId, String>,
    client: Client,
}

impl HttpTransport {
    pub fn new(members: BTreeMap<ReplicaId, String>) -> Self {
        let routes = members
            .into_iter()
            .map(|(id, url)| (id, url.trim_end_matches('/').to_string()))
            .collect();
        Self {
            routes,
            client: Client::new(),
        }
    }

    pub fn members(&self) -> impl Iterator<Item = ReplicaId> + '_ {
        self.routes.keys().copied()
    }

    fn url(&self, target: ReplicaId, path: &str) -> Result<String, NodeError> {
        let base = self.routes.get(&target).ok_or(NodeError::UnknownPeer(target))?;
        Ok(format!("{base}{path}"))
    }

    pub async fn fetch_state(&self, target: ReplicaId) -> Result<StateResponse, NodeError> {
        let url = self.url(target, "/v1/state")?;
        let resp = self.client.get(&url).send().await.map_err(|e| unreachable(target, e))?;
        decode(target, resp).await
    }

    pub async fn fetch_events(&self, target: ReplicaId) -> Result<Vec<LogEntry>, NodeError> {
        let url = self.url(target, "/v1/events")?;
        let resp = self.client.get(&url).send().await.map_err(|e| unreachable(target, e))?;
        decode(target, resp).await
    }

    pub async fn snapshot(&self, target: ReplicaId) -> Result<ReplicaSnapshot, NodeError> {
        let state = self.fetch_state(target).await?;
        let entries = self.fetch_events(target).await?;
        Ok(ReplicaSnapshot {
            state,
            log: ReplicaLog { replica_id: target, entries },
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(
        &self,
        target: ReplicaId,
        request: DeliveryRequest,
    ) -> Result<DeliveryResponse, NodeError> {
        let url = self.url(target, "/v1/deliver")?;
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| unreachable(target, e))?;
        decode(target, resp).await
    }
}

fn unreachable(peer: ReplicaId, e: reqwest::Error) -> NodeError {
    NodeError::PeerUnreachable {
        peer,
        reason: e.to_string(),
    }
}

async fn decode<T: serde::de::DeserializeOwned>(peer: ReplicaId, resp: Response) -> Result<T, NodeError> {
    let status = resp.status();
    if !status.is_success() {
        let (kind, message) = match resp.json::<ErrorBody>().await {
            Ok(body) => (body.kind, body.error),
            Err(_) => ("unknown".to_string(), status.to_string()),
        };
        return Err(NodeError::Rejected {
            peer,
            status: status.as_u16(),
            kind,
            message,
        });
    }

    resp.json().await.map_err(|e| unreachable(peer, e))
}
