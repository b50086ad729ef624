// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Replica-to-replica and customer-to-replica transport.

pub mod client;
pub mod local;

pub use client::HttpTransport;
pub use local::LocalTransport;

use async_trait::async_trait;
use lamport_ledger::{DeliveryRequest, DeliveryResponse, ReplicaId};

use crate::errors::NodeError;

/// "Send an operation to replica R and obtain its acknowledgement."
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn deliver(
        &self,
        target: ReplicaId,
        request: DeliveryRequest,
    ) -> Result<DeliveryResponse, NodeError>;
}
