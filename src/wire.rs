// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! JSON shapes exchanged between customers and replicas.
//!
//! Every field of `DeliveryRequest` is optional at the serde level so that a
//! missing field surfaces as `LedgerError::MalformedMessage` from
//! `Envelope::decode` rather than as an opaque deserialization failure.

use serde::{Deserialize, Serialize};

use crate::types::{ReplicaId, RequestId};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    /// Customer id for customer-facing interfaces, replica id for propagate kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_request_id: Option<String>,
    #[serde(default)]
    pub interface: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_clock: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpResult {
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "insufficient-funds")]
    InsufficientFunds,
}

impl OpResult {
    pub fn is_success(&self) -> bool {
        matches!(self, OpResult::Success)
    }
}

/// Fields that do not apply to the answered interface are left unset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_id: Option<ReplicaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_request_id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<OpResult>,
    pub clock: u64,
}
