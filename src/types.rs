// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Identity types and the interface tag.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// A branch replica. Membership is static and known to every replica at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub u32);

/// Opaque id a customer attaches to each request it issues.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        RequestId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operation kind as it appears on the wire and in event logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    Query,
    Deposit,
    Withdraw,
    PropagateDeposit,
    PropagateWithdraw,
}

impl Interface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interface::Query => "query",
            Interface::Deposit => "deposit",
            Interface::Withdraw => "withdraw",
            Interface::PropagateDeposit => "propagatedeposit",
            Interface::PropagateWithdraw => "propagatewithdraw",
        }
    }

    /// Interfaces a customer may issue. The propagate kinds are replica-only.
    pub fn is_customer_facing(&self) -> bool {
        matches!(self, Interface::Query | Interface::Deposit | Interface::Withdraw)
    }

    /// The propagate kind a successful local write fans out as.
    pub fn propagated(&self) -> Option<Interface> {
        match self {
            Interface::Deposit => Some(Interface::PropagateDeposit),
            Interface::Withdraw => Some(Interface::PropagateWithdraw),
            _ => None,
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interface {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(Interface::Query),
            "deposit" => Ok(Interface::Deposit),
            "withdraw" => Ok(Interface::Withdraw),
            "propagatedeposit" => Ok(Interface::PropagateDeposit),
            "propagatewithdraw" => Ok(Interface::PropagateWithdraw),
            other => Err(LedgerError::UnknownInterface(other.to_string())),
        }
    }
}

/// Who recorded a log entry or sent a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum EventSource {
    Branch(ReplicaId),
    Customer(CustomerId),
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSource::Branch(id) => write!(f, "branch {id}"),
            EventSource::Customer(id) => write!(f, "customer {id}"),
        }
    }
}
