//! Error types.

use thiserror::Error;

use crate::types::Interface;

/// Rejections raised while decoding an inbound message. None of these touch
/// replica state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A field required by the message's interface is absent.
    #[error("malformed {interface} message: missing `{field}`")]
    MalformedMessage {
        interface: String,
        field: &'static str,
    },
    /// The operation tag is not one of the known interfaces.
    #[error("unknown interface `{0}`")]
    UnknownInterface(String),
    /// Amounts and propagated balances must be non-negative.
    #[error("invalid amount {amount} for {interface}")]
    InvalidAmount { interface: Interface, amount: i64 },
}

impl LedgerError {
    /// Stable machine-readable tag, used in error bodies and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::MalformedMessage { .. } => "malformed-message",
            LedgerError::UnknownInterface(_) => "unknown-interface",
            LedgerError::InvalidAmount { .. } => "invalid-amount",
        }
    }
}

pub type LedgerResult<T> = core::result::Result<T, LedgerError>;

/// Malformed input to the causal trace builder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("log entry #{position} of {source_name} has no customer request id")]
    MissingRequestId { source_name: String, position: usize },
    #[error("customer request `{0}` was issued more than once")]
    DuplicateRequest(String),
    #[error("trace encoding failed: {0}")]
    Encoding(String),
}
