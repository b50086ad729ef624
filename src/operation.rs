// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Decoded operation language.
//!
//! A `DeliveryRequest` is untrusted input; `Envelope::decode` is the only way
//! to turn one into an `Operation`, and it either yields a fully populated
//! envelope or a `LedgerError` with no side effects.

use crate::error::{LedgerError, LedgerResult};
use crate::types::{CustomerId, EventSource, Interface, ReplicaId, RequestId};
use crate::wire::DeliveryRequest;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    Deposit { amount: i64 },
    Withdraw { amount: i64 },
    Query,
    /// Post-mutation balance pushed by the replica that applied a local write.
    /// `kind` is the propagate interface it arrived under.
    PropagateBalance { new_balance: i64, kind: Interface },
}

impl Operation {
    pub fn interface(&self) -> Interface {
        match self {
            Operation::Deposit { .. } => Interface::Deposit,
            Operation::Withdraw { .. } => Interface::Withdraw,
            Operation::Query => Interface::Query,
            Operation::PropagateBalance { kind, .. } => *kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub sender: EventSource,
    pub customer_request_id: Option<RequestId>,
    pub sender_clock: u64,
    pub operation: Operation,
}

impl Envelope {
    pub fn decode(request: &DeliveryRequest) -> LedgerResult<Self> {
        let interface: Interface = request.interface.parse()?;
        let missing = |field: &'static str| LedgerError::MalformedMessage {
            interface: request.interface.clone(),
            field,
        };

        let sender_id = request.sender_id.ok_or_else(|| missing("sender_id"))?;
        let sender_clock = request.sender_clock.ok_or_else(|| missing("sender_clock"))?;
        // every logged entry must be attributable to a customer request
        let customer_request_id = request
            .customer_request_id
            .clone()
            .map(RequestId)
            .ok_or_else(|| missing("customer_request_id"))?;

        let operation = match interface {
            Interface::Query => Operation::Query,
            Interface::Deposit | Interface::Withdraw => {
                let amount = request.amount.ok_or_else(|| missing("amount"))?;
                if amount < 0 {
                    return Err(LedgerError::InvalidAmount { interface, amount });
                }
                if interface == Interface::Deposit {
                    Operation::Deposit { amount }
                } else {
                    Operation::Withdraw { amount }
                }
            }
            Interface::PropagateDeposit | Interface::PropagateWithdraw => {
                let new_balance = request.balance.ok_or_else(|| missing("balance"))?;
                if new_balance < 0 {
                    return Err(LedgerError::InvalidAmount { interface, amount: new_balance });
                }
                Operation::PropagateBalance { new_balance, kind: interface }
            }
        };

        let sender = if interface.is_customer_facing() {
            EventSource::Customer(CustomerId(sender_id))
        } else {
            EventSource::Branch(ReplicaId(sender_id))
        };

        Ok(Envelope {
            sender,
            customer_request_id: Some(customer_request_id),
            sender_clock,
            operation,
        })
    }

    pub fn to_request(&self) -> DeliveryRequest {
        let sender_id = match self.sender {
            EventSource::Branch(id) => id.0,
            EventSource::Customer(id) => id.0,
        };
        let (amount, balance) = match &self.operation {
            Operation::Deposit { amount } | Operation::Withdraw { amount } => (Some(*amount), None),
            Operation::PropagateBalance { new_balance, .. } => (None, Some(*new_balance)),
            Operation::Query => (None, None),
        };
        DeliveryRequest {
            sender_id: Some(sender_id),
            customer_request_id: self.customer_request_id.as_ref().map(|id| id.0.clone()),
            interface: self.operation.interface().as_str().to_string(),
            amount,
            balance,
            sender_clock: Some(self.sender_clock),
        }
    }
}
