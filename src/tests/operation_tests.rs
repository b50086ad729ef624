// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::error::LedgerError;
use crate::operation::{Envelope, Operation};
use crate::types::{CustomerId, EventSource, Interface, ReplicaId, RequestId};
use crate::wire::DeliveryRequest;

fn customer_request(interface: &str, amount: Option<i64>) -> DeliveryRequest {
    DeliveryRequest {
        sender_id: Some(1),
        customer_request_id: Some("r1".into()),
        interface: interface.into(),
        amount,
        balance: None,
        sender_clock: Some(1),
    }
}

#[test]
fn test_decode_deposit() {
    let envelope = Envelope::decode(&customer_request("deposit", Some(50))).unwrap();
    assert_eq!(envelope.operation, Operation::Deposit { amount: 50 });
    assert_eq!(envelope.sender, EventSource::Customer(CustomerId(1)));
    assert_eq!(envelope.customer_request_id, Some(RequestId::new("r1")));
    assert_eq!(envelope.sender_clock, 1);
}

#[test]
fn test_decode_propagate_comes_from_branch() {
    let request = DeliveryRequest {
        sender_id: Some(3),
        customer_request_id: Some("r1".into()),
        interface: "propagatewithdraw".into(),
        amount: None,
        balance: Some(70),
        sender_clock: Some(12),
    };
    let envelope = Envelope::decode(&request).unwrap();
    assert_eq!(envelope.sender, EventSource::Branch(ReplicaId(3)));
    assert_eq!(
        envelope.operation,
        Operation::PropagateBalance { new_balance: 70, kind: Interface::PropagateWithdraw }
    );
    assert_eq!(envelope.to_request(), request);
}

#[test]
fn test_unknown_interface_rejected() {
    let err = Envelope::decode(&customer_request("transfer", Some(5))).unwrap_err();
    assert_eq!(err, LedgerError::UnknownInterface("transfer".into()));
    assert_eq!(err.kind(), "unknown-interface");
}

#[test]
fn test_missing_fields_rejected() {
    let err = Envelope::decode(&customer_request("withdraw", None)).unwrap_err();
    assert!(matches!(err, LedgerError::MalformedMessage { field: "amount", .. }));

    let mut no_clock = customer_request("query", None);
    no_clock.sender_clock = None;
    let err = Envelope::decode(&no_clock).unwrap_err();
    assert!(matches!(err, LedgerError::MalformedMessage { field: "sender_clock", .. }));

    let err = Envelope::decode(&customer_request("propagatedeposit", None)).unwrap_err();
    assert!(matches!(err, LedgerError::MalformedMessage { field: "balance", .. }));
}

#[test]
fn test_every_interface_needs_request_id() {
    for (interface, amount) in [("query", None), ("deposit", Some(5)), ("withdraw", Some(5))] {
        let mut request = customer_request(interface, amount);
        request.customer_request_id = None;
        let err = Envelope::decode(&request).unwrap_err();
        assert!(
            matches!(err, LedgerError::MalformedMessage { field: "customer_request_id", .. }),
            "{interface}: {err}"
        );
    }

    let mut propagate = customer_request("propagatedeposit", None);
    propagate.balance = Some(10);
    propagate.customer_request_id = None;
    let err = Envelope::decode(&propagate).unwrap_err();
    assert!(matches!(err, LedgerError::MalformedMessage { field: "customer_request_id", .. }));
}

#[test]
fn test_negative_amount_rejected() {
    let err = Envelope::decode(&customer_request("deposit", Some(-1))).unwrap_err();
    assert_eq!(err, LedgerError::InvalidAmount { interface: Interface::Deposit, amount: -1 });
}

#[test]
fn test_wire_json_shape() {
    let json = r#"{"sender_id":2,"customer_request_id":"7","interface":"query","sender_clock":4}"#;
    let request: DeliveryRequest = serde_json::from_str(json).unwrap();
    let envelope = Envelope::decode(&request).unwrap();
    assert_eq!(envelope.operation, Operation::Query);
    assert_eq!(envelope.customer_request_id, Some(RequestId::new("7")));
}
