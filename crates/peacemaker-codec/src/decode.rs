//! Request decoder: raw runtime payload → validated `QueuedEvent`.
//!
//! Decoding is pure. It never touches the wallet session or the network.

use serde::de::DeserializeOwned;
use serde_json::Value;
use peacemaker_types::{
    BridgeError, ExecuteRequest, InboundEnvelope, LoginRequest, Operation, OperationKind,
    QueryRequest, QueuedEvent, Result,
};

use crate::wire::{EnvelopeWire, ExecuteWire, LoginWire, QueryWire};

/// Resolve a runtime event name to its operation kind.
pub fn decode_kind(name: &str) -> Result<OperationKind> {
    if name.trim().is_empty() {
        return Err(BridgeError::MissingCorrelation("operation".into()));
    }
    OperationKind::from_event_name(name).ok_or_else(|| BridgeError::UnknownOperation(name.into()))
}

/// Decode the outer `{ "Id", "Request" }` envelope.
///
/// `Request` is left string-encoded; use [`decode_operation`] for the body.
pub fn decode_envelope(kind: OperationKind, raw: &str) -> Result<InboundEnvelope> {
    let value = parse_object(raw, "envelope")?;
    let wire: EnvelopeWire = from_object(value, "envelope")?;

    let id = match wire.id {
        Some(Value::String(id)) if !id.is_empty() => id,
        _ => return Err(BridgeError::MissingCorrelation("Id".into())),
    };

    let request = wire.request.unwrap_or_default();
    if request.is_empty() && kind.requires_body() {
        return Err(BridgeError::MalformedPayload(format!(
            "{} envelope {} has no Request",
            kind, id
        )));
    }

    Ok(InboundEnvelope { id, request })
}

/// Decode and validate the operation body of an envelope.
pub fn decode_operation(kind: OperationKind, envelope: &InboundEnvelope) -> Result<Operation> {
    match kind {
        OperationKind::Login => decode_login(&envelope.request).map(Operation::Login),
        OperationKind::Logout => Ok(Operation::Logout),
        OperationKind::Query => decode_query(&envelope.request).map(Operation::Query),
        OperationKind::Execute => decode_execute(&envelope.request).map(Operation::Execute),
    }
}

/// Full decode of one runtime event: name, envelope and body.
pub fn decode_event(name: &str, raw: &str) -> Result<QueuedEvent> {
    let kind = decode_kind(name)?;
    let envelope = decode_envelope(kind, raw)?;
    let operation = decode_operation(kind, &envelope)?;
    Ok(QueuedEvent::new(envelope.id, operation))
}

pub fn decode_login(body: &str) -> Result<LoginRequest> {
    let wire: LoginWire = from_object(parse_object(body, "Login request")?, "Login request")?;

    Ok(LoginRequest {
        chain_id: required(wire.chain_id, "ChainId")?,
        rest_url: required(wire.rest_url, "RestUrl")?,
        rpc_url: required(wire.rpc_url, "RpcUrl")?,
        wallet_list: wire.wallet_list,
    })
}

pub fn decode_query(body: &str) -> Result<QueryRequest> {
    let wire: QueryWire = from_object(parse_object(body, "Query request")?, "Query request")?;

    let contract_address = required(wire.contract_address, "ContractAddress")?;
    let query = required(wire.query, "Query")?;

    Ok(QueryRequest {
        contract_address,
        query: parse_nested(&query, "Query")?,
    })
}

pub fn decode_execute(body: &str) -> Result<ExecuteRequest> {
    let wire: ExecuteWire =
        from_object(parse_object(body, "Execute request")?, "Execute request")?;

    let sender_address = required(wire.sender_address, "SenderAddress")?;
    let contract_address = required(wire.contract_address, "ContractAddress")?;
    let message = required(wire.message, "Message")?;
    let fee = wire.fee.ok_or(BridgeError::MissingField("Fee"))?;

    Ok(ExecuteRequest {
        sender_address,
        contract_address,
        message: parse_nested(&message, "Message")?,
        fee,
        memo: wire.memo.filter(|m| !m.is_empty()),
        funds: wire.funds,
    })
}

/// Absent, null and empty strings all count as missing.
fn required(value: Option<String>, field: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BridgeError::MissingField(field)),
    }
}

fn parse_object(raw: &str, what: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| BridgeError::MalformedPayload(format!("{} is not valid JSON: {}", what, e)))?;
    if !value.is_object() {
        return Err(BridgeError::MalformedPayload(format!("{} is not an object", what)));
    }
    Ok(value)
}

fn from_object<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| BridgeError::MalformedPayload(format!("{} has unexpected shape: {}", what, e)))
}

/// Second decode pass for the string-encoded `Query` / `Message` fields.
fn parse_nested(raw: &str, field: &str) -> Result<Value> {
    serde_json::from_str(raw)
        .map_err(|e| BridgeError::MalformedPayload(format!("{} is not valid JSON: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(id: &str, body: Value) -> String {
        json!({ "Id": id, "Request": body.to_string() }).to_string()
    }

    #[test]
    fn test_decode_vectors_from_json() {
        let data = include_str!("../../../tests/vectors/decode.json");
        let vectors: Vec<Value> = serde_json::from_str(data).unwrap();

        for v in &vectors {
            let name = v["name"].as_str().unwrap();
            let event = v["event"].as_str().unwrap();
            let payload = match &v["payload"] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let result = decode_event(event, &payload);

            if let Some(expected) = v["expected_error"].as_str() {
                let err = result.expect_err(name);
                assert_eq!(err.to_string(), expected, "error mismatch for '{}'", name);
                continue;
            }
            match v["expected_error_prefix"].as_str() {
                Some(prefix) => {
                    let err = result.expect_err(name).to_string();
                    assert!(err.starts_with(prefix), "'{}': {} does not start with {}", name, err, prefix);
                }
                None => {
                    let decoded = result.unwrap_or_else(|e| panic!("'{}' failed: {}", name, e));
                    assert_eq!(decoded.id, v["expected_id"].as_str().unwrap(), "id mismatch for '{}'", name);
                    assert_eq!(decoded.kind().event_name(), event);
                }
            }
        }
    }

    #[test]
    fn test_decode_login_with_wallet_list() {
        let raw = envelope(
            "1",
            json!({
                "ChainId": "atlantic-2",
                "RestUrl": "https://rest.atlantic-2.seinetwork.io",
                "RpcUrl": "https://rpc.atlantic-2.seinetwork.io",
                "WalletList": ["compass", "fin"],
                "Theme": "dark"
            }),
        );

        let event = decode_event("OnLogin", &raw).unwrap();
        match event.operation {
            Operation::Login(req) => {
                assert_eq!(req.chain_id, "atlantic-2");
                assert_eq!(req.wallet_list, Some(vec!["compass".to_string(), "fin".to_string()]));
            }
            other => panic!("expected login, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_login_reports_first_missing_field() {
        let raw = envelope("1", json!({ "ChainId": "atlantic-2" }));
        assert_eq!(decode_event("OnLogin", &raw), Err(BridgeError::MissingField("RestUrl")));

        let raw = envelope("1", json!({ "ChainId": "", "RpcUrl": "x" }));
        assert_eq!(decode_event("OnLogin", &raw), Err(BridgeError::MissingField("ChainId")));
    }

    #[test]
    fn test_decode_query_double_decodes_payload() {
        let raw = envelope(
            "q-1",
            json!({ "ContractAddress": "C1", "Query": "{\"balance\":{}}" }),
        );

        let event = decode_event("OnQuery", &raw).unwrap();
        assert_eq!(
            event.operation,
            Operation::Query(QueryRequest {
                contract_address: "C1".into(),
                query: json!({ "balance": {} }),
            })
        );
    }

    #[test]
    fn test_decode_query_rejects_invalid_nested_json() {
        let raw = envelope("q-2", json!({ "ContractAddress": "C1", "Query": "{balance" }));
        match decode_event("OnQuery", &raw) {
            Err(BridgeError::MalformedPayload(msg)) => assert!(msg.starts_with("Query")),
            other => panic!("expected malformed payload, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_execute_full() {
        let raw = envelope(
            "x-1",
            json!({
                "SenderAddress": "sei1sender",
                "ContractAddress": "sei1contract",
                "Message": "{\"mint\":{\"amount\":\"5\"}}",
                "Fee": { "amount": [{ "amount": "2000", "denom": "usei" }], "gas": "200000" },
                "Memo": "first mint",
                "Funds": [{ "amount": "10", "denom": "usei" }]
            }),
        );

        let event = decode_event("OnExecute", &raw).unwrap();
        let Operation::Execute(req) = event.operation else {
            panic!("expected execute");
        };
        assert_eq!(req.message, json!({ "mint": { "amount": "5" } }));
        assert_eq!(req.fee.gas, "200000");
        assert_eq!(req.fee.amount[0].denom, "usei");
        assert_eq!(req.memo.as_deref(), Some("first mint"));
        assert_eq!(req.funds.unwrap().len(), 1);
    }

    #[test]
    fn test_decode_execute_requires_fee() {
        let raw = envelope(
            "x-2",
            json!({
                "SenderAddress": "sei1sender",
                "ContractAddress": "sei1contract",
                "Message": "{}"
            }),
        );
        assert_eq!(decode_event("OnExecute", &raw), Err(BridgeError::MissingField("Fee")));
    }

    #[test]
    fn test_decode_logout_without_body() {
        let event = decode_event("OnLogout", r#"{"Id":"bye"}"#).unwrap();
        assert_eq!(event, QueuedEvent::new("bye", Operation::Logout));
    }

    #[test]
    fn test_non_string_id_is_missing_correlation() {
        let body = json!({ "ContractAddress": "C1", "Query": "{}" }).to_string();
        for id in [json!(6), json!(true), json!(["1"]), json!({ "v": "1" })] {
            let raw = json!({ "Id": id, "Request": body }).to_string();
            assert_eq!(
                decode_event("OnQuery", &raw),
                Err(BridgeError::MissingCorrelation("Id".into())),
                "id {}",
                id
            );
        }
    }

    #[test]
    fn test_envelope_keeps_id_when_body_is_bad() {
        let raw = envelope("keep-me", json!({ "ContractAddress": "C1" }));
        let env = decode_envelope(OperationKind::Query, &raw).unwrap();
        assert_eq!(env.id, "keep-me");
        assert_eq!(
            decode_operation(OperationKind::Query, &env),
            Err(BridgeError::MissingField("Query"))
        );
    }
}
