//! Response encoder, plus the runtime-side mirror of the wire format.

use serde_json::Value;
use peacemaker_types::{BridgeError, Operation, OutboundEnvelope, Result};

use crate::wire::{EnvelopeWire, ExecuteWire, LoginResponseWire, LoginWire, QueryWire};

/// Serialize an outbound envelope to `{"Id","Response","Error"}`.
pub fn encode_response(envelope: &OutboundEnvelope) -> Result<String> {
    serde_json::to_string(envelope)
        .map_err(|e| BridgeError::Other(format!("failed to encode response {}: {}", envelope.id, e)))
}

/// Login success payload: `{"WalletAddress": "<address>"}`.
pub fn login_response(address: &str) -> Result<String> {
    serde_json::to_string(&LoginResponseWire { wallet_address: address })
        .map_err(|e| BridgeError::Other(format!("failed to encode login response: {}", e)))
}

/// Query success payload: the contract's answer, string-encoded.
pub fn query_response(result: &Value) -> String {
    result.to_string()
}

/// Encode a request the way the runtime sends it. Returns the event name and
/// the envelope string.
pub fn encode_request(id: &str, operation: &Operation) -> Result<(&'static str, String)> {
    let body = match operation {
        Operation::Login(req) => to_json(&LoginWire {
            chain_id: Some(req.chain_id.clone()),
            rest_url: Some(req.rest_url.clone()),
            rpc_url: Some(req.rpc_url.clone()),
            wallet_list: req.wallet_list.clone(),
        })?,
        Operation::Logout => String::new(),
        Operation::Query(req) => to_json(&QueryWire {
            contract_address: Some(req.contract_address.clone()),
            query: Some(req.query.to_string()),
        })?,
        Operation::Execute(req) => to_json(&ExecuteWire {
            sender_address: Some(req.sender_address.clone()),
            contract_address: Some(req.contract_address.clone()),
            message: Some(req.message.to_string()),
            fee: Some(req.fee.clone()),
            memo: req.memo.clone(),
            funds: req.funds.clone(),
        })?,
    };

    let envelope = to_json(&EnvelopeWire {
        id: Some(Value::String(id.to_string())),
        request: Some(body),
    })?;
    Ok((operation.kind().event_name(), envelope))
}

/// Decode a response the way the runtime receives it.
pub fn decode_response(raw: &str) -> Result<OutboundEnvelope> {
    serde_json::from_str(raw)
        .map_err(|e| BridgeError::MalformedPayload(format!("response is not an envelope: {}", e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| BridgeError::Other(e.to_string()))
}
