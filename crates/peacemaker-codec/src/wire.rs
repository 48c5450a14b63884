//! Wire shapes of the operation bodies carried in an envelope's `Request`.
//!
//! Every scalar is optional here so that absence can be reported as
//! `MissingField` instead of a generic deserialization failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use peacemaker_types::{Coin, Fee};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct EnvelopeWire {
    /// Kept loose so a non-string id reads as a missing correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LoginWire {
    pub chain_id: Option<String>,
    pub rest_url: Option<String>,
    pub rpc_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_list: Option<Vec<String>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct QueryWire {
    pub contract_address: Option<String>,
    /// String-encoded smart query.
    pub query: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ExecuteWire {
    pub sender_address: Option<String>,
    pub contract_address: Option<String>,
    /// String-encoded execute message.
    pub message: Option<String>,
    pub fee: Option<Fee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funds: Option<Vec<Coin>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginResponseWire<'a> {
    #[serde(rename = "WalletAddress")]
    pub wallet_address: &'a str,
}
