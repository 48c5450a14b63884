//! Shared types for the Peacemaker runtime bridge.
//!
//! Everything that crosses a crate boundary lives here: the error taxonomy,
//! the decoded request variants, the queued event and the outbound envelope.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Opaque correlation token pairing a runtime request with its response.
pub type CorrelationId = String;

/// Bridge error types.
///
/// The `Display` form is what the runtime receives in the `Error` field of an
/// outbound envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("missing correlation: {0}")]
    MissingCorrelation(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Signing client unavailable")]
    SigningClientUnavailable,

    #[error("Query client unavailable")]
    QueryClientUnavailable,

    #[error("Timeout")]
    Timeout,

    #[error("a login is already awaiting wallet selection")]
    AlreadyAwaitingLogin,

    #[error("wallet unavailable: {0}")]
    WalletUnavailable(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("{0}")]
    Http(String),

    #[error("{0}")]
    Other(String),
}

impl BridgeError {
    /// True for failures raised while decoding an inbound payload.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            BridgeError::MalformedPayload(_)
                | BridgeError::MissingCorrelation(_)
                | BridgeError::MissingField(_)
                | BridgeError::UnknownOperation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

/// A single coin amount (`{"amount": "...", "denom": "..."}` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub amount: String,
    pub denom: String,
}

impl Coin {
    pub fn new(amount: impl Into<String>, denom: impl Into<String>) -> Self {
        Self { amount: amount.into(), denom: denom.into() }
    }
}

/// Transaction fee attached to an execute request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas: String,
}

/// Chain the wallet session is configured against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: String,
    pub rest_url: String,
    pub rpc_url: String,
    /// Wallet identifiers offered in the selection prompt, in display order.
    pub wallets: Vec<String>,
}

/// The account of a connected wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAccount {
    pub address: String,
    /// Identifier of the wallet that holds the account (e.g. "compass").
    pub wallet: String,
}

/// Raw inbound envelope, after the outer decode and before the body decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEnvelope {
    pub id: CorrelationId,
    /// Operation body, still string-encoded. Empty for bodiless operations.
    pub request: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub chain_id: String,
    pub rest_url: String,
    pub rpc_url: String,
    pub wallet_list: Option<Vec<String>>,
}

impl LoginRequest {
    /// Build the chain configuration, falling back to `default_wallets`
    /// when the request names none.
    pub fn chain_config(&self, default_wallets: &[String]) -> ChainConfig {
        let wallets = match &self.wallet_list {
            Some(list) if !list.is_empty() => list.clone(),
            _ => default_wallets.to_vec(),
        };
        ChainConfig {
            chain_id: self.chain_id.clone(),
            rest_url: self.rest_url.clone(),
            rpc_url: self.rpc_url.clone(),
            wallets,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub contract_address: String,
    /// Decoded smart query message.
    pub query: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteRequest {
    pub sender_address: String,
    pub contract_address: String,
    /// Decoded execute message.
    pub message: Value,
    pub fee: Fee,
    pub memo: Option<String>,
    pub funds: Option<Vec<Coin>>,
}

/// Operation discriminator, named after the runtime event that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Login,
    Logout,
    Query,
    Execute,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Login,
        OperationKind::Logout,
        OperationKind::Query,
        OperationKind::Execute,
    ];

    pub fn event_name(self) -> &'static str {
        match self {
            OperationKind::Login => "OnLogin",
            OperationKind::Logout => "OnLogout",
            OperationKind::Query => "OnQuery",
            OperationKind::Execute => "OnExecute",
        }
    }

    pub fn from_event_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.event_name() == name)
    }

    /// Whether the envelope must carry a non-empty `Request` body.
    pub fn requires_body(self) -> bool {
        !matches!(self, OperationKind::Logout)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_name())
    }
}

/// A validated request, one variant per operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Login(LoginRequest),
    Logout,
    Query(QueryRequest),
    Execute(ExecuteRequest),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Login(_) => OperationKind::Login,
            Operation::Logout => OperationKind::Logout,
            Operation::Query(_) => OperationKind::Query,
            Operation::Execute(_) => OperationKind::Execute,
        }
    }
}

/// An event waiting in the correlation queue. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedEvent {
    pub id: CorrelationId,
    pub operation: Operation,
}

impl QueuedEvent {
    pub fn new(id: impl Into<CorrelationId>, operation: Operation) -> Self {
        Self { id: id.into(), operation }
    }

    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }
}

/// Response delivered back to the runtime, tagged with the originating id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    #[serde(rename = "Id")]
    pub id: CorrelationId,
    #[serde(rename = "Response", default)]
    pub response: String,
    #[serde(rename = "Error", default)]
    pub error: String,
}

impl OutboundEnvelope {
    pub fn success(id: impl Into<CorrelationId>, response: impl Into<String>) -> Self {
        Self { id: id.into(), response: response.into(), error: String::new() }
    }

    pub fn failure(id: impl Into<CorrelationId>, error: &BridgeError) -> Self {
        Self { id: id.into(), response: String::new(), error: error.to_string() }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_roundtrip() {
        for kind in OperationKind::ALL {
            assert_eq!(OperationKind::from_event_name(kind.event_name()), Some(kind));
        }
        assert_eq!(OperationKind::from_event_name("OnTransfer"), None);
        assert_eq!(OperationKind::from_event_name(""), None);
    }

    #[test]
    fn test_error_messages_reach_runtime_verbatim() {
        let timeout = OutboundEnvelope::failure("7", &BridgeError::Timeout);
        assert_eq!(timeout.error, "Timeout");
        assert!(timeout.response.is_empty());

        let signing = OutboundEnvelope::failure("8", &BridgeError::SigningClientUnavailable);
        assert_eq!(signing.error, "Signing client unavailable");
        assert!(signing.is_error());
    }

    #[test]
    fn test_login_chain_config_defaults_wallets() {
        let defaults = vec!["compass".to_string()];
        let mut req = LoginRequest {
            chain_id: "atlantic-2".into(),
            rest_url: "https://rest.atlantic-2.seinetwork.io".into(),
            rpc_url: "https://rpc.atlantic-2.seinetwork.io".into(),
            wallet_list: None,
        };
        assert_eq!(req.chain_config(&defaults).wallets, defaults);

        req.wallet_list = Some(vec!["keplr".into(), "leap".into()]);
        assert_eq!(req.chain_config(&defaults).wallets, vec!["keplr", "leap"]);
    }

    #[test]
    fn test_decode_errors_are_classified() {
        assert!(BridgeError::MissingField("ChainId").is_decode_error());
        assert!(BridgeError::UnknownOperation("OnFoo".into()).is_decode_error());
        assert!(!BridgeError::Timeout.is_decode_error());
    }
}
