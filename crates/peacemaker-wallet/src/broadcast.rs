//! Contract execution through a remote signer.
//!
//! The signer holds the account keys. It receives one `MsgExecuteContract`,
//! signs and broadcasts it, and answers with the Cosmos `tx_response`:
//!
//! - POST {signer_url}/v1/sign_and_broadcast

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{ContractExecutor, ExecuteOutcome, Hex};
use peacemaker_types::{BridgeError, ChainConfig, Coin, ExecuteRequest, Fee, Result};

pub const MSG_EXECUTE_CONTRACT: &str = "/cosmwasm.wasm.v1.MsgExecuteContract";

/// `MsgExecuteContract` value. `funds` is always present on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MsgExecuteContract {
    pub sender: String,
    pub contract: String,
    pub msg: Value,
    pub funds: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnyMsg {
    pub type_url: String,
    pub value: MsgExecuteContract,
}

/// Body of a sign-and-broadcast call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignAndBroadcast {
    pub chain_id: String,
    pub msgs: Vec<AnyMsg>,
    pub fee: Fee,
    /// Cosmos memos are plain strings; no memo is `""`.
    pub memo: String,
}

impl SignAndBroadcast {
    pub fn execute(chain_id: &str, req: &ExecuteRequest) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            msgs: vec![AnyMsg {
                type_url: MSG_EXECUTE_CONTRACT.to_string(),
                value: MsgExecuteContract {
                    sender: req.sender_address.clone(),
                    contract: req.contract_address.clone(),
                    msg: req.message.clone(),
                    funds: req.funds.clone().unwrap_or_default(),
                },
            }],
            fee: req.fee.clone(),
            memo: req.memo.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastResponse {
    pub tx_response: TxResponse,
}

/// The part of a Cosmos `TxResponse` the bridge reads.
#[derive(Debug, Clone, Deserialize)]
pub struct TxResponse {
    pub txhash: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub codespace: String,
    #[serde(default)]
    pub raw_log: String,
}

impl TxResponse {
    /// A non-zero code means the chain rejected the transaction (CheckTx).
    pub fn into_result(self) -> Result<Hex> {
        if self.code != 0 {
            return Err(BridgeError::Other(format!(
                "transaction {} rejected ({}/{}): {}",
                self.txhash, self.codespace, self.code, self.raw_log
            )));
        }
        normalize_tx_hash(&self.txhash)
    }
}

/// Executor bound to one chain and one remote signer.
pub struct BroadcastExecutor {
    endpoint: String,
    chain_id: String,
    client: reqwest::Client,
}

impl BroadcastExecutor {
    pub fn new(signer_url: &str, chain: &ChainConfig, client: reqwest::Client) -> Self {
        Self {
            endpoint: format!("{}/v1/sign_and_broadcast", signer_url.trim_end_matches('/')),
            chain_id: chain.chain_id.clone(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ContractExecutor for BroadcastExecutor {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteOutcome> {
        let body = SignAndBroadcast::execute(&self.chain_id, request);
        debug!(
            chain_id = %self.chain_id,
            contract = %request.contract_address,
            funds = request.funds.as_ref().map_or(0, Vec::len),
            "Broadcasting execute"
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| BridgeError::Http(format!("signer unreachable: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = %status, "Signer refused execute");
            return Err(BridgeError::Http(format!("signer answered {}: {}", status, text)));
        }

        let broadcast: BroadcastResponse = resp
            .json()
            .await
            .map_err(|e| BridgeError::Http(format!("unreadable broadcast response: {}", e)))?;

        let tx_hash = broadcast.tx_response.into_result()?;
        Ok(ExecuteOutcome { tx_hash: Some(tx_hash) })
    }
}

/// Check that `raw` is a 32-byte hash and render it the way Cosmos explorers
/// do: bare uppercase hex.
pub fn normalize_tx_hash(raw: &str) -> Result<Hex> {
    let digits = raw.trim_start_matches("0x");
    match hex::decode(digits) {
        Ok(bytes) if bytes.len() == 32 => Ok(hex::encode_upper(bytes)),
        Ok(bytes) => Err(BridgeError::Other(format!(
            "tx hash {} has {} bytes, want 32",
            raw,
            bytes.len()
        ))),
        Err(e) => Err(BridgeError::Other(format!("tx hash {} is not hex: {}", raw, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_http::{local_client, serve_once};
    use serde_json::json;

    fn chain() -> ChainConfig {
        ChainConfig {
            chain_id: "atlantic-2".into(),
            rest_url: "https://rest.atlantic-2.seinetwork.io".into(),
            rpc_url: "https://rpc.atlantic-2.seinetwork.io".into(),
            wallets: vec!["compass".into()],
        }
    }

    fn request(memo: Option<&str>, funds: Option<Vec<Coin>>) -> ExecuteRequest {
        ExecuteRequest {
            sender_address: "sei1sender".into(),
            contract_address: "sei1contract".into(),
            message: json!({ "claim": {} }),
            fee: Fee { amount: vec![Coin::new("2000", "usei")], gas: "200000".into() },
            memo: memo.map(String::from),
            funds,
        }
    }

    #[test]
    fn test_normalize_tx_hash() {
        let lower = "ab".repeat(32);
        assert_eq!(normalize_tx_hash(&lower).unwrap(), "AB".repeat(32));
        assert_eq!(normalize_tx_hash(&format!("0x{}", lower)).unwrap(), "AB".repeat(32));

        assert!(normalize_tx_hash("ABCD").is_err());
        assert!(normalize_tx_hash("not-a-hash").is_err());
    }

    #[test]
    fn test_missing_memo_and_funds_use_cosmos_defaults() {
        let body = serde_json::to_value(SignAndBroadcast::execute("atlantic-2", &request(None, None))).unwrap();
        assert_eq!(
            body,
            json!({
                "chain_id": "atlantic-2",
                "msgs": [{
                    "type_url": "/cosmwasm.wasm.v1.MsgExecuteContract",
                    "value": {
                        "sender": "sei1sender",
                        "contract": "sei1contract",
                        "msg": { "claim": {} },
                        "funds": []
                    }
                }],
                "fee": { "amount": [{ "amount": "2000", "denom": "usei" }], "gas": "200000" },
                "memo": ""
            })
        );
    }

    #[test]
    fn test_rejected_tx_surfaces_raw_log() {
        let tx: TxResponse = serde_json::from_value(json!({
            "txhash": "CD".repeat(32),
            "code": 5,
            "codespace": "sdk",
            "raw_log": "insufficient funds"
        }))
        .unwrap();
        let err = tx.into_result().unwrap_err();
        assert!(err.to_string().ends_with("(sdk/5): insufficient funds"), "{}", err);
    }

    #[tokio::test]
    async fn test_execute_posts_message_and_returns_hash() {
        let hash = "9f".repeat(32);
        let reply = json!({ "tx_response": { "txhash": hash, "code": 0 } }).to_string();
        let (base, captured) = serve_once(200, reply).await;

        let executor = BroadcastExecutor::new(&format!("{}/", base), &chain(), local_client());
        let outcome = executor
            .execute(&request(Some("claim"), Some(vec![Coin::new("5", "usei")])))
            .await
            .unwrap();
        assert_eq!(outcome.tx_hash, Some("9F".repeat(32)));

        let seen = captured.await.unwrap();
        assert_eq!(seen.request_line, "POST /v1/sign_and_broadcast HTTP/1.1");
        let body: Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(body["chain_id"], "atlantic-2");
        assert_eq!(body["memo"], "claim");
        assert_eq!(body["msgs"][0]["value"]["funds"], json!([{ "amount": "5", "denom": "usei" }]));
    }

    #[tokio::test]
    async fn test_execute_reports_signer_status() {
        let (base, _captured) = serve_once(503, "signer locked".to_string()).await;

        let executor = BroadcastExecutor::new(&base, &chain(), local_client());
        let err = executor.execute(&request(None, None)).await.unwrap_err();
        assert!(matches!(err, BridgeError::Http(_)));
        assert!(err.to_string().contains("503"), "{}", err);
        assert!(err.to_string().ends_with("signer locked"), "{}", err);
    }
}
