//! Smart queries against a chain's REST (LCD) endpoint.
//!
//! - GET {rest_url}/cosmwasm/wasm/v1/contract/{address}/smart/{base64(query)}

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE as BASE64_URL_SAFE;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::ContractQuerier;
use peacemaker_types::{BridgeError, ChainConfig, Result};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(20);

/// `QuerySmartContractStateResponse`.
#[derive(Debug, Clone, Deserialize)]
pub struct SmartQueryResponse {
    pub data: Value,
}

/// gRPC-gateway error body (`{"code", "message", "details"}`).
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayError {
    pub code: Option<i32>,
    pub message: Option<String>,
}

/// Querier bound to one chain's REST endpoint.
#[derive(Debug, Clone)]
pub struct RestQuerier {
    rest_url: String,
    client: reqwest::Client,
}

impl RestQuerier {
    pub fn new(rest_url: &str, client: reqwest::Client) -> Self {
        Self { rest_url: rest_url.trim_end_matches('/').to_string(), client }
    }

    /// Querier for `chain` with its own client and [`DEFAULT_QUERY_TIMEOUT`].
    pub fn for_chain(chain: &ChainConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_QUERY_TIMEOUT)
            .build()
            .map_err(|e| BridgeError::Http(format!("cannot build REST client: {}", e)))?;
        Ok(Self::new(&chain.rest_url, client))
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    /// Contract addresses come from the runtime, so they are escaped before
    /// landing in the path. Bech32 addresses pass through unchanged.
    pub fn smart_query_url(&self, contract_address: &str, query: &Value) -> String {
        format!(
            "{}/cosmwasm/wasm/v1/contract/{}/smart/{}",
            self.rest_url,
            utf8_percent_encode(contract_address, NON_ALPHANUMERIC),
            BASE64_URL_SAFE.encode(query.to_string()),
        )
    }
}

#[async_trait]
impl ContractQuerier for RestQuerier {
    async fn query_contract_smart(&self, contract_address: &str, query: &Value) -> Result<Value> {
        let url = self.smart_query_url(contract_address, query);
        debug!(contract = contract_address, rest_url = %self.rest_url, "Smart query");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BridgeError::Http(format!("query request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            // Prefer the gateway's message; fall back to the raw body.
            let message = serde_json::from_str::<GatewayError>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            return Err(BridgeError::Http(format!("query returned status {}: {}", status, message)));
        }

        resp.json::<SmartQueryResponse>()
            .await
            .map(|r| r.data)
            .map_err(|e| BridgeError::Http(format!("failed to parse query response: {}", e)))
    }
}
