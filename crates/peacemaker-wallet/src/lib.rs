//! Wallet and contract capabilities the bridge calls into.
//!
//! Defines the `WalletSession` trait that wallet backends implement, plus the
//! `ContractQuerier` / `ContractExecutor` capabilities a session hands out
//! once configured. Provides a `MemoryWallet` for testing and two HTTP
//! capabilities (`RestQuerier`, `BroadcastExecutor`).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use peacemaker_types::{ChainConfig, ExecuteRequest, Result, WalletAccount};

pub mod broadcast;
pub mod memory;
pub mod rest_query;

pub use broadcast::BroadcastExecutor;
pub use memory::{MemoryWallet, ScriptedExecutor, ScriptedQuerier};
pub use rest_query::RestQuerier;

/// Hex-encoded bytes (e.g. a transaction hash).
pub type Hex = String;

/// Result of a contract execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteOutcome {
    pub tx_hash: Option<Hex>,
}

/// Read-only smart contract queries.
#[async_trait]
pub trait ContractQuerier: Send + Sync {
    async fn query_contract_smart(&self, contract_address: &str, query: &Value) -> Result<Value>;
}

/// Signed contract execution.
#[async_trait]
pub trait ContractExecutor: Send + Sync {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteOutcome>;
}

/// A browser-side wallet session.
///
/// Connection state is published through a `watch` channel so a pending
/// login can suspend until a wallet connects.
#[async_trait]
pub trait WalletSession: Send + Sync {
    /// Point the session at a chain. Called by every login.
    async fn configure(&self, chain: &ChainConfig) -> Result<()>;

    /// Subscribe to connection changes. `None` means no wallet is connected.
    fn connection(&self) -> watch::Receiver<Option<WalletAccount>>;

    fn connected_account(&self) -> Option<WalletAccount> {
        self.connection().borrow().clone()
    }

    /// Show the wallet-selection prompt to the user.
    async fn open_selection(&self) -> Result<()>;

    /// Dismiss the wallet-selection prompt, if shown.
    async fn close_selection(&self);

    /// Query capability, available once the session is configured.
    fn querier(&self) -> Option<Arc<dyn ContractQuerier>>;

    /// Signing capability, available once a wallet is connected and ready.
    fn executor(&self) -> Option<Arc<dyn ContractExecutor>>;
}
