//! In-memory wallet session for testing and local runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::watch;

use crate::*;
use crate::rest_query::RestQuerier;
use peacemaker_types::{BridgeError, ChainConfig, ExecuteRequest, Result, WalletAccount};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory wallet session.
///
/// The caller plays the user: it watches for the selection prompt with
/// [`MemoryWallet::wait_for_prompt`] and answers with [`MemoryWallet::connect`].
///
/// Queries go to the scripted querier when one is set. Otherwise every
/// `configure` installs a [`RestQuerier`] for the chain's REST endpoint.
pub struct MemoryWallet {
    connection: watch::Sender<Option<WalletAccount>>,
    prompts_opened: watch::Sender<usize>,
    prompts_closed: Mutex<usize>,
    chains: Mutex<Vec<ChainConfig>>,
    querier: Mutex<Option<Arc<dyn ContractQuerier>>>,
    chain_querier: Mutex<Option<Arc<RestQuerier>>>,
    executor: Mutex<Option<Arc<dyn ContractExecutor>>>,
}

impl MemoryWallet {
    pub fn new() -> Self {
        let (connection, _) = watch::channel(None);
        let (prompts_opened, _) = watch::channel(0);
        Self {
            connection,
            prompts_opened,
            prompts_closed: Mutex::new(0),
            chains: Mutex::new(Vec::new()),
            querier: Mutex::new(None),
            chain_querier: Mutex::new(None),
            executor: Mutex::new(None),
        }
    }

    pub fn with_querier(self, querier: Arc<dyn ContractQuerier>) -> Self {
        *lock(&self.querier) = Some(querier);
        self
    }

    pub fn with_executor(self, executor: Arc<dyn ContractExecutor>) -> Self {
        *lock(&self.executor) = Some(executor);
        self
    }

    /// Simulate the user connecting a wallet.
    pub fn connect(&self, address: &str, wallet: &str) {
        self.connection.send_replace(Some(WalletAccount {
            address: address.to_string(),
            wallet: wallet.to_string(),
        }));
    }

    pub fn disconnect(&self) {
        self.connection.send_replace(None);
    }

    pub fn prompts_opened(&self) -> usize {
        *self.prompts_opened.borrow()
    }

    pub fn prompts_closed(&self) -> usize {
        *lock(&self.prompts_closed)
    }

    /// Chains passed to `configure`, oldest first.
    pub fn configured_chains(&self) -> Vec<ChainConfig> {
        lock(&self.chains).clone()
    }

    /// REST querier installed by the last `configure`, if any.
    pub fn chain_querier(&self) -> Option<Arc<RestQuerier>> {
        lock(&self.chain_querier).clone()
    }

    /// Wait until at least `count` selection prompts have been opened.
    pub async fn wait_for_prompt(&self, count: usize) {
        let mut rx = self.prompts_opened.subscribe();
        // The sender lives in `self`, so this only fails if `self` is gone.
        let _ = rx.wait_for(|opened| *opened >= count).await;
    }
}

impl Default for MemoryWallet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletSession for MemoryWallet {
    async fn configure(&self, chain: &ChainConfig) -> Result<()> {
        if lock(&self.querier).is_none() {
            let querier = RestQuerier::for_chain(chain)?;
            *lock(&self.chain_querier) = Some(Arc::new(querier));
        }
        lock(&self.chains).push(chain.clone());
        Ok(())
    }

    fn connection(&self) -> watch::Receiver<Option<WalletAccount>> {
        self.connection.subscribe()
    }

    async fn open_selection(&self) -> Result<()> {
        self.prompts_opened.send_modify(|n| *n += 1);
        Ok(())
    }

    async fn close_selection(&self) {
        *lock(&self.prompts_closed) += 1;
    }

    fn querier(&self) -> Option<Arc<dyn ContractQuerier>> {
        if let Some(scripted) = lock(&self.querier).clone() {
            return Some(scripted);
        }
        lock(&self.chain_querier)
            .clone()
            .map(|q| q as Arc<dyn ContractQuerier>)
    }

    fn executor(&self) -> Option<Arc<dyn ContractExecutor>> {
        lock(&self.executor).clone()
    }
}

/// Querier that replays scripted answers and records every call.
///
/// When the script runs dry it answers `null`.
pub struct ScriptedQuerier {
    script: Mutex<VecDeque<Result<Value>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedQuerier {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(self, result: Result<Value>) -> Self {
        lock(&self.script).push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        lock(&self.calls).clone()
    }
}

impl Default for ScriptedQuerier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContractQuerier for ScriptedQuerier {
    async fn query_contract_smart(&self, contract_address: &str, query: &Value) -> Result<Value> {
        lock(&self.calls).push((contract_address.to_string(), query.clone()));
        lock(&self.script)
            .pop_front()
            .unwrap_or(Ok(Value::Null))
    }
}

/// Executor that replays scripted outcomes and records every request.
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<Result<ExecuteOutcome>>>,
    calls: Mutex<Vec<ExecuteRequest>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(self, result: Result<ExecuteOutcome>) -> Self {
        lock(&self.script).push_back(result);
        self
    }

    pub fn fail_with(self, message: &str) -> Self {
        self.respond(Err(BridgeError::Other(message.to_string())))
    }

    pub fn calls(&self) -> Vec<ExecuteRequest> {
        lock(&self.calls).clone()
    }
}

impl Default for ScriptedExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContractExecutor for ScriptedExecutor {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteOutcome> {
        lock(&self.calls).push(request.clone());
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| Ok(ExecuteOutcome::default()))
    }
}
