//! Operation handlers: Login, Query, Execute.
//!
//! Each handler takes the validated request, calls one wallet capability and
//! returns its result. None of them retry; resubmission is the runtime's call.

use serde_json::Value;
use tracing::{debug, info};

use peacemaker_types::{BridgeError, ExecuteRequest, LoginRequest, QueryRequest, Result, WalletAccount};
use peacemaker_wallet::{ExecuteOutcome, WalletSession};

use crate::supervisor::LoginSupervisor;

/// What a handler may touch.
pub struct HandlerContext<'a> {
    pub wallet: &'a dyn WalletSession,
    pub supervisor: &'a LoginSupervisor,
    pub default_wallets: &'a [String],
}

/// How a login succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// A wallet was already connected; no prompt was shown.
    AlreadyConnected(WalletAccount),
    /// The user connected a wallet through the selection prompt.
    Connected(WalletAccount),
}

impl LoginOutcome {
    pub fn account(&self) -> &WalletAccount {
        match self {
            LoginOutcome::AlreadyConnected(account) | LoginOutcome::Connected(account) => account,
        }
    }
}

/// Configure the session for the requested chain, then resolve with the
/// connected account, prompting the user if nobody is connected yet.
pub async fn login(ctx: &HandlerContext<'_>, req: &LoginRequest) -> Result<LoginOutcome> {
    let chain = req.chain_config(ctx.default_wallets);
    ctx.wallet.configure(&chain).await?;

    if let Some(account) = ctx.wallet.connected_account() {
        debug!(address = %account.address, "Wallet already connected, skipping prompt");
        return Ok(LoginOutcome::AlreadyConnected(account));
    }

    let pending = ctx.supervisor.arm()?;
    let connection = ctx.wallet.connection();
    ctx.wallet.open_selection().await?;

    info!(
        chain_id = %chain.chain_id,
        wallets = ?chain.wallets,
        timeout_ms = ctx.supervisor.timeout().as_millis() as u64,
        "Awaiting wallet selection"
    );

    match pending.wait_for_connection(connection).await {
        Ok(account) => {
            info!(address = %account.address, wallet = %account.wallet, "Wallet connected");
            Ok(LoginOutcome::Connected(account))
        }
        Err(e) => {
            ctx.wallet.close_selection().await;
            Err(e)
        }
    }
}

/// Single read-only smart query.
pub async fn query(ctx: &HandlerContext<'_>, req: &QueryRequest) -> Result<Value> {
    let querier = ctx.wallet.querier().ok_or(BridgeError::QueryClientUnavailable)?;
    querier.query_contract_smart(&req.contract_address, &req.query).await
}

/// Single signed execution. Fails before any network call when no signing
/// capability is ready.
pub async fn execute(ctx: &HandlerContext<'_>, req: &ExecuteRequest) -> Result<ExecuteOutcome> {
    let executor = ctx.wallet.executor().ok_or(BridgeError::SigningClientUnavailable)?;
    executor.execute(req).await
}
