//! Timeout supervisor for the interactive login wait.
//!
//! One login may wait for wallet selection at a time. Arming returns a guard;
//! the guard bounds the wait and releases the slot when dropped, whether the
//! wait connected, timed out or was abandoned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use peacemaker_types::{BridgeError, Result, WalletAccount};

#[derive(Debug)]
pub struct LoginSupervisor {
    timeout: Duration,
    pending: AtomicBool,
}

impl LoginSupervisor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout, pending: AtomicBool::new(false) }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Start the timer for a new login wait.
    pub fn arm(&self) -> Result<PendingLogin<'_>> {
        if self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BridgeError::AlreadyAwaitingLogin);
        }
        Ok(PendingLogin {
            supervisor: self,
            deadline: Instant::now() + self.timeout,
        })
    }
}

/// An armed login wait. Dropping it cancels the timer.
#[derive(Debug)]
pub struct PendingLogin<'a> {
    supervisor: &'a LoginSupervisor,
    deadline: Instant,
}

impl PendingLogin<'_> {
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Wait until the watched session reports a connected account, or fail
    /// with `Timeout` once the deadline passes.
    pub async fn wait_for_connection(
        &self,
        mut connection: watch::Receiver<Option<WalletAccount>>,
    ) -> Result<WalletAccount> {
        let connected = tokio::time::timeout_at(
            self.deadline,
            connection.wait_for(|account| account.is_some()),
        )
        .await
        .map_err(|_| BridgeError::Timeout)?
        .map_err(|_| BridgeError::WalletUnavailable("wallet session closed".into()))?;

        connected
            .clone()
            .ok_or_else(|| BridgeError::WalletUnavailable("wallet disconnected".into()))
    }
}

impl Drop for PendingLogin<'_> {
    fn drop(&mut self) {
        self.supervisor.pending.store(false, Ordering::Release);
    }
}
