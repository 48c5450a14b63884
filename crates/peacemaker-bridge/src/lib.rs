//! Correlated request/response bridge between an embedded game runtime and a
//! browser wallet session.
//!
//! Flow per runtime event:
//! - decode (`peacemaker-codec`), reporting malformed payloads without queueing
//! - enqueue in arrival order
//! - a single consumer pops one event, runs its handler to completion
//!   (including any wallet-selection wait), then encodes and delivers the
//!   response tagged with the event's id
//!
//! The mailbox stays open while a handler runs: runtime signals reach the
//! callbacks at once and new requests join the queue behind the current one.

pub mod config;
pub mod handlers;
pub mod queue;
pub mod runtime;
pub mod supervisor;
pub mod telemetry;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use peacemaker_codec::{
    decode_envelope, decode_kind, decode_operation, encode_response, login_response, query_response,
};
use peacemaker_types::{
    BridgeError, CorrelationId, Operation, OperationKind, OutboundEnvelope, QueuedEvent, Result,
};
use peacemaker_wallet::WalletSession;

pub use config::{BridgeCallbacks, BridgeConfig, TimeoutPolicy};
pub use handlers::{HandlerContext, LoginOutcome};
pub use queue::CorrelationQueue;
pub use runtime::{BridgeHandle, ChannelSink, Delivery, RuntimeMessage, RuntimeSink};
pub use supervisor::{LoginSupervisor, PendingLogin};

/// A handler's answer for one event, not yet encoded.
struct Handled {
    id: CorrelationId,
    kind: OperationKind,
    result: Result<String>,
}

/// Everything a running handler reads. Shared while the mailbox is drained.
struct BridgeCore {
    config: BridgeConfig,
    callbacks: BridgeCallbacks,
    wallet: Arc<dyn WalletSession>,
    sink: Arc<dyn RuntimeSink>,
    supervisor: LoginSupervisor,
}

impl BridgeCore {
    fn accept(&self, queue: &mut CorrelationQueue, message: RuntimeMessage) {
        match message {
            RuntimeMessage::Request { name, payload } => self.enqueue(queue, &name, &payload),
            RuntimeMessage::Error(message) => {
                error!(message = %message, "Runtime reported an error");
                self.callbacks.runtime_error(&message);
            }
            RuntimeMessage::Loaded => {
                info!("Runtime loaded");
                self.callbacks.runtime_loaded();
            }
        }
    }

    /// Decode and queue a request. Failures never reach a handler; when the
    /// envelope id is readable the runtime gets an error response for it.
    fn enqueue(&self, queue: &mut CorrelationQueue, name: &str, payload: &str) {
        let kind = match decode_kind(name) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(event = name, error = %e, "Dropping runtime event");
                return;
            }
        };

        let envelope = match decode_envelope(kind, payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(operation = %kind, error = %e, "Dropping request without usable envelope");
                return;
            }
        };

        match decode_operation(kind, &envelope) {
            Ok(operation) => {
                debug!(
                    id = %envelope.id,
                    operation = %kind,
                    pending = queue.len() + 1,
                    "Event queued"
                );
                queue.push(QueuedEvent::new(envelope.id, operation));
            }
            Err(e) => {
                warn!(id = %envelope.id, operation = %kind, error = %e, "Rejecting malformed request");
                self.deliver(OutboundEnvelope::failure(envelope.id, &e));
            }
        }
    }

    /// Run the handler for one event. `None` for events that get no response.
    async fn handle(&self, event: QueuedEvent) -> Option<Handled> {
        let QueuedEvent { id, operation } = event;
        let kind = operation.kind();
        debug!(id = %id, operation = %kind, "Processing event");

        let ctx = HandlerContext {
            wallet: self.wallet.as_ref(),
            supervisor: &self.supervisor,
            default_wallets: &self.config.default_wallets,
        };

        let result = match &operation {
            Operation::Logout => {
                debug!(id = %id, "Logout has no handler, discarding");
                return None;
            }
            Operation::Login(req) => handlers::login(&ctx, req)
                .await
                .and_then(|outcome| login_response(&outcome.account().address)),
            Operation::Query(req) => handlers::query(&ctx, req)
                .await
                .map(|value| query_response(&value)),
            Operation::Execute(req) => handlers::execute(&ctx, req).await.map(|outcome| {
                if let Some(tx_hash) = outcome.tx_hash {
                    info!(id = %id, tx_hash = %tx_hash, "Execute confirmed");
                }
                String::new()
            }),
        };

        Some(Handled { id, kind, result })
    }

    fn deliver(&self, envelope: OutboundEnvelope) {
        let payload = match encode_response(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                error!(id = %envelope.id, error = %e, "Failed to encode response");
                return;
            }
        };

        if let Err(e) = self.sink.send_message(
            &self.config.response_target,
            &self.config.response_method,
            &payload,
        ) {
            error!(id = %envelope.id, error = %e, "Failed to deliver response to runtime");
        }
    }
}

/// The bridge consumer. Build with [`Bridge::new`], drive with [`Bridge::run`].
pub struct Bridge {
    core: BridgeCore,
    inbox: mpsc::Receiver<RuntimeMessage>,
    inbox_open: bool,
    queue: CorrelationQueue,
}

impl Bridge {
    pub fn new(
        config: BridgeConfig,
        callbacks: BridgeCallbacks,
        wallet: Arc<dyn WalletSession>,
        sink: Arc<dyn RuntimeSink>,
    ) -> Result<(Self, BridgeHandle)> {
        config.validate()?;

        let (tx, inbox) = mpsc::channel(config.inbox_capacity);
        let supervisor = LoginSupervisor::new(config.timeout());
        let bridge = Self {
            core: BridgeCore { config, callbacks, wallet, sink, supervisor },
            inbox,
            inbox_open: true,
            queue: CorrelationQueue::new(),
        };
        Ok((bridge, BridgeHandle::new(tx)))
    }

    /// Consume runtime messages until shutdown or until every handle is dropped.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            target_object = %self.core.config.response_target,
            method = %self.core.config.response_method,
            timeout_ms = self.core.config.timeout_ms,
            "Starting bridge loop"
        );

        while self.inbox_open && !shutdown.is_cancelled() {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Received shutdown signal, stopping bridge");
                }
                message = self.inbox.recv() => match message {
                    Some(message) => {
                        self.core.accept(&mut self.queue, message);
                        self.drain(&shutdown).await;
                    }
                    None => {
                        info!("All bridge handles dropped, stopping bridge");
                        self.inbox_open = false;
                    }
                },
            }
        }

        if !self.queue.is_empty() {
            warn!(
                pending = self.queue.len(),
                ids = ?self.queue.pending_ids(),
                "Bridge stopped with unprocessed events"
            );
        }
        info!("Bridge stopped");
        Ok(())
    }

    /// Process queued events until the queue is empty, reading the mailbox
    /// alongside each handler.
    async fn drain(&mut self, shutdown: &CancellationToken) {
        loop {
            self.pull_inbox();

            let Some(event) = self.queue.pop_front() else {
                break;
            };
            let id = event.id.clone();
            let kind = event.kind();

            let handled = {
                let handling = self.core.handle(event);
                tokio::pin!(handling);

                loop {
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break None,
                        handled = &mut handling => break Some(handled),
                        message = self.inbox.recv(), if self.inbox_open => match message {
                            Some(message) => self.core.accept(&mut self.queue, message),
                            None => self.inbox_open = false,
                        },
                    }
                }
            };

            match handled {
                Some(Some(handled)) => self.finish(handled),
                Some(None) => {}
                None => {
                    warn!(id = %id, operation = %kind, "Shutdown while processing event, no response sent");
                    if kind == OperationKind::Login {
                        self.core.wallet.close_selection().await;
                    }
                    break;
                }
            }
        }
    }

    fn pull_inbox(&mut self) {
        while let Ok(message) = self.inbox.try_recv() {
            self.core.accept(&mut self.queue, message);
        }
    }

    fn finish(&mut self, handled: Handled) {
        let Handled { id, kind, result } = handled;
        let envelope = match result {
            Ok(response) => OutboundEnvelope::success(id, response),
            Err(e) => {
                error!(id = %id, operation = %kind, error = %e, "Operation failed");
                if e == BridgeError::Timeout {
                    self.abandon_after_timeout();
                }
                OutboundEnvelope::failure(id, &e)
            }
        };
        self.core.deliver(envelope);
    }

    /// Apply the timeout policy once a login wait has expired.
    fn abandon_after_timeout(&mut self) {
        if self.core.config.timeout_policy != TimeoutPolicy::AbandonQueue {
            return;
        }

        let mut abandoned = self.queue.clear().into_iter().map(|e| e.id).collect::<Vec<_>>();
        let mut unqueued = 0usize;
        while let Ok(message) = self.inbox.try_recv() {
            match message {
                RuntimeMessage::Request { .. } => unqueued += 1,
                other => self.core.accept(&mut self.queue, other),
            }
        }

        if !abandoned.is_empty() || unqueued > 0 {
            abandoned.sort_unstable();
            warn!(
                queued = abandoned.len(),
                unqueued,
                ids = ?abandoned,
                "Login timed out, abandoning pending events"
            );
        }
    }
}
