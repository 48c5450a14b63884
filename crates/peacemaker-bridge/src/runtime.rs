//! The embedding boundary: messages from the runtime, responses back into it.

use tokio::sync::mpsc;
use peacemaker_types::{BridgeError, Result};

/// Something the embedded runtime reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeMessage {
    /// A named request event (`OnLogin`, `OnQuery`, ...) with its raw envelope.
    Request { name: String, payload: String },
    /// The runtime reported an error.
    Error(String),
    /// The runtime finished loading.
    Loaded,
}

/// Sending half of the bridge mailbox. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    tx: mpsc::Sender<RuntimeMessage>,
}

impl BridgeHandle {
    pub(crate) fn new(tx: mpsc::Sender<RuntimeMessage>) -> Self {
        Self { tx }
    }

    /// Forward a runtime request event. Waits if the mailbox is full.
    pub async fn dispatch(&self, name: &str, payload: &str) -> Result<()> {
        self.send(RuntimeMessage::Request {
            name: name.to_string(),
            payload: payload.to_string(),
        })
        .await
    }

    /// Non-blocking variant of [`dispatch`](Self::dispatch) for synchronous
    /// event listeners.
    pub fn try_dispatch(&self, name: &str, payload: &str) -> Result<()> {
        self.tx
            .try_send(RuntimeMessage::Request {
                name: name.to_string(),
                payload: payload.to_string(),
            })
            .map_err(|e| BridgeError::Delivery(format!("bridge mailbox rejected request: {}", e)))
    }

    pub async fn report_error(&self, message: &str) -> Result<()> {
        self.send(RuntimeMessage::Error(message.to_string())).await
    }

    pub async fn loaded(&self) -> Result<()> {
        self.send(RuntimeMessage::Loaded).await
    }

    async fn send(&self, message: RuntimeMessage) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| BridgeError::Delivery("bridge is no longer running".into()))
    }
}

/// Delivers encoded responses into the runtime (e.g. `SendMessage` on a
/// WebGL instance).
pub trait RuntimeSink: Send + Sync {
    fn send_message(&self, target: &str, method: &str, payload: &str) -> Result<()>;
}

/// One call made on a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub target: String,
    pub method: String,
    pub payload: String,
}

/// Sink that forwards every delivery over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl RuntimeSink for ChannelSink {
    fn send_message(&self, target: &str, method: &str, payload: &str) -> Result<()> {
        self.tx
            .send(Delivery {
                target: target.to_string(),
                method: method.to_string(),
                payload: payload.to_string(),
            })
            .map_err(|_| BridgeError::Delivery("runtime receiver dropped".into()))
    }
}
