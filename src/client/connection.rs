use crate::types::{RtError, RtMessage, error::Result};
use tokio::sync::{RwLock, mpsc};
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
    Closing,
}

/// Owns the outgoing side of the socket.
///
/// Frames are queued on an unbounded channel drained by the client's write task,
/// so senders never hold a lock across socket I/O.
pub struct ConnectionManager {
    outbox: RwLock<Option<mpsc::UnboundedSender<Message>>>,
    state: RwLock<ConnectionState>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            outbox: RwLock::new(None),
            state: RwLock::new(ConnectionState::Closed),
        }
    }

    /// Sets the outgoing queue (called after successful connection)
    pub async fn set_outbox(&self, outbox: mpsc::UnboundedSender<Message>) {
        *self.outbox.write().await = Some(outbox);
    }

    /// Gets the current connection state
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Sets the connection state
    pub async fn set_state(&self, new_state: ConnectionState) {
        *self.state.write().await = new_state;
    }

    /// Checks if currently connected
    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Open
    }

    /// Serializes and queues a frame
    pub async fn send_message(&self, msg: &RtMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        tracing::debug!("Sending frame: {}", json);
        self.send_raw(Message::Text(json.into())).await
    }

    /// Queues a raw WebSocket message (pings, close frames)
    pub async fn send_raw(&self, message: Message) -> Result<()> {
        let outbox = self.outbox.read().await;
        match outbox.as_ref() {
            Some(tx) => tx
                .send(message)
                .map_err(|_| RtError::Connection("write task has stopped".to_string())),
            None => Err(RtError::NotConnected),
        }
    }

    /// Closes the WebSocket connection gracefully
    pub async fn close(&self) -> Result<()> {
        self.set_state(ConnectionState::Closing).await;

        if let Some(tx) = self.outbox.write().await.take() {
            if tx.send(Message::Close(None)).is_err() {
                tracing::debug!("Write task already stopped before close frame");
            }
        }

        self.set_state(ConnectionState::Closed).await;

        Ok(())
    }

    /// Clears the outgoing queue (used during disconnect)
    pub async fn clear_outbox(&self) {
        *self.outbox.write().await = None;
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
