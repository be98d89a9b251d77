use crate::client::{ClientState, ConnectionManager};
use crate::types::HEARTBEAT_INTERVAL;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Notify, RwLock};
use tokio::time;
use tokio_tungstenite::tungstenite::Message;

/// Sends WebSocket pings and declares the connection lost when one goes unanswered.
pub struct HeartbeatManager {
    interval: Duration,
    connection: Weak<ConnectionManager>,
    state: Arc<RwLock<ClientState>>,
    connection_lost: Arc<Notify>,
}

impl HeartbeatManager {
    pub fn new(
        connection: Weak<ConnectionManager>,
        state: Arc<RwLock<ClientState>>,
        connection_lost: Arc<Notify>,
    ) -> Self {
        Self {
            interval: Duration::from_millis(HEARTBEAT_INTERVAL),
            connection,
            state,
            connection_lost,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawns the heartbeat loop on the client's task manager
    pub async fn spawn_on(self, state: &Arc<RwLock<ClientState>>) {
        state
            .write()
            .await
            .task_manager
            .spawn("heartbeat", self.run());
    }

    async fn run(self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(connection) = self.connection.upgrade() else {
                break;
            };

            if !connection.is_connected().await {
                continue;
            }

            let new_ref = {
                let mut state = self.state.write().await;
                if let Some(missed) = state.pending_heartbeat_ref.take() {
                    tracing::warn!("Heartbeat {} was not acknowledged, connection lost", missed);
                    drop(state);
                    self.connection_lost.notify_one();
                    break;
                }
                let new_ref = state.make_ref();
                state.pending_heartbeat_ref = Some(new_ref.clone());
                new_ref
            };

            let ping = Message::Ping(new_ref.clone().into_bytes().into());
            match connection.send_raw(ping).await {
                Ok(()) => tracing::debug!("Sent heartbeat with ref {}", new_ref),
                Err(e) => {
                    tracing::error!("Failed to send heartbeat: {}", e);
                    self.state.write().await.pending_heartbeat_ref = None;
                }
            }
        }
    }
}
