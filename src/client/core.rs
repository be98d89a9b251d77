use super::{
    ClientState, ConnectionEvent, ConnectionManager, ConnectionState, RtClientBuilder,
    RtClientOptions,
};
use crate::channel::Channel;
use crate::data::EventHandler;
use crate::infrastructure::{HeartbeatManager, RestClient, Timer, http_to_ws_endpoint};
use crate::listener::RtListener;
use crate::messaging::MessageRouter;
use crate::types::{Result, RtError, RtFault, RtMessage, methods};
use crate::websocket::{RtSocket, WebSocketFactory};
use futures::stream::{SplitStream, StreamExt};
use futures::SinkExt;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock, broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// The main entry point for Backendless realtime.
///
/// `RtClient` owns the WebSocket connection, reconnects with backoff when it
/// drops, and hands out pub/sub [`Channel`]s and data-change
/// [`EventHandler`]s that share it.
///
/// # Example
///
/// ```no_run
/// use backendless_rt::{RtClient, RtClientOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RtClient::new(RtClientOptions::new("your-app-id", "your-api-key"))?;
///
/// client.connect().await?;
/// // Use the client...
/// client.disconnect().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RtClient {
    pub(crate) options: RtClientOptions,
    pub(crate) client_id: String,

    // Connection manager
    pub(crate) connection: Arc<ConnectionManager>,

    // Subscription and method bookkeeping
    pub(crate) listener: Arc<RtListener>,

    pub(crate) rest: Arc<RestClient>,
    pub(crate) events_tx: broadcast::Sender<ConnectionEvent>,

    // Consolidated mutable state
    pub(crate) state: Arc<RwLock<ClientState>>,
}

impl RtClient {
    /// Creates a new client without connecting.
    ///
    /// # Errors
    ///
    /// Returns [`RtError::Auth`] if the application id or API key is empty.
    pub fn new(options: RtClientOptions) -> Result<Self> {
        RtClientBuilder::new(options).map(|builder| builder.build())
    }

    /// Set connection state and notify watchers
    async fn set_state(&self, new_state: ConnectionState) {
        self.connection.set_state(new_state).await;

        let state = self.state.read().await;
        state.notify_state_change(new_state, state.was_manual_disconnect);
    }

    /// Set manual disconnect flag and notify watchers
    async fn set_manual_disconnect(&self, manual: bool) {
        let mut state = self.state.write().await;
        state.was_manual_disconnect = manual;

        let conn_state = self.connection.state().await;
        state.notify_state_change(conn_state, manual);
    }

    fn emit(&self, event: ConnectionEvent) {
        // no receivers is fine
        let _ = self.events_tx.send(event);
    }

    /// Subscribes to connection lifecycle events
    pub fn connection_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events_tx.subscribe()
    }

    pub async fn try_reconnect(&self) -> Result<()> {
        let mut timer = Timer::new(self.options.reconnect_intervals.clone());
        loop {
            if self.state.read().await.was_manual_disconnect {
                tracing::info!("Manual disconnect detected, will not attempt to reconnect");
                return Ok(());
            }

            let state = self.connection.state().await;
            if state == ConnectionState::Open || state == ConnectionState::Connecting {
                tracing::info!("Already connected or connecting, stopping reconnection attempts");
                break;
            }

            let delay = timer.next_delay();
            self.emit(ConnectionEvent::ReconnectAttempt {
                attempt: timer.attempts(),
                delay_ms: delay.as_millis() as u64,
            });
            tracing::info!(
                "Reconnect attempt {} in {}ms",
                timer.attempts(),
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;

            if self.state.read().await.was_manual_disconnect {
                return Ok(());
            }

            match self.establish().await {
                Ok(()) => {
                    tracing::info!("Reconnected successfully");
                    break;
                }
                Err(e) => {
                    tracing::error!("Reconnection attempt failed: {}", e);
                }
            }
        }
        Ok(())
    }

    /// Opens the realtime connection.
    ///
    /// Resolves the realtime server (unless `rt_url` is configured), performs
    /// the WebSocket handshake, sends every subscription registered while
    /// disconnected and starts the heartbeat. Returns immediately when
    /// already open or connecting.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup or the handshake fails, or if
    /// [`disconnect()`](Self::disconnect) is called before the handshake
    /// completes. Lookup and handshake failures are also reported as
    /// [`ConnectionEvent::ConnectError`] and to error listeners.
    pub async fn connect(&self) -> Result<()> {
        self.state.write().await.was_manual_disconnect = false;
        self.establish().await
    }

    /// Connects without clearing a pending manual disconnect
    async fn establish(&self) -> Result<()> {
        {
            let state = self.connection.state().await;
            if state == ConnectionState::Open || state == ConnectionState::Connecting {
                return Ok(());
            }
        }
        self.connection.set_state(ConnectionState::Connecting).await;

        let read_half = match self.open_socket().await {
            Ok(read_half) => read_half,
            Err(e) => {
                self.connection.set_state(ConnectionState::Closed).await;
                self.emit(ConnectionEvent::ConnectError(e.to_string()));
                self.listener
                    .emit_error(RtFault::new(format!("Connection failed: {}", e)))
                    .await;
                return Err(e);
            }
        };

        // Publish Open under the state lock so a concurrent disconnect() either
        // lands before (and cancels this connect) or after (and closes it).
        {
            let state = self.state.write().await;
            if state.was_manual_disconnect {
                drop(state);
                tracing::info!("Disconnect requested during handshake, closing socket");
                self.connection.close().await?;
                return Err(RtError::Connection(
                    "disconnected while connecting".to_string(),
                ));
            }
            self.connection.set_state(ConnectionState::Open).await;
            state.notify_state_change(ConnectionState::Open, false);
        }

        self.listener.resubscribe_all().await;
        self.emit(ConnectionEvent::Connected);
        tracing::info!("Connected to realtime server");

        // The reader starts only once Open is published, so a socket that
        // closes straight away is always seen as a lost connection.
        self.start_tasks(read_half).await;
        Ok(())
    }

    /// Handshakes and starts the write task; the read half is returned unstarted
    async fn open_socket(&self) -> Result<SplitStream<RtSocket>> {
        let rt_url = match &self.options.rt_url {
            Some(url) => url.clone(),
            None => self.rest.lookup_rt_url().await?,
        };
        let user_token = self.state.read().await.user_token.clone();
        let url = self.socket_url(&rt_url, user_token.as_deref())?;
        tracing::info!("Connecting to {}", rt_url);

        let ws_stream = WebSocketFactory::create(url.as_str()).await?;
        let (mut write_half, read_half) = ws_stream.split();

        let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<Message>();
        self.connection.set_outbox(outbox_tx).await;

        // Ends when the outbox is dropped or after a close frame
        tokio::spawn(async move {
            while let Some(message) = outbox_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = write_half.send(message).await {
                    tracing::error!("WebSocket write error: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            tracing::debug!("Write task finished");
        });

        Ok(read_half)
    }

    async fn start_tasks(&self, read_half: SplitStream<RtSocket>) {
        let connection_lost = Arc::new(Notify::new());
        let router = MessageRouter::new(Arc::clone(&self.listener), Arc::clone(&self.state));
        let client = self.clone();
        let lost_signal = Arc::clone(&connection_lost);
        {
            let mut state = self.state.write().await;
            state.pending_heartbeat_ref = None;
            state.task_manager.spawn("read", async move {
                client.read_loop(read_half, router, lost_signal).await;
            });
        }

        HeartbeatManager::new(
            Arc::downgrade(&self.connection),
            Arc::clone(&self.state),
            connection_lost,
        )
        .with_interval(self.options.heartbeat_interval())
        .spawn_on(&self.state)
        .await;
    }

    async fn read_loop(
        self,
        mut read_half: SplitStream<RtSocket>,
        router: MessageRouter,
        connection_lost: Arc<Notify>,
    ) {
        tracing::info!("Starting read task");
        let reason = loop {
            tokio::select! {
                _ = connection_lost.notified() => break "heartbeat timeout".to_string(),
                next = read_half.next() => match next {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received text message: {}", text.as_str());
                        match serde_json::from_str::<RtMessage>(&text) {
                            Ok(message) => router.route(message).await,
                            Err(e) => {
                                tracing::error!(
                                    "Failed to parse message: {} - Raw: {}",
                                    e,
                                    text.as_str()
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Pong(data))) => router.handle_pong(&data).await,
                    Some(Ok(Message::Ping(data))) => {
                        tracing::debug!("Received ping ({} bytes)", data.len());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::warn!("Received unexpected binary message ({} bytes)", data.len());
                    }
                    Some(Ok(Message::Frame(_))) => {
                        tracing::debug!("Received raw frame (internal)");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break match frame {
                            Some(close_frame) => format!(
                                "server closed connection: code={:?}, reason='{}'",
                                close_frame.code,
                                close_frame.reason.as_str()
                            ),
                            None => "server closed connection".to_string(),
                        };
                    }
                    Some(Err(e)) => break format!("read error: {}", e),
                    None => break "stream ended".to_string(),
                },
            }
        };
        tracing::info!("Read task finished");

        self.handle_connection_lost(reason).await;
    }

    /// Tears down a connection that dropped without `disconnect()`
    async fn handle_connection_lost(&self, reason: String) {
        {
            let mut state = self.state.write().await;
            if state.was_manual_disconnect {
                return;
            }
            state.task_manager.abort_all();
            state.pending_heartbeat_ref = None;
        }

        tracing::warn!("Connection lost: {}", reason);
        self.connection.clear_outbox().await;
        self.listener.reset_on_disconnect().await;
        self.emit(ConnectionEvent::Disconnected(reason));
        self.set_state(ConnectionState::Closed).await;
    }

    /// Creates or retrieves the pub/sub channel with this name.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use backendless_rt::{RtClient, RtClientOptions};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client = RtClient::new(RtClientOptions::new("app-id", "api-key"))?;
    /// client.connect().await?;
    ///
    /// let channel = client.channel("default").await;
    /// channel.join().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn channel(&self, name: &str) -> Arc<Channel> {
        let state = self.state.read().await;
        for existing_channel in state.channels.iter() {
            if existing_channel.name() == name {
                return Arc::clone(existing_channel);
            }
        }
        drop(state);

        let mut state = self.state.write().await;
        // another caller may have created it while the lock was released
        if let Some(existing_channel) = state.channels.iter().find(|c| c.name() == name) {
            return Arc::clone(existing_channel);
        }
        let new_channel = Arc::new(Channel::new(name.to_string(), self.clone()));
        state.channels.push(Arc::clone(&new_channel));

        new_channel
    }

    /// Returns a data-change handler for a table
    pub fn data(&self, table: &str) -> EventHandler {
        EventHandler::new(table.to_string(), Arc::clone(&self.listener))
    }

    /// Closes the connection without reconnecting.
    ///
    /// Subscriptions are kept and sent again by the next [`connect()`](Self::connect).
    pub async fn disconnect(&self) -> Result<()> {
        // Set even when closed so a pending reconnect attempt stands down
        self.set_manual_disconnect(true).await;
        if self.connection.state().await == ConnectionState::Closed {
            return Ok(());
        }

        tracing::info!("Disconnecting from realtime server");

        {
            let mut state = self.state.write().await;
            state.task_manager.abort_all();
            state.pending_heartbeat_ref = None;
        }

        self.connection.close().await?;
        self.listener.reset_on_disconnect().await;
        self.set_state(ConnectionState::Closed).await;
        self.emit(ConnectionEvent::Disconnected("manual".to_string()));

        tracing::info!("Disconnected from realtime server");
        Ok(())
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.connection.state().await
    }

    /// Changes the user the connection acts on behalf of.
    ///
    /// The token is used for every future connect; when connected it is also
    /// applied to the live session.
    pub async fn set_user_token(&self, user_token: Option<String>) -> Result<()> {
        self.state.write().await.user_token = user_token.clone();

        if !self.is_connected().await {
            return Ok(());
        }

        self.listener
            .invoke(
                methods::SET_USER_TOKEN,
                serde_json::json!({ "userToken": user_token }),
                self.options.timeout(),
            )
            .await?;
        tracing::debug!("User token updated on live connection");
        Ok(())
    }

    /// Registers a local `ERROR` listener
    pub async fn add_error_listener(&self) -> mpsc::Receiver<RtFault> {
        self.listener.add_error_listener().await
    }

    pub fn listener(&self) -> &Arc<RtListener> {
        &self.listener
    }

    pub fn options(&self) -> &RtClientOptions {
        &self.options
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Build the WebSocket URL for a realtime server
    pub(crate) fn socket_url(&self, rt_url: &str, user_token: Option<&str>) -> Result<Url> {
        let mut url = Url::parse(&http_to_ws_endpoint(rt_url))?;

        url.path_segments_mut()
            .map_err(|_| RtError::Config(format!("Realtime URL cannot be a base: {}", rt_url)))?
            .pop_if_empty()
            .push(&self.options.app_id);

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("apiKey", &self.options.api_key)
                .append_pair("clientId", &self.client_id);
            if let Some(token) = user_token {
                query.append_pair("userToken", token);
            }
        }

        Ok(url)
    }
}
