use super::payloads::{ChannelUser, CommandEvent, PubSubMessage, UserStatusEvent};
use super::presence::Presence;
use super::state::{ChannelState, ChannelStatus};
use crate::client::RtClient;
use crate::infrastructure::PublishStatus;
use crate::listener::{EventReceiver, SubscriptionSpec};
use crate::messaging::ListenerType;
use crate::types::{LISTENER_BUFFER_SIZE, PUB_SUB_COMMAND_TYPE, Result, RtError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{RwLock, mpsc};

const CHANNEL_LISTENER_TYPES: [ListenerType; 4] = [
    ListenerType::PubSubConnect,
    ListenerType::PubSubMessages,
    ListenerType::PubSubCommands,
    ListenerType::PubSubUsers,
];

/// A publish/subscribe channel.
///
/// Channels let you:
/// - **Receive messages** published to the channel, optionally narrowed by a selector
/// - **Exchange commands** with the other connections in the channel
/// - **Track users** joining and leaving
///
/// Listeners can be added before [`join()`](Self::join); they are registered
/// with the server when the channel is joined.
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
/// let channel = client.channel("chat").await;
/// let mut messages = channel.add_message_listener(None).await?;
/// channel.join().await?;
///
/// while let Some(Ok(message)) = messages.recv().await {
///     println!("{}: {}", message.publisher_id.unwrap_or_default(), message.data);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Channel {
    name: String,
    client: RtClient,
    pub(crate) state: Arc<RwLock<ChannelState>>,
    presence: Arc<Mutex<Presence>>,
}

impl Channel {
    pub fn new(name: String, client: RtClient) -> Self {
        Self {
            name,
            client,
            state: Arc::new(RwLock::new(ChannelState::new())),
            presence: Arc::new(Mutex::new(Presence::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn base_options(&self) -> Value {
        serde_json::json!({ "channel": self.name })
    }

    fn belongs_here(&self, options: &Value) -> bool {
        options.get("channel").and_then(Value::as_str) == Some(self.name.as_str())
    }

    pub async fn status(&self) -> ChannelStatus {
        self.state.read().await.status()
    }

    pub async fn is_joined(&self) -> bool {
        self.status().await == ChannelStatus::Joined
    }

    /// Joins the channel.
    ///
    /// When connected, waits for the server to confirm the join. When
    /// disconnected, the join is sent on the next connect and this returns
    /// immediately. Calling `join()` on a joined or joining channel is a no-op.
    ///
    /// # Errors
    ///
    /// - [`RtError::Fault`] if the server rejects the join
    /// - [`RtError::Timeout`] if no confirmation arrives within the client timeout
    pub async fn join(&self) -> Result<()> {
        let mut handle = {
            let mut state = self.state.write().await;
            if matches!(
                state.status(),
                ChannelStatus::Joining | ChannelStatus::Joined
            ) {
                return Ok(());
            }

            let listener = &self.client.listener;
            let handle = listener
                .add_subscription(SubscriptionSpec::new(
                    ListenerType::PubSubConnect,
                    self.base_options(),
                ))
                .await?;
            state.connect_handle = Some(handle.clone());

            let deferred = std::mem::take(&mut state.deferred);
            if !deferred.is_empty() {
                tracing::debug!(
                    "Registering {} deferred listeners on channel {}",
                    deferred.len(),
                    self.name
                );
            }
            for spec in deferred {
                listener.add_subscription(spec).await?;
            }

            handle
        };

        tracing::info!("Joining channel: {}", self.name);

        if !self.client.is_connected().await {
            return Ok(());
        }

        match tokio::time::timeout(self.client.options.timeout(), handle.ready()).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Join of channel {} timed out", self.name);
                Err(RtError::Timeout)
            }
        }
    }

    /// Leaves the channel and stops every listener registered on it.
    pub async fn leave(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if state.connect_handle.take().is_none() {
            return Ok(());
        }

        for listener_type in CHANNEL_LISTENER_TYPES {
            self.client
                .listener
                .stop_matching(listener_type, |options| self.belongs_here(options))
                .await?;
        }
        drop(state);

        if let Ok(mut presence) = self.presence.lock() {
            presence.clear();
        }

        tracing::info!("Left channel: {}", self.name);
        Ok(())
    }

    async fn add_listener<T: DeserializeOwned>(
        &self,
        spec: SubscriptionSpec,
    ) -> Result<EventReceiver<T>> {
        let (tx, rx) = mpsc::channel(LISTENER_BUFFER_SIZE);
        let spec = spec.with_sender(tx);

        let mut state = self.state.write().await;
        if state.connect_handle.is_some() {
            self.client.listener.add_subscription(spec).await?;
        } else {
            tracing::debug!(
                "Deferring {} listener until channel {} is joined",
                spec.listener_type,
                self.name
            );
            state.deferred.push(spec);
        }

        Ok(EventReceiver::new(rx))
    }

    /// Listens for published messages, optionally narrowed by a selector
    /// query evaluated by the server against message headers.
    pub async fn add_message_listener(
        &self,
        selector: Option<&str>,
    ) -> Result<EventReceiver<PubSubMessage>> {
        let mut options = self.base_options();
        if let Some(selector) = selector {
            options["selector"] = Value::from(selector);
        }
        self.add_listener(SubscriptionSpec::new(ListenerType::PubSubMessages, options))
            .await
    }

    pub async fn add_command_listener(&self) -> Result<EventReceiver<CommandEvent>> {
        self.add_listener(SubscriptionSpec::new(
            ListenerType::PubSubCommands,
            self.base_options(),
        ))
        .await
    }

    /// Listens for users joining and leaving; also keeps [`users()`](Self::users) current.
    pub async fn add_user_status_listener(&self) -> Result<EventReceiver<UserStatusEvent>> {
        let presence = Arc::clone(&self.presence);
        let channel_name = self.name.clone();

        let spec = SubscriptionSpec::new(ListenerType::PubSubUsers, self.base_options())
            .with_observer(move |value| {
                let Ok(event) = serde_json::from_value::<UserStatusEvent>(value.clone()) else {
                    tracing::warn!("Malformed user status on channel {}", channel_name);
                    return;
                };
                if let Ok(mut presence) = presence.lock() {
                    let changes = presence.apply(&event);
                    tracing::debug!(
                        "Presence on {}: {} joined, {} left",
                        channel_name,
                        changes.joins.len(),
                        changes.leaves.len()
                    );
                }
            });

        self.add_listener(spec).await
    }

    async fn remove_listeners<F>(&self, listener_type: ListenerType, predicate: F) -> Result<usize>
    where
        F: Fn(&Value) -> bool,
    {
        let matches = |spec_type: ListenerType, options: &Value| {
            spec_type == listener_type && self.belongs_here(options) && predicate(options)
        };

        let mut state = self.state.write().await;
        let before = state.deferred.len();
        state
            .deferred
            .retain(|spec| !matches(spec.listener_type, &spec.options));
        let removed_deferred = before - state.deferred.len();
        drop(state);

        let stopped = self
            .client
            .listener
            .stop_matching(listener_type, |options| matches(listener_type, options))
            .await?;

        Ok(removed_deferred + stopped)
    }

    /// Removes message listeners; with `selector` only those registered with it
    pub async fn remove_message_listeners(&self, selector: Option<&str>) -> Result<usize> {
        self.remove_listeners(ListenerType::PubSubMessages, |options| match selector {
            Some(selector) => options.get("selector").and_then(Value::as_str) == Some(selector),
            None => true,
        })
        .await
    }

    pub async fn remove_command_listeners(&self) -> Result<usize> {
        self.remove_listeners(ListenerType::PubSubCommands, |_| true)
            .await
    }

    pub async fn remove_user_status_listeners(&self) -> Result<usize> {
        let removed = self
            .remove_listeners(ListenerType::PubSubUsers, |_| true)
            .await?;
        if let Ok(mut presence) = self.presence.lock() {
            presence.clear();
        }
        Ok(removed)
    }

    /// Sends a command to the other connections in the channel.
    ///
    /// # Errors
    ///
    /// Returns [`RtError::Channel`] if the channel is not joined.
    pub async fn send_command(&self, command_type: &str, data: Value) -> Result<Value> {
        if !self.is_joined().await {
            return Err(RtError::Channel(format!(
                "cannot send command, channel '{}' is not joined",
                self.name
            )));
        }

        let options = serde_json::json!({
            "channel": self.name,
            "type": command_type,
            "data": data,
        });

        tracing::debug!("Sending command {} to channel {}", command_type, self.name);
        self.client
            .listener
            .invoke(PUB_SUB_COMMAND_TYPE, options, self.client.options.timeout())
            .await
    }

    /// Publishes a message through the REST API.
    ///
    /// Works whether or not the realtime connection is open.
    pub async fn publish(
        &self,
        message: Value,
        headers: Option<HashMap<String, String>>,
    ) -> Result<PublishStatus> {
        self.client.rest.publish(&self.name, message, headers).await
    }

    /// Users currently known to be present.
    ///
    /// Populated only while a user status listener is registered.
    pub fn users(&self) -> Vec<ChannelUser> {
        self.presence
            .lock()
            .map(|presence| presence.list())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ConnectionState, RtClientOptions};
    use crate::listener::SubscriptionStatus;
    use crate::messaging::ProtocolEvent;
    use crate::types::{MethodResult, RtMessage, SubscriptionResult};
    use serde_json::json;
    use tokio_tungstenite::tungstenite::Message;

    async fn open_client() -> (RtClient, mpsc::UnboundedReceiver<Message>) {
        let client = RtClient::new(RtClientOptions::new("APP", "KEY")).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        client.connection.set_outbox(tx).await;
        client.connection.set_state(ConnectionState::Open).await;
        (client, rx)
    }

    async fn next_frame(rx: &mut mpsc::UnboundedReceiver<Message>) -> RtMessage {
        loop {
            match rx.recv().await {
                Some(Message::Text(text)) => return serde_json::from_str(&text).unwrap(),
                Some(_) => continue,
                None => panic!("outbox closed"),
            }
        }
    }

    async fn confirm(client: &RtClient, id: &str) {
        client
            .listener
            .handle_subscription_result(SubscriptionResult {
                id: id.to_string(),
                data: None,
                error: None,
            })
            .await;
    }

    #[tokio::test]
    async fn test_deferred_listeners_follow_join() {
        let (client, mut frames) = open_client().await;
        let channel = client.channel("chat").await;

        channel.add_message_listener(Some("city = 'Dallas'")).await.unwrap();
        channel.add_command_listener().await.unwrap();
        assert!(frames.try_recv().is_err());
        assert_eq!(channel.status().await, ChannelStatus::Closed);

        let joining = Arc::clone(&channel);
        let join = tokio::spawn(async move { joining.join().await });

        let connect = next_frame(&mut frames).await;
        assert_eq!(connect.data["name"], "PUB_SUB_CONNECT");
        assert_eq!(connect.data["options"], json!({ "channel": "chat" }));

        let messages = next_frame(&mut frames).await;
        assert_eq!(messages.data["name"], "PUB_SUB_MESSAGES");
        assert_eq!(messages.data["options"]["selector"], "city = 'Dallas'");
        let commands = next_frame(&mut frames).await;
        assert_eq!(commands.data["name"], "PUB_SUB_COMMANDS");

        confirm(&client, connect.data["id"].as_str().unwrap()).await;
        join.await.unwrap().unwrap();
        assert!(channel.is_joined().await);
    }

    #[tokio::test]
    async fn test_join_rejected_by_server() {
        let (client, mut frames) = open_client().await;
        let channel = client.channel("secret").await;

        let joining = Arc::clone(&channel);
        let join = tokio::spawn(async move { joining.join().await });

        let connect = next_frame(&mut frames).await;
        client
            .listener
            .handle_subscription_result(SubscriptionResult {
                id: connect.data["id"].as_str().unwrap().to_string(),
                data: None,
                error: Some(crate::types::RtFault::new("not allowed")),
            })
            .await;

        assert!(matches!(join.await.unwrap(), Err(RtError::Fault(_))));
        assert_eq!(channel.status().await, ChannelStatus::Errored);
    }

    #[tokio::test]
    async fn test_join_while_disconnected_returns_immediately() {
        let client = RtClient::new(RtClientOptions::new("APP", "KEY")).unwrap();
        let channel = client.channel("chat").await;

        channel.join().await.unwrap();
        assert_eq!(channel.status().await, ChannelStatus::Joining);
        let handle = channel.state.read().await.connect_handle.clone().unwrap();
        assert_eq!(handle.status(), SubscriptionStatus::Pending);

        // second join is a no-op
        channel.join().await.unwrap();
        assert_eq!(client.listener.subscription_count().await, 1);
    }

    #[tokio::test]
    async fn test_send_command_requires_join() {
        let (client, _frames) = open_client().await;
        let channel = client.channel("chat").await;

        let result = channel.send_command("TYPING_START", json!({})).await;
        assert!(matches!(result, Err(RtError::Channel(_))));
    }

    #[tokio::test]
    async fn test_send_command_invokes_method() {
        let (client, mut frames) = open_client().await;
        let channel = client.channel("chat").await;

        let joining = Arc::clone(&channel);
        let join = tokio::spawn(async move { joining.join().await });
        let connect = next_frame(&mut frames).await;
        confirm(&client, connect.data["id"].as_str().unwrap()).await;
        join.await.unwrap().unwrap();

        let sender = Arc::clone(&channel);
        let send = tokio::spawn(async move {
            sender
                .send_command("TYPING_START", json!({ "field": "subject" }))
                .await
        });

        let request = next_frame(&mut frames).await;
        assert_eq!(request.event, ProtocolEvent::MetReq);
        assert_eq!(request.data["name"], "PUB_SUB_COMMAND");
        assert_eq!(
            request.data["options"],
            json!({ "channel": "chat", "type": "TYPING_START", "data": { "field": "subject" } })
        );

        client
            .listener
            .handle_method_result(MethodResult {
                id: request.data["id"].as_str().unwrap().to_string(),
                result: None,
                error: None,
            })
            .await;
        assert_eq!(send.await.unwrap().unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_user_status_listener_tracks_presence() {
        let (client, mut frames) = open_client().await;
        let channel = client.channel("chat").await;
        let joining = Arc::clone(&channel);
        let join = tokio::spawn(async move { joining.join().await });
        let connect = next_frame(&mut frames).await;
        confirm(&client, connect.data["id"].as_str().unwrap()).await;
        join.await.unwrap().unwrap();

        let mut statuses = channel.add_user_status_listener().await.unwrap();

        let users_frame = loop {
            let frame = next_frame(&mut frames).await;
            if frame.data["name"] == "PUB_SUB_USERS" {
                break frame;
            }
        };

        client
            .listener
            .handle_subscription_result(SubscriptionResult {
                id: users_frame.data["id"].as_str().unwrap().to_string(),
                data: Some(json!({
                    "status": "LISTING",
                    "data": [{ "connectionId": "c-1", "userId": "alice" }]
                })),
                error: None,
            })
            .await;

        let event = statuses.recv().await.unwrap().unwrap();
        assert_eq!(event.data.len(), 1);
        assert_eq!(
            channel.users(),
            vec![ChannelUser {
                connection_id: "c-1".to_string(),
                user_id: Some("alice".to_string()),
            }]
        );
    }

    #[tokio::test]
    async fn test_leave_stops_channel_subscriptions_only() {
        let (client, mut frames) = open_client().await;
        let chat = client.channel("chat").await;
        let news = client.channel("news").await;

        for channel in [&chat, &news] {
            let joining = Arc::clone(channel);
            let join = tokio::spawn(async move { joining.join().await });
            let connect = next_frame(&mut frames).await;
            confirm(&client, connect.data["id"].as_str().unwrap()).await;
            join.await.unwrap().unwrap();
            channel.add_message_listener(None).await.unwrap();
            next_frame(&mut frames).await;
        }
        assert_eq!(client.listener.subscription_count().await, 4);

        chat.leave().await.unwrap();
        assert_eq!(chat.status().await, ChannelStatus::Closed);
        assert_eq!(client.listener.subscription_count().await, 2);
        assert!(news.is_joined().await);

        // leaving twice is fine
        chat.leave().await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_message_listeners_by_selector() {
        let client = RtClient::new(RtClientOptions::new("APP", "KEY")).unwrap();
        let channel = client.channel("chat").await;

        channel.add_message_listener(Some("a = 1")).await.unwrap();
        channel.add_message_listener(Some("b = 2")).await.unwrap();
        channel.add_message_listener(None).await.unwrap();

        assert_eq!(channel.remove_message_listeners(Some("a = 1")).await.unwrap(), 1);
        assert_eq!(channel.remove_message_listeners(None).await.unwrap(), 2);
        assert!(channel.state.read().await.deferred.is_empty());
    }

    #[tokio::test]
    async fn test_leave_clears_listeners_when_socket_is_gone() {
        let (client, mut frames) = open_client().await;
        let channel = client.channel("chat").await;

        let joining = Arc::clone(&channel);
        let join = tokio::spawn(async move { joining.join().await });
        let connect = next_frame(&mut frames).await;
        confirm(&client, connect.data["id"].as_str().unwrap()).await;
        join.await.unwrap().unwrap();
        channel.add_message_listener(None).await.unwrap();
        channel.add_command_listener().await.unwrap();

        // SUB_OFF frames can no longer be queued
        drop(frames);

        channel.leave().await.unwrap();
        assert_eq!(channel.status().await, ChannelStatus::Closed);
        assert_eq!(client.listener.subscription_count().await, 0);
    }
}
