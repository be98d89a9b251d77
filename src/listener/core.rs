use super::subscription::{Subscription, SubscriptionHandle, SubscriptionSpec, SubscriptionStatus};
use crate::client::ConnectionManager;
use crate::messaging::{ListenerKind, ListenerType};
use crate::types::{
    LISTENER_BUFFER_SIZE, MethodRequest, MethodResult, Result, RtError, RtFault, RtMessage,
    SubscriptionRequest, SubscriptionResult,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc, oneshot, watch};

type MethodResponder = oneshot::Sender<Result<Value>>;

/// Bookkeeping for every subscription and method call on one connection.
///
/// The listener survives reconnects: subscriptions are kept across a dropped
/// connection and re-sent by [`resubscribe_all`](Self::resubscribe_all) once
/// the socket is open again.
pub struct RtListener {
    connection: Arc<ConnectionManager>,
    subscriptions: RwLock<HashMap<String, Subscription>>,
    pending_methods: Mutex<HashMap<String, MethodResponder>>,
    error_senders: Mutex<Vec<mpsc::Sender<RtFault>>>,
}

impl RtListener {
    pub fn new(connection: Arc<ConnectionManager>) -> Self {
        Self {
            connection,
            subscriptions: RwLock::new(HashMap::new()),
            pending_methods: Mutex::new(HashMap::new()),
            error_senders: Mutex::new(Vec::new()),
        }
    }

    /// Registers a subscription and sends it if the connection is open.
    pub async fn add_subscription(&self, spec: SubscriptionSpec) -> Result<SubscriptionHandle> {
        if spec.listener_type.kind() != ListenerKind::Subscription {
            return Err(RtError::InvalidListener(spec.listener_type));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let (status_tx, status_rx) = watch::channel(SubscriptionStatus::Pending);
        let listener_type = spec.listener_type;

        self.subscriptions.write().await.insert(
            id.clone(),
            Subscription {
                listener_type,
                options: spec.options,
                sender: spec.sender,
                observer: spec.observer,
                status_tx,
            },
        );
        tracing::debug!("Registered {} subscription {}", listener_type, id);

        if self.connection.is_connected().await {
            self.send_subscribe(&id).await;
        }

        Ok(SubscriptionHandle::new(id, listener_type, status_rx))
    }

    /// Registers a subscription delivering raw payloads to a fresh receiver.
    pub async fn subscribe(
        &self,
        listener_type: ListenerType,
        options: Value,
    ) -> Result<(SubscriptionHandle, mpsc::Receiver<Value>)> {
        let (tx, rx) = mpsc::channel(LISTENER_BUFFER_SIZE);
        let handle = self
            .add_subscription(SubscriptionSpec::new(listener_type, options).with_sender(tx))
            .await?;
        Ok((handle, rx))
    }

    async fn send_subscribe(&self, id: &str) {
        let request = {
            let subscriptions = self.subscriptions.read().await;
            let Some(subscription) = subscriptions.get(id) else {
                return;
            };
            subscription.set_status(SubscriptionStatus::Subscribing);
            SubscriptionRequest {
                id: id.to_string(),
                name: subscription.listener_type,
                options: subscription.options.clone(),
            }
        };

        let sent = match RtMessage::subscribe(&request) {
            Ok(frame) => self.connection.send_message(&frame).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = sent {
            tracing::warn!("Failed to send subscription {}: {}", id, e);
            if let Some(subscription) = self.subscriptions.read().await.get(id) {
                subscription.set_status(SubscriptionStatus::Pending);
            }
        }
    }

    /// Sends every subscription that the server does not know about yet.
    pub async fn resubscribe_all(&self) {
        let ids: Vec<String> = self
            .subscriptions
            .read()
            .await
            .iter()
            .filter(|(_, subscription)| subscription.status() == SubscriptionStatus::Pending)
            .map(|(id, _)| id.clone())
            .collect();

        if !ids.is_empty() {
            tracing::info!("Sending {} pending subscriptions", ids.len());
        }

        for id in ids {
            self.send_subscribe(&id).await;
        }
    }

    /// Applies a `SUB_RES` frame.
    pub async fn handle_subscription_result(&self, result: SubscriptionResult) {
        if let Some(fault) = result.error {
            let removed = self.subscriptions.write().await.remove(&result.id);
            let Some(subscription) = removed else {
                tracing::debug!("Fault for unknown subscription {}: {}", result.id, fault);
                return;
            };
            tracing::warn!(
                "{} subscription {} failed: {}",
                subscription.listener_type,
                result.id,
                fault
            );
            subscription.set_status(SubscriptionStatus::Failed(fault.clone()));
            self.emit_error(fault).await;
            return;
        }

        let (sender, observer, data) = {
            let subscriptions = self.subscriptions.read().await;
            let Some(subscription) = subscriptions.get(&result.id) else {
                tracing::debug!("Result for unknown subscription {}", result.id);
                return;
            };

            if subscription.status() != SubscriptionStatus::Active {
                subscription.set_status(SubscriptionStatus::Active);
                tracing::info!(
                    "{} subscription {} is active",
                    subscription.listener_type,
                    result.id
                );
            }

            match result.data {
                None | Some(Value::Null) => return,
                Some(data) => (
                    subscription.sender.clone(),
                    subscription.observer.clone(),
                    data,
                ),
            }
        };

        if let Some(observer) = observer {
            observer(&data);
        }

        if let Some(sender) = sender
            && let Err(e) = sender.send(data).await
        {
            tracing::warn!(
                "Failed to deliver payload for subscription {}: {}. Receiver may be closed.",
                result.id,
                e
            );
        }
    }

    /// Stops a subscription, returning whether it existed.
    ///
    /// The subscription is removed before `SUB_OFF` is sent, so a send error
    /// still leaves it stopped.
    pub async fn stop_subscription(&self, id: &str) -> Result<bool> {
        let removed = self.subscriptions.write().await.remove(id);
        let Some(subscription) = removed else {
            return Ok(false);
        };

        tracing::debug!("Stopping {} subscription {}", subscription.listener_type, id);

        if subscription.was_sent() && self.connection.is_connected().await {
            self.connection
                .send_message(&RtMessage::unsubscribe(id))
                .await?;
        }

        Ok(true)
    }

    /// Stops every subscription of `listener_type` whose options match.
    pub async fn stop_matching<F>(&self, listener_type: ListenerType, predicate: F) -> Result<usize>
    where
        F: Fn(&Value) -> bool,
    {
        let ids: Vec<String> = self
            .subscriptions
            .read()
            .await
            .iter()
            .filter(|(_, s)| s.listener_type == listener_type && predicate(&s.options))
            .map(|(id, _)| id.clone())
            .collect();

        Ok(self.stop_each(ids).await)
    }

    /// Stops every subscription. Returns how many were stopped.
    pub async fn stop_all(&self) -> Result<usize> {
        let ids: Vec<String> = self.subscriptions.read().await.keys().cloned().collect();
        Ok(self.stop_each(ids).await)
    }

    /// Removes each subscription locally even when its `SUB_OFF` cannot be sent.
    async fn stop_each(&self, ids: Vec<String>) -> usize {
        let mut stopped = 0;
        for id in ids {
            match self.stop_subscription(&id).await {
                Ok(true) => stopped += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Stopped subscription {} without SUB_OFF: {}", id, e);
                    stopped += 1;
                }
            }
        }
        stopped
    }

    /// Returns subscriptions to `Pending` and fails in-flight method calls.
    pub async fn reset_on_disconnect(&self) {
        for subscription in self.subscriptions.read().await.values() {
            if subscription.was_sent() {
                subscription.set_status(SubscriptionStatus::Pending);
            }
        }

        let pending: Vec<MethodResponder> = self
            .pending_methods
            .lock()
            .await
            .drain()
            .map(|(_, responder)| responder)
            .collect();
        if !pending.is_empty() {
            tracing::debug!("Failing {} in-flight method calls", pending.len());
        }
        for responder in pending {
            let _ = responder.send(Err(RtError::NotConnected));
        }
    }

    pub async fn subscription_count(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    pub async fn subscription_status(&self, id: &str) -> Option<SubscriptionStatus> {
        self.subscriptions.read().await.get(id).map(Subscription::status)
    }

    /// Registers a local `ERROR` listener.
    pub async fn add_error_listener(&self) -> mpsc::Receiver<RtFault> {
        let (tx, rx) = mpsc::channel(LISTENER_BUFFER_SIZE);
        self.error_senders.lock().await.push(tx);
        rx
    }

    /// Delivers a fault to every error listener.
    pub async fn emit_error(&self, fault: RtFault) {
        let mut senders = self.error_senders.lock().await;
        senders.retain(|tx| !tx.is_closed());

        if senders.is_empty() {
            tracing::error!("Realtime error with no listener: {}", fault);
            return;
        }

        for tx in senders.iter() {
            if let Err(e) = tx.try_send(fault.clone()) {
                tracing::warn!("Dropped error notification: {}", e);
            }
        }
    }

    /// Sends a `MET_REQ` and waits for the matching `MET_RES`.
    pub async fn invoke(&self, name: &str, options: Value, timeout: Duration) -> Result<Value> {
        if !self.connection.is_connected().await {
            return Err(RtError::NotConnected);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let frame = RtMessage::method(&MethodRequest {
            id: id.clone(),
            name: name.to_string(),
            options,
        })?;

        let (tx, rx) = oneshot::channel();
        self.pending_methods.lock().await.insert(id.clone(), tx);

        if let Err(e) = self.connection.send_message(&frame).await {
            self.pending_methods.lock().await.remove(&id);
            return Err(e);
        }
        tracing::debug!("Invoked {} as {}", name, id);

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RtError::Connection(format!(
                "method call {} was dropped",
                id
            ))),
            Err(_) => {
                self.pending_methods.lock().await.remove(&id);
                tracing::warn!("Method {} ({}) timed out", name, id);
                Err(RtError::Timeout)
            }
        }
    }

    /// Applies a `MET_RES` frame.
    pub async fn handle_method_result(&self, result: MethodResult) {
        let Some(responder) = self.pending_methods.lock().await.remove(&result.id) else {
            tracing::debug!("Result for unknown method call {}", result.id);
            return;
        };

        let outcome = match result.error {
            Some(fault) => Err(RtError::Fault(fault)),
            None => Ok(result.result.unwrap_or(Value::Null)),
        };

        if responder.send(outcome).is_err() {
            tracing::debug!("Caller of method {} is gone", result.id);
        }
    }
}
