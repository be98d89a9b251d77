use crate::messaging::ListenerType;
use crate::types::{Result, RtError, RtFault};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Synchronous hook that sees every delivery before it is forwarded.
pub type Observer = Arc<dyn Fn(&Value) + Send + Sync + 'static>;

/// Subscription lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionStatus {
    /// Registered locally, not yet sent
    Pending,
    /// `SUB_ON` sent, waiting for the server
    Subscribing,
    /// Confirmed by the server
    Active,
    /// Rejected by the server
    Failed(RtFault),
}

/// Everything needed to register a subscription
pub struct SubscriptionSpec {
    pub listener_type: ListenerType,
    pub options: Value,
    pub sender: Option<mpsc::Sender<Value>>,
    pub observer: Option<Observer>,
}

impl SubscriptionSpec {
    pub fn new(listener_type: ListenerType, options: Value) -> Self {
        Self {
            listener_type,
            options,
            sender: None,
            observer: None,
        }
    }

    pub fn with_sender(mut self, sender: mpsc::Sender<Value>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
        self
    }
}

/// Stored subscription
pub(crate) struct Subscription {
    pub listener_type: ListenerType,
    pub options: Value,
    pub sender: Option<mpsc::Sender<Value>>,
    pub observer: Option<Observer>,
    pub status_tx: watch::Sender<SubscriptionStatus>,
}

impl Subscription {
    pub fn status(&self) -> SubscriptionStatus {
        self.status_tx.borrow().clone()
    }

    pub fn set_status(&self, status: SubscriptionStatus) {
        self.status_tx.send_replace(status);
    }

    /// Whether the server knows about this subscription
    pub fn was_sent(&self) -> bool {
        matches!(
            self.status(),
            SubscriptionStatus::Subscribing | SubscriptionStatus::Active
        )
    }
}

/// Caller-side view of a registered subscription
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: String,
    listener_type: ListenerType,
    status_rx: watch::Receiver<SubscriptionStatus>,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        id: String,
        listener_type: ListenerType,
        status_rx: watch::Receiver<SubscriptionStatus>,
    ) -> Self {
        Self {
            id,
            listener_type,
            status_rx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn listener_type(&self) -> ListenerType {
        self.listener_type
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.status_rx.borrow().clone()
    }

    /// Waits until the server confirms or rejects the subscription.
    ///
    /// Returns [`RtError::Channel`] if the subscription is stopped before either
    /// happens.
    pub async fn ready(&mut self) -> Result<()> {
        loop {
            let status = self.status_rx.borrow_and_update().clone();
            if let Some(outcome) = Self::outcome(status) {
                return outcome;
            }

            if self.status_rx.changed().await.is_err() {
                let status = self.status_rx.borrow().clone();
                return Self::outcome(status).unwrap_or_else(|| {
                    Err(RtError::Channel(format!(
                        "subscription {} was removed before it became active",
                        self.id
                    )))
                });
            }
        }
    }

    fn outcome(status: SubscriptionStatus) -> Option<Result<()>> {
        match status {
            SubscriptionStatus::Active => Some(Ok(())),
            SubscriptionStatus::Failed(fault) => Some(Err(RtError::Fault(fault))),
            SubscriptionStatus::Pending | SubscriptionStatus::Subscribing => None,
        }
    }
}
