use super::ProtocolEvent;
use crate::client::ClientState;
use crate::listener::RtListener;
use crate::types::{MethodResult, RtFault, RtMessage, SubscriptionResult};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Routes incoming frames to the listener
pub struct MessageRouter {
    listener: Arc<RtListener>,
    state: Arc<RwLock<ClientState>>,
}

impl MessageRouter {
    pub fn new(listener: Arc<RtListener>, state: Arc<RwLock<ClientState>>) -> Self {
        Self { listener, state }
    }

    /// Routes a frame to the appropriate handler
    pub async fn route(&self, message: RtMessage) {
        tracing::debug!(
            "Routing frame: event={}, data={}",
            message.event,
            serde_json::to_string(&message.data).unwrap_or_default()
        );

        match message.event {
            ProtocolEvent::SubRes => {
                match serde_json::from_value::<SubscriptionResult>(message.data) {
                    Ok(result) => self.listener.handle_subscription_result(result).await,
                    Err(e) => tracing::error!("Malformed SUB_RES frame: {}", e),
                }
            }
            ProtocolEvent::MetRes => match serde_json::from_value::<MethodResult>(message.data) {
                Ok(result) => self.listener.handle_method_result(result).await,
                Err(e) => tracing::error!("Malformed MET_RES frame: {}", e),
            },
            ProtocolEvent::Error => {
                let fault = serde_json::from_value::<RtFault>(message.data.clone())
                    .unwrap_or_else(|_| RtFault::new(message.data.to_string()));
                tracing::warn!("Server reported error: {}", fault);
                self.listener.emit_error(fault).await;
            }
            event @ (ProtocolEvent::SubOn | ProtocolEvent::SubOff | ProtocolEvent::MetReq) => {
                tracing::warn!("Ignoring client-only event {} from server", event);
            }
            ProtocolEvent::Unknown(event) => {
                tracing::warn!("Ignoring unknown event {}", event);
            }
        }
    }

    /// Clears the pending heartbeat when a pong echoes its ref
    pub async fn handle_pong(&self, payload: &[u8]) {
        let state = self.state.read().await;
        let matches = state
            .pending_heartbeat_ref
            .as_ref()
            .is_some_and(|pending| pending.as_bytes() == payload);
        drop(state);

        if matches {
            let mut state = self.state.write().await;
            if let Some(acked) = state.pending_heartbeat_ref.take() {
                tracing::debug!("Received heartbeat ack for ref {}", acked);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ConnectionManager, ConnectionState};
    use crate::listener::SubscriptionStatus;
    use crate::messaging::ListenerType;
    use serde_json::json;
    use tokio::sync::mpsc;

    type Fixture = (
        MessageRouter,
        Arc<RtListener>,
        Arc<RwLock<ClientState>>,
        mpsc::UnboundedReceiver<tungstenite::Message>,
    );

    async fn router() -> Fixture {
        let connection = Arc::new(ConnectionManager::new());
        let (tx, frames) = mpsc::unbounded_channel();
        connection.set_outbox(tx).await;
        connection.set_state(ConnectionState::Open).await;

        let listener = Arc::new(RtListener::new(connection));
        let state = Arc::new(RwLock::new(ClientState::new()));
        (
            MessageRouter::new(Arc::clone(&listener), Arc::clone(&state)),
            listener,
            state,
            frames,
        )
    }

    #[tokio::test]
    async fn test_routes_sub_res_to_listener() {
        let (router, listener, _, _frames) = router().await;
        let (handle, mut rx) = listener
            .subscribe(ListenerType::PubSubMessages, json!({ "channel": "c" }))
            .await
            .unwrap();

        let frame: RtMessage = serde_json::from_value(json!({
            "event": "SUB_RES",
            "data": { "id": handle.id(), "data": { "message": "hi" } }
        }))
        .unwrap();
        router.route(frame).await;

        assert_eq!(rx.recv().await.unwrap(), json!({ "message": "hi" }));
        assert_eq!(handle.status(), SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn test_routes_error_frame_to_error_listeners() {
        let (router, listener, _, _frames) = router().await;
        let mut errors = listener.add_error_listener().await;

        router
            .route(RtMessage::new(ProtocolEvent::Error, json!("bad api key")))
            .await;
        router
            .route(RtMessage::new(
                ProtocolEvent::Error,
                json!({ "code": 3064, "message": "not allowed" }),
            ))
            .await;

        assert_eq!(errors.recv().await.unwrap(), RtFault::new("bad api key"));
        assert_eq!(
            errors.recv().await.unwrap(),
            RtFault::new("not allowed").with_code(3064)
        );
    }

    #[tokio::test]
    async fn test_unknown_events_are_ignored() {
        let (router, listener, _, _frames) = router().await;
        router
            .route(RtMessage::new(
                ProtocolEvent::Unknown("PING".to_string()),
                json!({}),
            ))
            .await;
        assert_eq!(listener.subscription_count().await, 0);
    }

    #[tokio::test]
    async fn test_pong_clears_matching_heartbeat() {
        let (router, _, state, _frames) = router().await;
        state.write().await.pending_heartbeat_ref = Some("7".to_string());

        router.handle_pong(b"6").await;
        assert_eq!(state.read().await.pending_heartbeat_ref.as_deref(), Some("7"));

        router.handle_pong(b"7").await;
        assert!(state.read().await.pending_heartbeat_ref.is_none());
    }
}
