use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::RtFault;
use crate::messaging::{ListenerType, ProtocolEvent};

/// Envelope of every frame exchanged with the realtime server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RtMessage {
    pub event: ProtocolEvent,
    #[serde(default)]
    pub data: Value,
}

impl RtMessage {
    pub fn new(event: ProtocolEvent, data: Value) -> Self {
        Self { event, data }
    }

    pub fn subscribe(request: &SubscriptionRequest) -> serde_json::Result<Self> {
        Ok(Self::new(ProtocolEvent::SubOn, serde_json::to_value(request)?))
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(ProtocolEvent::SubOff, serde_json::json!({ "id": id }))
    }

    pub fn method(request: &MethodRequest) -> serde_json::Result<Self> {
        Ok(Self::new(ProtocolEvent::MetReq, serde_json::to_value(request)?))
    }
}

/// `SUB_ON` payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionRequest {
    pub id: String,
    pub name: ListenerType,
    #[serde(default)]
    pub options: Value,
}

/// `SUB_RES` payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionResult {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RtFault>,
}

/// `MET_REQ` payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub options: Value,
}

/// `MET_RES` payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodResult {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RtFault>,
}
