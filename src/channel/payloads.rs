use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A message delivered to `PUB_SUB_MESSAGES` listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubSubMessage {
    #[serde(default)]
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub headers: HashMap<String, Value>,
    #[serde(default)]
    pub data: Value,
}

/// A command delivered to `PUB_SUB_COMMANDS` listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEvent {
    #[serde(rename = "type")]
    pub command_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    /// Full list of users currently in the channel
    Listing,
    Connected,
    Disconnected,
    UserUpdate,
}

/// A connection present in a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelUser {
    pub connection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Payload of `PUB_SUB_USERS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatusEvent {
    pub status: UserStatus,
    #[serde(default)]
    pub data: Vec<ChannelUser>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_decoding() {
        let message: PubSubMessage = serde_json::from_value(json!({
            "messageId": "m-1",
            "publisherId": "alice",
            "timestamp": 1700000000000i64,
            "headers": { "city": "Dallas" },
            "data": "hello"
        }))
        .unwrap();

        assert_eq!(message.message_id, "m-1");
        assert_eq!(message.publisher_id.as_deref(), Some("alice"));
        assert_eq!(message.headers["city"], "Dallas");
        assert_eq!(message.data, json!("hello"));
    }

    #[test]
    fn test_command_decoding() {
        let command: CommandEvent = serde_json::from_value(json!({
            "type": "TYPING_START",
            "connectionId": "c-1",
            "data": { "field": "subject" }
        }))
        .unwrap();

        assert_eq!(command.command_type, "TYPING_START");
        assert_eq!(command.connection_id.as_deref(), Some("c-1"));
        assert_eq!(command.user_id, None);
    }

    #[test]
    fn test_user_status_decoding() {
        let event: UserStatusEvent = serde_json::from_value(json!({
            "status": "USER_UPDATE",
            "data": [{ "connectionId": "c-1", "userId": "u-1" }]
        }))
        .unwrap();

        assert_eq!(event.status, UserStatus::UserUpdate);
        assert_eq!(event.data[0].user_id.as_deref(), Some("u-1"));
    }
}
