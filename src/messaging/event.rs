use crate::types::constants::{
    ERROR_TYPE, OBJECTS_CHANGES_TYPE, PUB_SUB_COMMAND_TYPE, PUB_SUB_COMMANDS_TYPE,
    PUB_SUB_CONNECT_TYPE, PUB_SUB_MESSAGES_TYPE, PUB_SUB_USERS_TYPE, protocol_events,
};
use serde::{Deserialize, Serialize};

/// Type-safe listener tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListenerType {
    /// Error notifications (local fan-out only)
    #[serde(rename = "ERROR")]
    Error,

    /// Data object changes in a table
    #[serde(rename = "OBJECTS_CHANGES")]
    ObjectsChanges,

    /// Connection to a pub/sub channel
    #[serde(rename = "PUB_SUB_CONNECT")]
    PubSubConnect,

    /// Messages published to a channel
    #[serde(rename = "PUB_SUB_MESSAGES")]
    PubSubMessages,

    /// A single command sent to a channel
    #[serde(rename = "PUB_SUB_COMMAND")]
    PubSubCommand,

    /// Commands received from a channel
    #[serde(rename = "PUB_SUB_COMMANDS")]
    PubSubCommands,

    /// User presence in a channel
    #[serde(rename = "PUB_SUB_USERS")]
    PubSubUsers,
}

/// How a listener type travels over the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    /// Never sent to the server
    Local,
    /// Long-lived `SUB_ON`/`SUB_OFF` subscription
    Subscription,
    /// One-shot `MET_REQ` call
    Method,
}

impl ListenerType {
    pub const ALL: [ListenerType; 7] = [
        Self::Error,
        Self::ObjectsChanges,
        Self::PubSubConnect,
        Self::PubSubMessages,
        Self::PubSubCommand,
        Self::PubSubCommands,
        Self::PubSubUsers,
    ];

    /// Parse a tag, returning `None` for unknown strings
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ERROR_TYPE => Some(Self::Error),
            OBJECTS_CHANGES_TYPE => Some(Self::ObjectsChanges),
            PUB_SUB_CONNECT_TYPE => Some(Self::PubSubConnect),
            PUB_SUB_MESSAGES_TYPE => Some(Self::PubSubMessages),
            PUB_SUB_COMMAND_TYPE => Some(Self::PubSubCommand),
            PUB_SUB_COMMANDS_TYPE => Some(Self::PubSubCommands),
            PUB_SUB_USERS_TYPE => Some(Self::PubSubUsers),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => ERROR_TYPE,
            Self::ObjectsChanges => OBJECTS_CHANGES_TYPE,
            Self::PubSubConnect => PUB_SUB_CONNECT_TYPE,
            Self::PubSubMessages => PUB_SUB_MESSAGES_TYPE,
            Self::PubSubCommand => PUB_SUB_COMMAND_TYPE,
            Self::PubSubCommands => PUB_SUB_COMMANDS_TYPE,
            Self::PubSubUsers => PUB_SUB_USERS_TYPE,
        }
    }

    pub fn kind(&self) -> ListenerKind {
        match self {
            Self::Error => ListenerKind::Local,
            Self::PubSubCommand => ListenerKind::Method,
            _ => ListenerKind::Subscription,
        }
    }
}

impl std::fmt::Display for ListenerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Envelope events
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProtocolEvent {
    /// Start a subscription
    SubOn,
    /// Stop a subscription
    SubOff,
    /// Subscription result or delivery
    SubRes,
    /// Method request
    MetReq,
    /// Method result
    MetRes,
    /// Server-side error
    Error,
    /// Anything this client does not understand
    Unknown(String),
}

impl ProtocolEvent {
    pub fn parse(s: &str) -> Self {
        match s {
            protocol_events::SUB_ON => Self::SubOn,
            protocol_events::SUB_OFF => Self::SubOff,
            protocol_events::SUB_RES => Self::SubRes,
            protocol_events::MET_REQ => Self::MetReq,
            protocol_events::MET_RES => Self::MetRes,
            protocol_events::ERROR => Self::Error,
            _ => Self::Unknown(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::SubOn => protocol_events::SUB_ON,
            Self::SubOff => protocol_events::SUB_OFF,
            Self::SubRes => protocol_events::SUB_RES,
            Self::MetReq => protocol_events::MET_REQ,
            Self::MetRes => protocol_events::MET_RES,
            Self::Error => protocol_events::ERROR,
            Self::Unknown(s) => s,
        }
    }
}

impl From<String> for ProtocolEvent {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ProtocolEvent> for String {
    fn from(event: ProtocolEvent) -> Self {
        event.as_str().to_string()
    }
}

impl std::fmt::Display for ProtocolEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_type_round_trip() {
        for listener_type in ListenerType::ALL {
            assert_eq!(ListenerType::parse(listener_type.as_str()), Some(listener_type));
        }
        assert_eq!(ListenerType::parse("pub_sub_users"), None);
        assert_eq!(ListenerType::parse(""), None);
    }

    #[test]
    fn test_listener_type_serde_uses_tag() {
        let json = serde_json::to_string(&ListenerType::PubSubCommands).unwrap();
        assert_eq!(json, r#""PUB_SUB_COMMANDS""#);

        let parsed: ListenerType = serde_json::from_str(r#""OBJECTS_CHANGES""#).unwrap();
        assert_eq!(parsed, ListenerType::ObjectsChanges);

        assert!(serde_json::from_str::<ListenerType>(r#""NOT_A_TYPE""#).is_err());
    }

    #[test]
    fn test_listener_kinds() {
        assert_eq!(ListenerType::Error.kind(), ListenerKind::Local);
        assert_eq!(ListenerType::PubSubCommand.kind(), ListenerKind::Method);
        assert_eq!(ListenerType::PubSubCommands.kind(), ListenerKind::Subscription);
        assert_eq!(ListenerType::ObjectsChanges.kind(), ListenerKind::Subscription);
    }

    #[test]
    fn test_listener_type_display() {
        assert_eq!(ListenerType::PubSubUsers.to_string(), "PUB_SUB_USERS");
    }

    #[test]
    fn test_protocol_event_round_trip() {
        let events = vec![
            ProtocolEvent::SubOn,
            ProtocolEvent::SubOff,
            ProtocolEvent::SubRes,
            ProtocolEvent::MetReq,
            ProtocolEvent::MetRes,
            ProtocolEvent::Error,
        ];

        for event in events {
            let s = event.as_str().to_string();
            assert_eq!(ProtocolEvent::parse(&s), event);
        }
    }
}
