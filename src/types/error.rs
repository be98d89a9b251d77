use crate::messaging::ListenerType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A fault reported by the realtime server.
///
/// On the wire a fault is either a bare string or an object with an optional
/// numeric code; both decode into this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFault")]
pub struct RtFault {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFault {
    Message(String),
    Detailed {
        #[serde(default)]
        code: Option<i64>,
        #[serde(default)]
        message: String,
    },
}

impl From<RawFault> for RtFault {
    fn from(raw: RawFault) -> Self {
        match raw {
            RawFault::Message(message) => Self {
                code: None,
                message,
            },
            RawFault::Detailed { code, message } => Self { code, message },
        }
    }
}

impl RtFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

impl std::fmt::Display for RtFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Errors that can occur when using the Backendless realtime client.
#[derive(Error, Debug)]
pub enum RtError {
    /// WebSocket protocol error (connection failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// Missing or rejected application credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Invalid or incomplete client configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Channel-specific error (not joined, subscription removed, etc.)
    #[error("Channel error: {0}")]
    Channel(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error (realtime lookup, REST publish)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The listener type cannot be used for the requested operation
    #[error("Listener type {0} cannot be used here")]
    InvalidListener(ListenerType),

    /// Fault returned by the server for a subscription or method call
    #[error("Server fault: {0}")]
    Fault(RtFault),

    /// Operation timed out (e.g., method result not received)
    #[error("Timeout error")]
    Timeout,

    /// Attempted operation while not connected to the server
    #[error("Not connected")]
    NotConnected,
}

/// Convenience type alias for `Result<T, RtError>`.
pub type Result<T> = std::result::Result<T, RtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_from_string() {
        let fault: RtFault = serde_json::from_str(r#""table not found""#).unwrap();
        assert_eq!(fault, RtFault::new("table not found"));
    }

    #[test]
    fn test_fault_from_object() {
        let fault: RtFault =
            serde_json::from_str(r#"{"code": 5003, "message": "channel is closed"}"#).unwrap();
        assert_eq!(fault.code, Some(5003));
        assert_eq!(fault.message, "channel is closed");
        assert_eq!(fault.to_string(), "[5003] channel is closed");
    }

    #[test]
    fn test_fault_object_without_code() {
        let fault: RtFault = serde_json::from_str(r#"{"message": "boom"}"#).unwrap();
        assert_eq!(fault.code, None);
        assert_eq!(fault.to_string(), "boom");
    }
}
