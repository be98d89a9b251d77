/// Connection lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The socket is open and pending subscriptions were queued for sending
    Connected,
    /// A connect attempt failed
    ConnectError(String),
    /// The socket closed, with the reason
    Disconnected(String),
    /// A reconnect will be attempted after `delay_ms`
    ReconnectAttempt { attempt: u32, delay_ms: u64 },
}
