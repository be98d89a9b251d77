/// Listener type tags (magic strings layer)
pub const ERROR_TYPE: &str = "ERROR";
pub const OBJECTS_CHANGES_TYPE: &str = "OBJECTS_CHANGES";
pub const PUB_SUB_CONNECT_TYPE: &str = "PUB_SUB_CONNECT";
pub const PUB_SUB_MESSAGES_TYPE: &str = "PUB_SUB_MESSAGES";
pub const PUB_SUB_COMMAND_TYPE: &str = "PUB_SUB_COMMAND";
pub const PUB_SUB_COMMANDS_TYPE: &str = "PUB_SUB_COMMANDS";
pub const PUB_SUB_USERS_TYPE: &str = "PUB_SUB_USERS";

/// Envelope event strings
pub mod protocol_events {
    pub const SUB_ON: &str = "SUB_ON";
    pub const SUB_OFF: &str = "SUB_OFF";
    pub const SUB_RES: &str = "SUB_RES";
    pub const MET_REQ: &str = "MET_REQ";
    pub const MET_RES: &str = "MET_RES";
    pub const ERROR: &str = "ERROR";
}

/// Method names carried by `MET_REQ`
pub mod methods {
    pub const SET_USER_TOKEN: &str = "SET_USER_TOKEN";
}

/// Default REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.backendless.com";

/// Default timeout (milliseconds)
pub const DEFAULT_TIMEOUT: u64 = 10000;

/// Default heartbeat interval (milliseconds)
pub const HEARTBEAT_INTERVAL: u64 = 25000;

/// Default reconnect intervals (milliseconds)
pub const RECONNECT_INTERVALS: [u64; 4] = [1000, 2000, 5000, 10000];
pub const DEFAULT_RECONNECT_FALLBACK: u64 = 10000;

/// Buffer size of per-listener delivery channels
pub const LISTENER_BUFFER_SIZE: usize = 100;

/// Buffer size of the connection event broadcast
pub const CONNECTION_EVENTS_BUFFER: usize = 32;
