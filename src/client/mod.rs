// Module declarations
mod builder;
mod connection;
mod core;
mod events;
mod state;

// Public API exports
pub use self::core::RtClient;
pub use builder::{RtClientBuilder, RtClientOptions};
pub use connection::{ConnectionManager, ConnectionState};
pub use events::ConnectionEvent;
pub use state::ClientState;
