// Module declarations
mod core;
mod payloads;
mod presence;
mod state;

// Public API exports
pub use self::core::Channel;
pub use payloads::{ChannelUser, CommandEvent, PubSubMessage, UserStatus, UserStatusEvent};
pub use presence::{Presence, PresenceChanges};
pub use state::{ChannelState, ChannelStatus};
