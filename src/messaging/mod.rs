// Messaging module - Listener tags and incoming frame routing
pub mod event;
pub mod router;

pub use event::{ListenerKind, ListenerType, ProtocolEvent};
pub use router::MessageRouter;
