// WebSocket module - Socket creation
mod factory;

pub use factory::{RtSocket, WebSocketFactory};
