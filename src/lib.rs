//! # Backendless Realtime
//!
//! A Rust client for Backendless realtime: data-change listeners and
//! publish/subscribe channels over a single WebSocket connection.
//!
//! ## Example
//!
//! ```no_run
//! use backendless_rt::{RtClient, RtClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RtClient::new(RtClientOptions::new("your-app-id", "your-api-key"))?;
//!
//!     client.connect().await?;
//!
//!     let mut created = client.data("Person").add_create_listener(None).await?;
//!     while let Some(Ok(person)) = created.recv().await {
//!         println!("created: {:?}", person);
//!     }
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod client;
pub mod data;
pub mod infrastructure;
pub mod listener;
pub mod messaging;
pub mod types;
pub mod websocket;

pub use channel::{
    Channel, ChannelStatus, ChannelUser, CommandEvent, PubSubMessage, UserStatus, UserStatusEvent,
};
pub use client::{ConnectionEvent, ConnectionState, RtClient, RtClientOptions};
pub use data::{BulkEvent, DataEvent, DataObject, EventHandler};
pub use infrastructure::PublishStatus;
pub use listener::{EventReceiver, RtListener, SubscriptionHandle, SubscriptionStatus};
pub use messaging::ListenerType;
pub use types::{Result, RtError, RtFault, RtMessage};
