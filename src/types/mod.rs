pub mod constants;
pub mod error;
pub mod message;

pub use constants::*;
pub use error::{Result, RtError, RtFault};
pub use message::{MethodRequest, MethodResult, RtMessage, SubscriptionRequest, SubscriptionResult};
