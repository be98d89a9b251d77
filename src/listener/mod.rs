// Listener module - Subscription and method-call bookkeeping
mod core;
mod receiver;
mod subscription;

pub use self::core::RtListener;
pub use receiver::EventReceiver;
pub use subscription::{Observer, SubscriptionHandle, SubscriptionSpec, SubscriptionStatus};
