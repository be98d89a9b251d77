use crate::listener::{SubscriptionHandle, SubscriptionSpec, SubscriptionStatus};

/// Channel status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Not joined
    Closed,
    /// Join requested, waiting for the server
    Joining,
    Joined,
    /// The server rejected the join
    Errored,
}

/// Mutable state for a Channel
#[derive(Default)]
pub struct ChannelState {
    /// The `PUB_SUB_CONNECT` subscription, present once `join()` was called
    pub connect_handle: Option<SubscriptionHandle>,
    /// Listeners added before `join()`
    pub deferred: Vec<SubscriptionSpec>,
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ChannelStatus {
        match self.connect_handle.as_ref().map(SubscriptionHandle::status) {
            None => ChannelStatus::Closed,
            Some(SubscriptionStatus::Active) => ChannelStatus::Joined,
            Some(SubscriptionStatus::Failed(_)) => ChannelStatus::Errored,
            Some(SubscriptionStatus::Pending | SubscriptionStatus::Subscribing) => {
                ChannelStatus::Joining
            }
        }
    }
}
