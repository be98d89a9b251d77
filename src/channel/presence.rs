use super::payloads::{ChannelUser, UserStatus, UserStatusEvent};
use std::collections::BTreeMap;

/// Local view of the connections present in a channel, keyed by connection id
#[derive(Debug, Clone, Default)]
pub struct Presence {
    users: BTreeMap<String, ChannelUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceChanges {
    pub joins: Vec<ChannelUser>,
    pub leaves: Vec<ChannelUser>,
}

impl Presence {
    pub fn apply(&mut self, event: &UserStatusEvent) -> PresenceChanges {
        match event.status {
            UserStatus::Listing => self.sync_listing(&event.data),
            UserStatus::Connected | UserStatus::UserUpdate => {
                let mut joins = Vec::new();
                for user in &event.data {
                    let previous = self.users.insert(user.connection_id.clone(), user.clone());
                    if previous.is_none() {
                        joins.push(user.clone());
                    }
                }
                PresenceChanges {
                    joins,
                    leaves: Vec::new(),
                }
            }
            UserStatus::Disconnected => {
                let leaves = event
                    .data
                    .iter()
                    .filter_map(|user| self.users.remove(&user.connection_id))
                    .collect();
                PresenceChanges {
                    joins: Vec::new(),
                    leaves,
                }
            }
        }
    }

    fn sync_listing(&mut self, listing: &[ChannelUser]) -> PresenceChanges {
        let new_users: BTreeMap<String, ChannelUser> = listing
            .iter()
            .map(|user| (user.connection_id.clone(), user.clone()))
            .collect();

        let joins = new_users
            .values()
            .filter(|user| !self.users.contains_key(&user.connection_id))
            .cloned()
            .collect();
        let leaves = self
            .users
            .values()
            .filter(|user| !new_users.contains_key(&user.connection_id))
            .cloned()
            .collect();

        self.users = new_users;
        PresenceChanges { joins, leaves }
    }

    pub fn list(&self) -> Vec<ChannelUser> {
        self.users.values().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }
}
