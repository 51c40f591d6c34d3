//! Enum-indexed topic table.
//!
//! Templates from [`TopicTemplates`] are expanded once at boot; afterwards
//! every publish and every inbound classification goes through
//! [`TopicRole`] rather than string keys.

use crate::config::TopicTemplates;

/// What a topic is used for.  Used as a table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TopicRole {
    Command = 0,
    DeviceCommand = 1,
    Ping = 2,
    Handshake = 3,
    StateNotify = 4,
    Pong = 5,
}

impl TopicRole {
    pub const COUNT: usize = 6;
    pub const ALL: [Self; Self::COUNT] = [
        Self::Command,
        Self::DeviceCommand,
        Self::Ping,
        Self::Handshake,
        Self::StateNotify,
        Self::Pong,
    ];
    /// Roles the supervisor subscribes to.
    pub const INBOUND: [Self; 3] = [Self::Command, Self::DeviceCommand, Self::Ping];

    pub fn is_inbound(self) -> bool {
        Self::INBOUND.contains(&self)
    }
}

/// Resolved topic strings, one per [`TopicRole`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTable {
    topics: [String; TopicRole::COUNT],
}

impl TopicTable {
    /// Expand `{id}` in every template with `device_id`.
    pub fn resolve(templates: &TopicTemplates, device_id: &str) -> Self {
        let expand = |t: &str| t.replace("{id}", device_id);
        Self {
            topics: [
                expand(&templates.command),
                expand(&templates.device_command),
                expand(&templates.ping),
                expand(&templates.handshake),
                expand(&templates.state_notify),
                expand(&templates.pong),
            ],
        }
    }

    pub fn get(&self, role: TopicRole) -> &str {
        &self.topics[role as usize]
    }

    /// Map an inbound topic back to its role.  Outbound roles never match.
    pub fn classify(&self, topic: &str) -> Option<TopicRole> {
        TopicRole::INBOUND
            .into_iter()
            .find(|role| self.get(*role) == topic)
    }

    /// Topics to subscribe to after every (re)connect.
    pub fn inbound(&self) -> impl Iterator<Item = &str> {
        TopicRole::INBOUND.into_iter().map(|role| self.get(role))
    }
}
