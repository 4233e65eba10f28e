//! Canonical message types for relay communication.
//!
//! This module defines the values that cross the boundary between the
//! proxy network and Discord.

/// Side of the relay a chat event was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Proxy network public chat.
    Proxy,
    /// The external chat service (Discord).
    ExternalService,
}

/// A chat message observed on either side of the relay.
///
/// Immutable once constructed; consumed by the relay pipeline and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    origin: Origin,
    sender_display_name: String,
    raw_text: String,
    source_channel_id: String,
    server_name: Option<String>,
}

impl ChatEvent {
    /// Create an event observed on the proxy network.
    pub fn from_proxy(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: Origin::Proxy,
            sender_display_name: sender.into(),
            raw_text: text.into(),
            source_channel_id: String::new(),
            server_name: None,
        }
    }

    /// Set the sub-server the sender is currently connected to.
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server_name = Some(server.into());
        self
    }

    /// Create an event observed on the external chat service.
    pub fn from_external(
        channel_id: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            origin: Origin::ExternalService,
            sender_display_name: sender.into(),
            raw_text: text.into(),
            source_channel_id: channel_id.into(),
            server_name: None,
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn sender_display_name(&self) -> &str {
        &self.sender_display_name
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Channel the event was posted in (empty for proxy events).
    pub fn source_channel_id(&self) -> &str {
        &self.source_channel_id
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }
}

/// A single field of a rich message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Structured (embed) message content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichContent {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub footer: Option<String>,
    pub fields: Vec<RichField>,
    /// Accent colour as 0xRRGGBB.
    pub color: Option<u32>,
}

impl RichContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(RichField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }
}

/// A member of a destination channel, used for mention resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Discord user ID.
    pub id: u64,
    /// Server nickname, if one is set.
    pub nickname: Option<String>,
    /// Name shown in the client (nickname, global name or username).
    pub effective_name: String,
}

impl RosterEntry {
    /// Canonical Discord mention for this member.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id)
    }

    /// Whether `name` refers to this member (case-insensitive).
    pub fn matches(&self, name: &str) -> bool {
        self.nickname
            .as_deref()
            .is_some_and(|nick| nick.to_lowercase() == name.to_lowercase())
            || self.effective_name.to_lowercase() == name.to_lowercase()
    }
}

/// Raw message event pushed by the chat service into the ingress channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel the message was posted in.
    pub channel_id: String,
    /// Author's display name (nickname or username).
    pub author_name: String,
    /// Whether the author is a bot account (including this relay).
    pub author_is_bot: bool,
    /// Message content, attachment URLs included.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_event() {
        let event = ChatEvent::from_proxy("Bob", "hey").with_server("Lobby");
        assert_eq!(event.origin(), Origin::Proxy);
        assert_eq!(event.server_name(), Some("Lobby"));
        assert_eq!(event.sender_display_name(), "Bob");
        assert_eq!(event.raw_text(), "hey");
        assert!(event.source_channel_id().is_empty());
    }

    #[test]
    fn test_external_event() {
        let event = ChatEvent::from_external("123", "Alice", "hello");
        assert_eq!(event.origin(), Origin::ExternalService);
        assert_eq!(event.source_channel_id(), "123");
        assert_eq!(event.server_name(), None);
    }

    #[test]
    fn test_roster_matching() {
        let entry = RosterEntry {
            id: 7,
            nickname: Some("Ally".to_string()),
            effective_name: "Alice".to_string(),
        };
        assert!(entry.matches("ally"));
        assert!(entry.matches("ALICE"));
        assert!(!entry.matches("Al"));
        assert_eq!(entry.mention(), "<@7>");
    }

    #[test]
    fn test_rich_builder() {
        let content = RichContent::new()
            .title("Status")
            .field("Online", "3", true)
            .color(0x00FF00);
        assert_eq!(content.title.as_deref(), Some("Status"));
        assert_eq!(content.fields.len(), 1);
        assert!(content.fields[0].inline);
        assert_eq!(content.color, Some(0x00FF00));
    }
}
