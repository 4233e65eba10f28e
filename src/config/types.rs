//! Configuration type definitions.

use std::time::Duration;

use serde::Deserialize;

use crate::relay::formatter::{DEFAULT_DISCORD_TO_PROXY_FORMAT, DEFAULT_PROXY_TO_DISCORD_FORMAT};

/// Token values that mean "no token configured".
const PLACEHOLDER_TOKENS: [&str; 3] = ["", "TOKEN_HERE", "null"];

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub proxy_status: ProxyStatusConfig,
    #[serde(default)]
    pub topic: TopicConfig,
    #[serde(default)]
    pub messages: MessagesConfig,
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiscordConfig {
    /// Master switch for the Discord relay.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub token: String,
    /// Bridge channel: public proxy chat is mirrored here.
    #[serde(default)]
    pub channel_id: String,
    /// Staff channel for private relays.
    #[serde(default)]
    pub private_channel_id: String,
    /// Seconds between channel topic refreshes (0 disables).
    #[serde(default = "default_topic_update_interval")]
    pub topic_update_interval: u64,
    /// Seconds to wait for a graceful disconnect before forcing it.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
    /// Connection retries after the first failed attempt. Unset retries forever.
    #[serde(default)]
    pub connect_retries: Option<usize>,
}

impl DiscordConfig {
    /// Whether a real bot token has been configured.
    pub fn has_token(&self) -> bool {
        let token = self.token.trim();
        !PLACEHOLDER_TOKENS
            .iter()
            .any(|placeholder| token.eq_ignore_ascii_case(placeholder))
    }

    /// Whether the relay should try to connect at all.
    pub fn is_active(&self) -> bool {
        self.enabled && self.has_token()
    }

    pub fn topic_update_interval(&self) -> Option<Duration> {
        (self.topic_update_interval > 0).then(|| Duration::from_secs(self.topic_update_interval))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

/// Bot presence (activity and online status).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PresenceConfig {
    /// PLAYING, STREAMING, LISTENING, WATCHING, CUSTOM_STATUS or COMPETING.
    pub activity_type: Option<String>,
    /// Supports %online% and %max-players%.
    pub activity_text: Option<String>,
    /// ONLINE, IDLE, DO_NOT_DISTURB, INVISIBLE or OFFLINE.
    pub status: Option<String>,
    /// Stream URL used with the STREAMING activity type.
    pub stream_url: Option<String>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            activity_type: Some("WATCHING".to_string()),
            activity_text: Some("%online% players online".to_string()),
            status: Some("ONLINE".to_string()),
            stream_url: None,
        }
    }
}

/// Notifications posted when the relay comes up or goes down.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProxyStatusConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_module_enabled")]
    pub module_enabled: String,
    #[serde(default = "default_module_disabled")]
    pub module_disabled: String,
}

impl Default for ProxyStatusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            module_enabled: default_module_enabled(),
            module_disabled: default_module_disabled(),
        }
    }
}

/// Bridge channel topic templates.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TopicConfig {
    /// Supports %online% and %max-players%.
    #[serde(default = "default_topic_online")]
    pub online: String,
    #[serde(default = "default_topic_offline")]
    pub offline: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            online: default_topic_online(),
            offline: default_topic_offline(),
        }
    }
}

/// Chat message templates.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MessagesConfig {
    #[serde(default = "default_proxy_to_discord")]
    pub proxy_to_discord: String,
    #[serde(default = "default_discord_to_proxy")]
    pub discord_to_proxy: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            proxy_to_discord: default_proxy_to_discord(),
            discord_to_proxy: default_discord_to_proxy(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_topic_update_interval() -> u64 {
    300
}

fn default_shutdown_timeout() -> u64 {
    10
}

fn default_module_enabled() -> String {
    "✅ Proxy enabled!".to_string()
}

fn default_module_disabled() -> String {
    "⛔ Proxy disabled.".to_string()
}

fn default_topic_online() -> String {
    "There are %online% players online.".to_string()
}

fn default_topic_offline() -> String {
    "The proxy is offline.".to_string()
}

fn default_proxy_to_discord() -> String {
    DEFAULT_PROXY_TO_DISCORD_FORMAT.to_string()
}

fn default_discord_to_proxy() -> String {
    DEFAULT_DISCORD_TO_PROXY_FORMAT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discord(token: &str) -> DiscordConfig {
        DiscordConfig {
            enabled: true,
            token: token.to_string(),
            channel_id: "1".to_string(),
            private_channel_id: String::new(),
            topic_update_interval: 300,
            shutdown_timeout: 10,
            connect_retries: None,
        }
    }

    #[test]
    fn test_placeholder_tokens() {
        assert!(!discord("").has_token());
        assert!(!discord("TOKEN_HERE").has_token());
        assert!(!discord("token_here").has_token());
        assert!(!discord("NULL").has_token());
        assert!(discord("abc.def.ghi").has_token());
    }

    #[test]
    fn test_disabled_flag_wins() {
        let mut config = discord("abc.def.ghi");
        assert!(config.is_active());
        config.enabled = false;
        assert!(!config.is_active());
    }

    #[test]
    fn test_topic_interval_zero_disables() {
        let mut config = discord("abc");
        assert_eq!(config.topic_update_interval(), Some(Duration::from_secs(300)));
        config.topic_update_interval = 0;
        assert_eq!(config.topic_update_interval(), None);
    }
}
