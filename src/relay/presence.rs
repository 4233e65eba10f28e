//! Bot presence derived from configuration.
//!
//! Malformed activity or status names never fail startup: they fall back
//! to a visible `CONFIG ERROR` watching activity and an idle status.

use std::str::FromStr;

use tracing::warn;

use crate::config::types::PresenceConfig;
use crate::relay::formatter::{FormatContext, MessageFormatter};

/// Activity text shown when the configured activity type is unusable.
pub const CONFIG_ERROR_TEXT: &str = "CONFIG ERROR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Playing,
    Streaming,
    Listening,
    Watching,
    CustomStatus,
    Competing,
}

impl FromStr for ActivityKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PLAYING" => Ok(Self::Playing),
            "STREAMING" => Ok(Self::Streaming),
            "LISTENING" => Ok(Self::Listening),
            "WATCHING" => Ok(Self::Watching),
            "CUSTOM_STATUS" => Ok(Self::CustomStatus),
            "COMPETING" => Ok(Self::Competing),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    Online,
    Idle,
    DoNotDisturb,
    Invisible,
    Offline,
}

impl FromStr for PresenceStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ONLINE" => Ok(Self::Online),
            "IDLE" => Ok(Self::Idle),
            "DO_NOT_DISTURB" => Ok(Self::DoNotDisturb),
            "INVISIBLE" => Ok(Self::Invisible),
            "OFFLINE" => Ok(Self::Offline),
            _ => Err(()),
        }
    }
}

/// Activity and status to show on the bot account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    pub activity: ActivityKind,
    pub text: String,
    pub status: PresenceStatus,
    /// Stream URL, only meaningful for [`ActivityKind::Streaming`].
    pub url: Option<String>,
}

impl Presence {
    pub fn from_config(config: &PresenceConfig, online: usize, max_players: usize) -> Self {
        let (activity, template) = match (
            config.activity_type.as_deref().map(ActivityKind::from_str),
            config.activity_text.as_deref(),
        ) {
            (Some(Ok(kind)), Some(text)) => (kind, text),
            _ => {
                warn!(
                    "Invalid presence activity {:?}, falling back to WATCHING",
                    config.activity_type
                );
                (ActivityKind::Watching, CONFIG_ERROR_TEXT)
            }
        };

        let status = match config.status.as_deref().map(PresenceStatus::from_str) {
            Some(Ok(status)) => status,
            _ => {
                warn!("Invalid presence status {:?}, falling back to IDLE", config.status);
                PresenceStatus::Idle
            }
        };

        let text = MessageFormatter::new(template).format(&FormatContext::counts(online, max_players));

        Self {
            activity,
            text,
            status,
            url: config.stream_url.clone(),
        }
    }
}
