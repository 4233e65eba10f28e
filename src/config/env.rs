//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `PROXYCHAT_DISCORD_TOKEN` - Discord bot token
//! - `PROXYCHAT_CHANNEL_ID` - Bridge channel ID
//! - `PROXYCHAT_PRIVATE_CHANNEL_ID` - Private (staff) channel ID

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "PROXYCHAT";

/// Apply environment variable overrides to a config.
///
/// This allows the bot token to be provided via the environment
/// instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.discord.token = token;
    }
    if let Ok(channel_id) = env::var(format!("{}_CHANNEL_ID", ENV_PREFIX)) {
        config.discord.channel_id = channel_id;
    }
    if let Ok(channel_id) = env::var(format!("{}_PRIVATE_CHANNEL_ID", ENV_PREFIX)) {
        config.discord.private_channel_id = channel_id;
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `PROXYCHAT_CONFIG` environment variable, otherwise returns "proxychat.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "proxychat.conf".to_string())
}
