//! Configuration validation.
//!
//! Only structural mistakes are rejected. A missing or placeholder token is
//! not an error: it switches the Discord relay off.

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.discord.is_active() {
        if config.discord.channel_id.trim().is_empty() {
            errors.push("discord.channel-id is required when a token is configured".to_string());
        }
        if !is_snowflake(&config.discord.channel_id) && !config.discord.channel_id.is_empty() {
            errors.push(format!(
                "discord.channel-id '{}' is not a Discord channel ID",
                config.discord.channel_id
            ));
        }
        if !config.discord.private_channel_id.is_empty()
            && !is_snowflake(&config.discord.private_channel_id)
        {
            errors.push(format!(
                "discord.private-channel-id '{}' is not a Discord channel ID",
                config.discord.private_channel_id
            ));
        }
    }

    if config.discord.shutdown_timeout == 0 {
        errors.push("discord.shutdown-timeout must be non-zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

fn is_snowflake(value: &str) -> bool {
    value.trim().parse::<u64>().is_ok()
}
