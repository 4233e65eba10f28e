//! Message formatting for display.
//!
//! Handles placeholder substitution in message templates.
//! Supports placeholders: %player%, %message%, %server%, %online%, %max-players%, %time%

use chrono::Local;

/// Default format for proxy -> Discord messages.
pub const DEFAULT_PROXY_TO_DISCORD_FORMAT: &str = "[%server%] %player%: %message%";

/// Default format for Discord -> proxy messages.
pub const DEFAULT_DISCORD_TO_PROXY_FORMAT: &str = "[Discord] %player%: %message%";

/// Message formatter that substitutes placeholders in a template.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    template: String,
}

impl MessageFormatter {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Render the template in a single left-to-right pass.
    ///
    /// Substituted values are never re-scanned, so a message containing
    /// `%player%` stays literal. Unknown placeholders and lone `%` are kept.
    pub fn format(&self, ctx: &FormatContext) -> String {
        let mut out = String::with_capacity(self.template.len() + ctx.message.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            match after.find('%').and_then(|end| ctx.lookup(&after[..end]).map(|v| (end, v))) {
                Some((end, value)) => {
                    out.push_str(&value);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push('%');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Values available to a template.
#[derive(Debug, Clone, Default)]
pub struct FormatContext {
    pub player: String,
    pub message: String,
    pub server: String,
    pub online: usize,
    pub max_players: usize,
}

impl FormatContext {
    pub fn new(player: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            message: message.into(),
            ..Default::default()
        }
    }

    /// Context carrying only the player counts (topics, presence text).
    pub fn counts(online: usize, max_players: usize) -> Self {
        Self::default().with_counts(online, max_players)
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    pub fn with_counts(mut self, online: usize, max_players: usize) -> Self {
        self.online = online;
        self.max_players = max_players;
        self
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "player" => Some(self.player.clone()),
            "message" => Some(self.message.clone()),
            "server" => Some(self.server.clone()),
            "online" => Some(self.online.to_string()),
            "max-players" => Some(self.max_players.to_string()),
            "time" => Some(get_time()),
            _ => None,
        }
    }
}

/// Get the current time as HH:MM:SS string.
fn get_time() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_proxy_format() {
        let formatter = MessageFormatter::new(DEFAULT_PROXY_TO_DISCORD_FORMAT);
        let ctx = FormatContext::new("Bob", "hey").with_server("Lobby");
        assert_eq!(formatter.format(&ctx), "[Lobby] Bob: hey");
    }

    #[test]
    fn test_discord_to_proxy_format() {
        let formatter = MessageFormatter::new(DEFAULT_DISCORD_TO_PROXY_FORMAT);
        let ctx = FormatContext::new("Alice", "hi all");
        assert_eq!(formatter.format(&ctx), "[Discord] Alice: hi all");
    }

    #[test]
    fn test_counts() {
        let formatter = MessageFormatter::new("%online%/%max-players% online");
        assert_eq!(formatter.format(&FormatContext::counts(3, 100)), "3/100 online");
    }

    #[test]
    fn test_unknown_placeholders_pass_through() {
        let formatter = MessageFormatter::new("%foo% 100% %player%");
        let ctx = FormatContext::new("Bob", "");
        assert_eq!(formatter.format(&ctx), "%foo% 100% Bob");
    }

    #[test]
    fn test_trailing_percent() {
        let formatter = MessageFormatter::new("%player% at 50%");
        assert_eq!(formatter.format(&FormatContext::new("Bob", "")), "Bob at 50%");
    }

    #[test]
    fn test_values_not_rescanned() {
        let formatter = MessageFormatter::new("%player%: %message%");
        let ctx = FormatContext::new("%message%", "%player%");
        assert_eq!(formatter.format(&ctx), "%message%: %player%");
    }

    #[test]
    fn test_time_placeholder() {
        let formatter = MessageFormatter::new("[%time%]");
        let output = formatter.format(&FormatContext::default());
        assert_eq!(output.len(), "[HH:MM:SS]".len());
        assert_eq!(&output[3..4], ":");
        assert_eq!(&output[6..7], ":");
    }
}
